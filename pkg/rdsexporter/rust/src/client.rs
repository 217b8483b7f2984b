// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Upstream API boundary: one [`CloudApi`] per credential scope, built by a
//! [`ClientFactory`].

use crate::config::CredentialSource;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// `(region, credential identity)`; the identity is empty for ambient credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey {
    pub region: String,
    pub credential_identity: String,
}

impl ScopeKey {
    pub fn new(region: impl Into<String>, credential_identity: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            credential_identity: credential_identity.into(),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.credential_identity)
    }
}

/// One record of the discovery listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredInstance {
    pub name: String,
    pub resource_id: String,
    pub monitoring_interval: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryPage {
    pub instances: Vec<DiscoveredInstance>,
    pub next_marker: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticQuery {
    pub metric_name: &'static str,
    pub namespace: &'static str,
    pub dimension_name: &'static str,
    pub dimension_value: String,
    pub period: Duration,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// An averaged statistic sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datapoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One raw high-resolution payload as delivered by the upstream log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadRecord {
    pub ingested_at: DateTime<Utc>,
    pub message: String,
}

/// Authenticated client for a single scope. Shared by every task scraping the scope.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// One page of the instance listing, starting at `marker`.
    async fn list_instances(&self, marker: Option<String>) -> Result<DiscoveryPage>;

    async fn get_statistic(&self, query: &StatisticQuery) -> Result<Vec<Datapoint>>;

    /// Every payload published for `resource_id` at or after `since`.
    async fn fetch_payloads(
        &self,
        resource_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PayloadRecord>>;
}

#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Build the client for `scope`. Fails with `Error::AuthConfig` when the
    /// credential material is invalid or cannot be resolved.
    async fn connect(
        &self,
        scope: &ScopeKey,
        credentials: &CredentialSource,
    ) -> Result<Arc<dyn CloudApi>>;
}
