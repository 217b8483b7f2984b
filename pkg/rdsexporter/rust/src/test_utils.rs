// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! In-memory upstream used by unit and end-to-end tests.

#![allow(clippy::unwrap_used)]

use crate::client::{
    ClientFactory, CloudApi, Datapoint, DiscoveredInstance, DiscoveryPage, PayloadRecord,
    ScopeKey, StatisticQuery,
};
use crate::config::CredentialSource;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Fake upstream for one scope. Pages are addressed by their index, which
/// doubles as the pagination marker.
#[derive(Default)]
pub struct FakeCloud {
    pages: Vec<Result<Vec<DiscoveredInstance>, String>>,
    statistics: Mutex<HashMap<(String, String), Result<Vec<Datapoint>, String>>>,
    payloads: Mutex<HashMap<String, Result<Vec<PayloadRecord>, String>>>,
    statistic_calls: Mutex<Vec<StatisticQuery>>,
    payload_calls: Mutex<Vec<(String, DateTime<Utc>)>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, instances: Vec<DiscoveredInstance>) -> Self {
        self.pages.push(Ok(instances));
        self
    }

    pub fn with_failing_page(mut self, message: &str) -> Self {
        self.pages.push(Err(message.to_string()));
        self
    }

    pub fn with_statistic(self, instance: &str, metric: &str, datapoints: Vec<Datapoint>) -> Self {
        self.set_statistic(instance, metric, Ok(datapoints));
        self
    }

    pub fn with_failing_statistic(self, instance: &str, metric: &str, message: &str) -> Self {
        self.set_statistic(instance, metric, Err(message.to_string()));
        self
    }

    fn set_statistic(&self, instance: &str, metric: &str, result: Result<Vec<Datapoint>, String>) {
        self.statistics
            .lock()
            .unwrap()
            .insert((instance.to_string(), metric.to_string()), result);
    }

    /// Replaces everything the payload stream holds for `resource_id`.
    pub fn set_payloads(&self, resource_id: &str, records: Vec<PayloadRecord>) {
        self.payloads
            .lock()
            .unwrap()
            .insert(resource_id.to_string(), Ok(records));
    }

    pub fn fail_payloads(&self, resource_id: &str, message: &str) {
        self.payloads
            .lock()
            .unwrap()
            .insert(resource_id.to_string(), Err(message.to_string()));
    }

    pub fn statistic_calls(&self) -> Vec<StatisticQuery> {
        self.statistic_calls.lock().unwrap().clone()
    }

    pub fn payload_calls(&self) -> Vec<(String, DateTime<Utc>)> {
        self.payload_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn list_instances(&self, marker: Option<String>) -> Result<DiscoveryPage> {
        let index = match marker {
            Some(marker) => marker.parse::<usize>().unwrap(),
            None => 0,
        };
        let Some(page) = self.pages.get(index) else {
            return Ok(DiscoveryPage::default());
        };
        let instances = page
            .clone()
            .map_err(|message| Error::api("DescribeDBInstances", message))?;
        let next_marker = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
        Ok(DiscoveryPage {
            instances,
            next_marker,
        })
    }

    async fn get_statistic(&self, query: &StatisticQuery) -> Result<Vec<Datapoint>> {
        self.statistic_calls.lock().unwrap().push(query.clone());
        let key = (query.dimension_value.clone(), query.metric_name.to_string());
        match self.statistics.lock().unwrap().get(&key) {
            Some(Ok(datapoints)) => Ok(datapoints.clone()),
            Some(Err(message)) => Err(Error::api("GetMetricStatistics", message.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_payloads(
        &self,
        resource_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PayloadRecord>> {
        self.payload_calls
            .lock()
            .unwrap()
            .push((resource_id.to_string(), since));
        match self.payloads.lock().unwrap().get(resource_id) {
            Some(Ok(records)) => Ok(records
                .iter()
                .filter(|r| r.ingested_at >= since)
                .cloned()
                .collect()),
            Some(Err(message)) => Err(Error::api("FilterLogEvents", message.clone())),
            None => Ok(Vec::new()),
        }
    }
}

/// Hands out registered [`FakeCloud`]s by scope and records every connect.
/// Unregistered scopes get an empty cloud.
#[derive(Default)]
pub struct FakeFactory {
    clouds: HashMap<ScopeKey, Arc<FakeCloud>>,
    failing: HashSet<ScopeKey>,
    connects: Mutex<Vec<ScopeKey>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cloud(mut self, key: ScopeKey, cloud: FakeCloud) -> Self {
        self.clouds.insert(key, Arc::new(cloud));
        self
    }

    pub fn with_failing_scope(mut self, key: ScopeKey) -> Self {
        self.failing.insert(key);
        self
    }

    pub fn cloud(&self, key: &ScopeKey) -> Arc<FakeCloud> {
        Arc::clone(self.clouds.get(key).unwrap())
    }

    pub fn connects(&self) -> Vec<ScopeKey> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn connect(
        &self,
        scope: &ScopeKey,
        _credentials: &CredentialSource,
    ) -> Result<Arc<dyn CloudApi>> {
        self.connects.lock().unwrap().push(scope.clone());
        if self.failing.contains(scope) {
            return Err(Error::AuthConfig {
                scope: scope.to_string(),
                reason: "invalid credentials".to_string(),
            });
        }
        let cloud: Arc<dyn CloudApi> = self.clouds.get(scope).cloned().unwrap_or_default();
        Ok(cloud)
    }
}

/// A payload record ingested at the payload's own timestamp.
pub fn payload_record(message: String) -> PayloadRecord {
    let value: serde_json::Value = serde_json::from_str(&message).unwrap();
    let ingested_at = value.get("timestamp").and_then(|t| t.as_str()).unwrap().parse().unwrap();
    PayloadRecord {
        ingested_at,
        message,
    }
}
