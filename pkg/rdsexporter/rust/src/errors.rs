// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Credential material for a scope is invalid or cannot be resolved.
    #[error("could not build client for scope {scope}: {reason}")]
    AuthConfig { scope: String, reason: String },

    /// Paginated instance discovery failed part way through.
    #[error("discovery failed for scope {scope}: {source}")]
    Discovery {
        scope: String,
        #[source]
        source: Box<Error>,
    },

    #[error("can't determine resource ID for {instance}")]
    UnresolvedInstance { instance: String },

    #[error("fetching {what} for {instance} failed: {source}")]
    Fetch {
        instance: String,
        what: String,
        #[source]
        source: Box<Error>,
    },

    #[error("payload for {instance} does not match the expected schema: {reason}")]
    Schema { instance: String, reason: String },

    /// A single upstream call failed.
    #[error("{operation}: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    #[error("sample receiver for {instance} closed before publication finished")]
    Closed { instance: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn api(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Api {
            operation,
            message: message.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
