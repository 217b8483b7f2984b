// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! AWS SDK backed [`CloudApi`]: RDS for discovery, CloudWatch for statistics
//! and CloudWatch Logs for enhanced monitoring payloads.

use crate::client::{
    ClientFactory, CloudApi, Datapoint, DiscoveredInstance, DiscoveryPage, PayloadRecord,
    ScopeKey, StatisticQuery,
};
use crate::config::CredentialSource;
use crate::errors::{Error, Result};
use crate::stats::{Operation, RequestStats};
use async_trait::async_trait;
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::Credentials;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{Dimension, Statistic};
use aws_sdk_rds::config::Region;
use aws_sdk_rds::error::DisplayErrorContext;
use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/// Log group enhanced monitoring publishes into; one log stream per resource ID.
pub const ENHANCED_LOG_GROUP: &str = "RDSOSMetrics";

const ROLE_SESSION_NAME: &str = "rds-exporter";
const STATIC_PROVIDER_NAME: &str = "rds-exporter-static";

fn to_aws_time(time: DateTime<Utc>) -> AwsDateTime {
    AwsDateTime::from_secs(time.timestamp())
}

fn from_aws_time(time: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

/// Builds one client per scope. Every client shares the HTTP client of a base
/// SDK configuration loaded once, and the same request counters.
pub struct AwsClientFactory {
    base: SdkConfig,
    stats: Arc<RequestStats>,
    trace: bool,
}

impl AwsClientFactory {
    pub async fn new(stats: Arc<RequestStats>, trace: bool) -> Result<Self> {
        if trace && std::env::var_os("CI").is_some() {
            return Err(Error::Config(
                "refusing to trace AWS requests on CI: output would contain credentials".into(),
            ));
        }
        let base = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Ok(Self { base, stats, trace })
    }
}

fn auth_error(scope: &ScopeKey, reason: impl Into<String>) -> Error {
    Error::AuthConfig {
        scope: scope.to_string(),
        reason: reason.into(),
    }
}

#[async_trait]
impl ClientFactory for AwsClientFactory {
    async fn connect(
        &self,
        scope: &ScopeKey,
        credentials: &CredentialSource,
    ) -> Result<Arc<dyn CloudApi>> {
        let region = Region::new(scope.region.clone());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region.clone());
        if let Some(http_client) = self.base.http_client() {
            loader = loader.http_client(http_client);
        }
        if let CredentialSource::Static {
            access_key,
            secret_key,
        } = credentials
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                STATIC_PROVIDER_NAME,
            ));
        }
        let mut config = loader.load().await;

        if let CredentialSource::AssumeRole { role_arn } = credentials {
            let provider = AssumeRoleProvider::builder(role_arn.clone())
                .session_name(ROLE_SESSION_NAME)
                .region(region)
                .configure(&config)
                .build()
                .await;
            config = config
                .into_builder()
                .credentials_provider(SharedCredentialsProvider::new(provider))
                .build();
        }

        // Broken credentials fail here, at pool build time.
        let provider = config
            .credentials_provider()
            .ok_or_else(|| auth_error(scope, "no credentials provider available"))?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| auth_error(scope, DisplayErrorContext(&e).to_string()))?;

        Ok(Arc::new(AwsClient::new(
            scope,
            &config,
            Arc::clone(&self.stats),
            self.trace,
        )))
    }
}

pub struct AwsClient {
    scope: String,
    rds: aws_sdk_rds::Client,
    cloudwatch: aws_sdk_cloudwatch::Client,
    logs: aws_sdk_cloudwatchlogs::Client,
    stats: Arc<RequestStats>,
    trace: bool,
}

impl AwsClient {
    pub fn new(
        scope: &ScopeKey,
        config: &SdkConfig,
        stats: Arc<RequestStats>,
        trace: bool,
    ) -> Self {
        Self {
            scope: scope.to_string(),
            rds: aws_sdk_rds::Client::new(config),
            cloudwatch: aws_sdk_cloudwatch::Client::new(config),
            logs: aws_sdk_cloudwatchlogs::Client::new(config),
            stats,
            trace,
        }
    }

    fn finish<T, E>(&self, operation: Operation, result: std::result::Result<T, E>) -> Result<T>
    where
        E: std::error::Error + 'static,
    {
        self.stats.record(operation, result.is_ok());
        result.map_err(|e| {
            let message = DisplayErrorContext(&e).to_string();
            if self.trace {
                debug!("[{}] {} failed: {message}", self.scope, operation.name());
            }
            Error::api(operation.name(), message)
        })
    }
}

#[async_trait]
impl CloudApi for AwsClient {
    async fn list_instances(&self, marker: Option<String>) -> Result<DiscoveryPage> {
        if self.trace {
            debug!(
                "[{}] DescribeDBInstances marker={:?}",
                self.scope, marker
            );
        }
        let result = self
            .rds
            .describe_db_instances()
            .set_marker(marker)
            .send()
            .await;
        let output = self.finish(Operation::DescribeDbInstances, result)?;

        let instances = output
            .db_instances()
            .iter()
            .filter_map(|db| {
                Some(DiscoveredInstance {
                    name: db.db_instance_identifier()?.to_string(),
                    resource_id: db.dbi_resource_id()?.to_string(),
                    monitoring_interval: Duration::from_secs(
                        db.monitoring_interval()
                            .and_then(|secs| u64::try_from(secs).ok())
                            .unwrap_or(0),
                    ),
                })
            })
            .collect();

        Ok(DiscoveryPage {
            instances,
            next_marker: output.marker().map(str::to_string),
        })
    }

    async fn get_statistic(&self, query: &StatisticQuery) -> Result<Vec<Datapoint>> {
        if self.trace {
            debug!("[{}] GetMetricStatistics {:?}", self.scope, query);
        }
        let dimension = Dimension::builder()
            .name(query.dimension_name)
            .value(query.dimension_value.clone())
            .build();
        let period = i32::try_from(query.period.as_secs()).unwrap_or(i32::MAX);

        let result = self
            .cloudwatch
            .get_metric_statistics()
            .namespace(query.namespace)
            .metric_name(query.metric_name)
            .dimensions(dimension)
            .start_time(to_aws_time(query.start))
            .end_time(to_aws_time(query.end))
            .period(period)
            .statistics(Statistic::Average)
            .send()
            .await;
        let output = self.finish(Operation::GetMetricStatistics, result)?;

        Ok(output
            .datapoints()
            .iter()
            .filter_map(|dp| {
                Some(Datapoint {
                    timestamp: from_aws_time(dp.timestamp()?)?,
                    value: dp.average()?,
                })
            })
            .collect())
    }

    async fn fetch_payloads(
        &self,
        resource_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PayloadRecord>> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            if self.trace {
                debug!(
                    "[{}] FilterLogEvents stream={resource_id} start={since} token={:?}",
                    self.scope, next_token
                );
            }
            let result = self
                .logs
                .filter_log_events()
                .log_group_name(ENHANCED_LOG_GROUP)
                .log_stream_names(resource_id)
                .start_time(since.timestamp_millis())
                .set_next_token(next_token.take())
                .send()
                .await;
            let output = self.finish(Operation::FilterLogEvents, result)?;

            for event in output.events() {
                let Some(message) = event.message() else {
                    continue;
                };
                let ingested_at = event
                    .timestamp()
                    .and_then(DateTime::from_timestamp_millis)
                    .unwrap_or(since);
                records.push(PayloadRecord {
                    ingested_at,
                    message: message.to_string(),
                });
            }

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_conversion_keeps_seconds() {
        let time = Utc.with_ymd_and_hms(2019, 12, 12, 12, 31, 31).unwrap();
        let aws = to_aws_time(time);
        assert_eq!(aws.secs(), time.timestamp());
        assert_eq!(from_aws_time(&aws), Some(time));
    }
}
