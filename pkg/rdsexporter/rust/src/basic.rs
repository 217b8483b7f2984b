// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Low-resolution statistics: one upstream call per (instance, metric).

use crate::catalog::{BASIC_METRICS, MetricDescriptor};
use crate::client::{CloudApi, Datapoint, StatisticQuery};
use crate::config::BasicSettings;
use crate::errors::{Error, Result};
use crate::metrics::{Sample, SampleSender};
use crate::sessions::Instance;
use chrono::{DateTime, Utc};
use log::{debug, error};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const NAMESPACE: &str = "AWS/RDS";
pub const INSTANCE_DIMENSION: &str = "DBInstanceIdentifier";

/// Most recent datapoint; upstream returns them in no particular order.
pub fn latest_datapoint(datapoints: &[Datapoint]) -> Option<&Datapoint> {
    datapoints.iter().max_by_key(|d| d.timestamp)
}

#[derive(Debug, Clone)]
pub struct BasicScraper {
    settings: BasicSettings,
    metrics: &'static [MetricDescriptor],
}

impl BasicScraper {
    pub fn new(settings: BasicSettings) -> Self {
        Self::with_metrics(settings, BASIC_METRICS)
    }

    pub fn with_metrics(settings: BasicSettings, metrics: &'static [MetricDescriptor]) -> Self {
        Self { settings, metrics }
    }

    pub fn query(
        &self,
        metric: &MetricDescriptor,
        instance: &Instance,
        now: DateTime<Utc>,
    ) -> StatisticQuery {
        let end = now - chrono::Duration::seconds(seconds(self.settings.delay_seconds));
        let start = end - chrono::Duration::seconds(seconds(self.settings.range_seconds));
        StatisticQuery {
            metric_name: metric.source,
            namespace: NAMESPACE,
            dimension_name: INSTANCE_DIMENSION,
            dimension_value: instance.name.clone(),
            period: self.settings.period(),
            start,
            end,
        }
    }

    /// Queries one metric and publishes its latest datapoint, if any.
    /// Returns whether a sample was published.
    pub async fn scrape_metric(
        &self,
        client: &dyn CloudApi,
        instance: &Instance,
        metric: &MetricDescriptor,
        out: &SampleSender,
    ) -> Result<bool> {
        let now = Utc::now();
        let query = self.query(metric, instance, now);
        let datapoints = client.get_statistic(&query).await.map_err(|e| Error::Fetch {
            instance: instance.to_string(),
            what: metric.source.to_string(),
            source: Box::new(e),
        })?;
        let Some(latest) = latest_datapoint(&datapoints) else {
            debug!("[{instance}] no datapoints for {}", metric.source);
            return Ok(false);
        };
        let sample = Sample::gauge(
            metric.name,
            metric.help,
            instance.const_labels(),
            metric.transform.apply(latest.value, now),
        );
        out.send(sample).map_err(|_| Error::Closed {
            instance: instance.to_string(),
        })?;
        Ok(true)
    }

    /// Scrapes every catalog metric of `instance`, one task per metric, and
    /// waits for all of them. Each metric task holds a `limiter` permit for the
    /// duration of its upstream call; this task holds none.
    pub async fn scrape(
        self: Arc<Self>,
        client: Arc<dyn CloudApi>,
        instance: Arc<Instance>,
        limiter: Arc<Semaphore>,
        out: SampleSender,
    ) -> usize {
        let mut tasks = JoinSet::new();
        for metric in self.metrics {
            let scraper = Arc::clone(&self);
            let client = Arc::clone(&client);
            let instance = Arc::clone(&instance);
            let limiter = Arc::clone(&limiter);
            let out = out.clone();
            tasks.spawn(async move {
                let Ok(_permit) = limiter.acquire_owned().await else {
                    return false;
                };
                match scraper.scrape_metric(client.as_ref(), &instance, metric, &out).await {
                    Ok(published) => published,
                    Err(e) => {
                        error!("[{instance}] {e}");
                        false
                    }
                }
            });
        }
        drop(out);

        let mut published = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => published += 1,
                Ok(false) => {}
                Err(e) => error!("[{instance}] metric task failed: {e}"),
            }
        }
        debug!("[{instance}] published {published} basic samples");
        published
    }
}

fn seconds(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX / 1_000)
}
