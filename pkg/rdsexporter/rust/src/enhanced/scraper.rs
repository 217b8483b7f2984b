// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use super::payload::{self, OsMetrics, SUPPORTED_VERSION, Section};
use super::watermark::{StreamTimes, Watermark, live_streams, lookback, next_watermark, synchronize};
use crate::client::CloudApi;
use crate::errors::{Error, Result};
use crate::metrics::SampleSender;
use crate::sessions::{Instance, SessionPool};
use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::Mutex;

/// Scrapes high-resolution payloads. Keeps one watermark per resolved instance
/// for the lifetime of the process.
#[derive(Debug, Default)]
pub struct EnhancedScraper {
    watermarks: HashMap<(String, String), Mutex<Watermark>>,
}

/// Picks, for every live section stream, the latest payload carrying it that
/// is not newer than `next`.
fn select<'a>(
    payloads: &'a [OsMetrics],
    live: &BTreeMap<String, DateTime<Utc>>,
    next: DateTime<Utc>,
) -> Vec<(Section, &'a OsMetrics)> {
    Section::ALL
        .into_iter()
        .filter(|section| live.contains_key(section.name()))
        .filter_map(|section| {
            payloads
                .iter()
                .filter(|p| p.has_section(section) && p.timestamp <= next)
                .max_by_key(|p| p.timestamp)
                .map(|p| (section, p))
        })
        .collect()
}

impl EnhancedScraper {
    pub fn new(pool: &SessionPool) -> Self {
        let watermarks = pool
            .instances()
            .map(|(_, instance)| {
                (
                    (instance.region.clone(), instance.name.clone()),
                    Mutex::new(Watermark::default()),
                )
            })
            .collect();
        Self { watermarks }
    }

    pub async fn watermark(&self, instance: &Instance) -> Option<DateTime<Utc>> {
        let slot = self
            .watermarks
            .get(&(instance.region.clone(), instance.name.clone()))?;
        slot.lock().await.get()
    }

    /// Fetches payloads since the watermark, publishes the synchronized ones and
    /// advances the watermark. Returns the number of samples published.
    ///
    /// The watermark is left untouched when any step fails or nothing was fetched.
    /// Concurrent calls for the same instance are serialized.
    pub async fn scrape(
        &self,
        client: &dyn CloudApi,
        instance: &Instance,
        out: &SampleSender,
    ) -> Result<usize> {
        let slot = self
            .watermarks
            .get(&(instance.region.clone(), instance.name.clone()))
            .ok_or_else(|| Error::UnresolvedInstance {
                instance: instance.to_string(),
            })?;
        let mut watermark = slot.lock().await;

        let now = Utc::now();
        let since = watermark.fetch_start(now, instance.monitoring_interval);
        let records = client
            .fetch_payloads(&instance.resource_id, since)
            .await
            .map_err(|e| Error::Fetch {
                instance: instance.to_string(),
                what: "enhanced monitoring payloads".to_string(),
                source: Box::new(e),
            })?;
        trace!("[{instance}] fetched {} payloads since {since}", records.len());

        let mut payloads = Vec::with_capacity(records.len());
        for record in &records {
            payloads.push(decode(instance, &record.message)?);
        }
        if let Some(newest) = payloads
            .iter()
            .map(|p| p.version)
            .filter(|v| *v > SUPPORTED_VERSION)
            .reduce(f64::max)
        {
            warn!(
                "[{instance}] payload version {newest} is newer than {SUPPORTED_VERSION}, \
                 unknown fields are skipped"
            );
        }

        let mut times = StreamTimes::new();
        for p in &payloads {
            for section in p.sections() {
                times
                    .entry(section.name().to_string())
                    .or_default()
                    .push(p.timestamp);
            }
        }
        let (latest, _) = synchronize(&times);
        let live = live_streams(latest, lookback(instance.monitoring_interval));
        let Some(next) = next_watermark(&live) else {
            debug!("[{instance}] no new payloads");
            return Ok(0);
        };

        let base = instance.const_labels();
        let mut published = 0;
        for (section, p) in select(&payloads, &live, next) {
            for sample in p.section_samples(section, &base, now) {
                out.send(sample).map_err(|_| Error::Closed {
                    instance: instance.to_string(),
                })?;
                published += 1;
            }
        }

        if watermark.advance(next) {
            debug!("[{instance}] watermark advanced to {next}");
        }
        Ok(published)
    }
}

fn decode(instance: &Instance, message: &str) -> Result<OsMetrics> {
    let schema_error = |reason: String| Error::Schema {
        instance: instance.to_string(),
        reason,
    };
    let metrics = payload::parse(message).map_err(|e| schema_error(e.to_string()))?;
    if metrics.instance_resource_id != instance.resource_id {
        return Err(schema_error(format!(
            "payload belongs to {}, expected {}",
            metrics.instance_resource_id, instance.resource_id
        )));
    }
    let unknown: BTreeSet<&str> = metrics.unknown_fields().collect();
    if !unknown.is_empty() {
        debug!("[{instance}] ignoring unknown payload fields: {unknown:?}");
    }
    Ok(metrics)
}
