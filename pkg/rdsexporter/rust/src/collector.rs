// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! One collection cycle across every resolved instance.

use crate::basic::BasicScraper;
use crate::config::BasicSettings;
use crate::enhanced::EnhancedScraper;
use crate::metrics::{Collect, Labels, Sample, SampleSender};
use crate::sessions::SessionPool;
use async_trait::async_trait;
use log::{debug, error};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

pub const SCRAPE_DURATION_NAME: &str = "rds_exporter_scrape_duration_seconds";
const SCRAPE_DURATION_HELP: &str = "Time this RDS scrape took, in seconds.";

pub struct Exporter {
    pool: Arc<SessionPool>,
    basic: Arc<BasicScraper>,
    enhanced: Arc<EnhancedScraper>,
    max_concurrency: usize,
}

impl Exporter {
    pub fn new(pool: SessionPool, settings: BasicSettings, max_concurrency: usize) -> Self {
        let enhanced = EnhancedScraper::new(&pool);
        Self::with_scrapers(pool, BasicScraper::new(settings), enhanced, max_concurrency)
    }

    pub fn with_scrapers(
        pool: SessionPool,
        basic: BasicScraper,
        enhanced: EnhancedScraper,
        max_concurrency: usize,
    ) -> Self {
        Self {
            pool: Arc::new(pool),
            basic: Arc::new(basic),
            enhanced: Arc::new(enhanced),
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// Runs every enabled source for every instance and waits for all of them.
    /// One task per instance and source; low-resolution tasks fan out further.
    /// Failures are logged and only cost the affected samples.
    pub async fn scrape(&self, out: SampleSender) {
        let limiter = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (scope, instance) in self.pool.instances() {
            let client = scope.client();
            if !instance.disable_basic_metrics {
                tasks.spawn(Arc::clone(&self.basic).scrape(
                    Arc::clone(client),
                    Arc::clone(instance),
                    Arc::clone(&limiter),
                    out.clone(),
                ));
            }
            if instance.disable_enhanced_metrics {
                continue;
            }
            if instance.monitoring_interval.is_zero() {
                debug!("[{instance}] enhanced monitoring is off, skipping");
                continue;
            }
            let enhanced = Arc::clone(&self.enhanced);
            let client = Arc::clone(client);
            let instance = Arc::clone(instance);
            let limiter = Arc::clone(&limiter);
            let out = out.clone();
            tasks.spawn(async move {
                let Ok(_permit) = limiter.acquire_owned().await else {
                    return 0;
                };
                match enhanced.scrape(client.as_ref(), &instance, &out).await {
                    Ok(published) => {
                        debug!("[{instance}] published {published} enhanced samples");
                        published
                    }
                    Err(e) => {
                        error!("[{instance}] {e}");
                        0
                    }
                }
            });
        }
        drop(out);

        let mut published = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(n) => published += n,
                Err(e) => error!("scrape task failed: {e}"),
            }
        }
        debug!("scrape cycle published {published} samples");
    }
}

#[async_trait]
impl Collect for Exporter {
    async fn collect(&self) -> Vec<Sample> {
        let start = Instant::now();
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.scrape(tx).await;

        let mut samples = Vec::new();
        while let Some(sample) = rx.recv().await {
            samples.push(sample);
        }
        samples.push(Sample::gauge(
            SCRAPE_DURATION_NAME,
            SCRAPE_DURATION_HELP,
            Labels::new(),
            start.elapsed().as_secs_f64(),
        ));
        samples
    }
}
