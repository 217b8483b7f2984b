// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::metrics::{Collect, Labels, Sample};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

const REQUESTS_NAME: &str = "rds_exporter_requests_total";
const REQUESTS_HELP: &str = "Total number of requests made to the AWS APIs.";
const ERRORS_NAME: &str = "rds_exporter_request_errors_total";
const ERRORS_HELP: &str = "Total number of failed requests made to the AWS APIs.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    DescribeDbInstances,
    GetMetricStatistics,
    FilterLogEvents,
}

impl Operation {
    pub const ALL: [Operation; 3] = [
        Operation::DescribeDbInstances,
        Operation::GetMetricStatistics,
        Operation::FilterLogEvents,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::DescribeDbInstances => "DescribeDBInstances",
            Operation::GetMetricStatistics => "GetMetricStatistics",
            Operation::FilterLogEvents => "FilterLogEvents",
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    errors: AtomicU64,
}

/// Per-operation request counters shared by every scope's client.
#[derive(Debug, Default)]
pub struct RequestStats {
    describe_db_instances: Counters,
    get_metric_statistics: Counters,
    filter_log_events: Counters,
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, operation: Operation) -> &Counters {
        match operation {
            Operation::DescribeDbInstances => &self.describe_db_instances,
            Operation::GetMetricStatistics => &self.get_metric_statistics,
            Operation::FilterLogEvents => &self.filter_log_events,
        }
    }

    pub fn record(&self, operation: Operation, succeeded: bool) {
        let counters = self.counters(operation);
        counters.requests.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            counters.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn requests(&self, operation: Operation) -> u64 {
        self.counters(operation).requests.load(Ordering::Relaxed)
    }

    pub fn errors(&self, operation: Operation) -> u64 {
        self.counters(operation).errors.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Collect for RequestStats {
    async fn collect(&self) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(Operation::ALL.len() * 2);
        for operation in Operation::ALL {
            let mut labels = Labels::new();
            labels.insert("operation".to_string(), operation.name().to_string());
            samples.push(Sample::counter(
                REQUESTS_NAME,
                REQUESTS_HELP,
                labels.clone(),
                self.requests(operation) as f64,
            ));
            samples.push(Sample::counter(
                ERRORS_NAME,
                ERRORS_HELP,
                labels,
                self.errors(operation) as f64,
            ));
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_requests_and_errors() {
        let stats = RequestStats::new();
        stats.record(Operation::GetMetricStatistics, true);
        stats.record(Operation::GetMetricStatistics, false);
        stats.record(Operation::FilterLogEvents, true);

        assert_eq!(stats.requests(Operation::GetMetricStatistics), 2);
        assert_eq!(stats.errors(Operation::GetMetricStatistics), 1);
        assert_eq!(stats.requests(Operation::FilterLogEvents), 1);
        assert_eq!(stats.errors(Operation::FilterLogEvents), 0);
        assert_eq!(stats.requests(Operation::DescribeDbInstances), 0);
    }

    #[tokio::test]
    async fn test_collect_reports_every_operation() {
        let stats = RequestStats::new();
        stats.record(Operation::DescribeDbInstances, false);

        let samples = stats.collect().await;
        assert_eq!(samples.len(), 6);
        let errors = samples
            .iter()
            .find(|s| {
                s.name == ERRORS_NAME
                    && s.labels.get("operation").map(String::as_str) == Some("DescribeDBInstances")
            })
            .unwrap();
        assert_eq!(errors.value, 1.0);
    }
}
