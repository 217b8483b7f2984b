// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Published samples and their Prometheus text exposition.
//!
//! Collectors are "unchecked": nothing is declared up front, and the set of
//! names produced may change from one collection to the next.

use async_trait::async_trait;
use log::warn;
use prometheus::proto::{self, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::mpsc;

pub type Labels = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: Labels,
    pub value: f64,
}

impl Sample {
    pub fn gauge(name: &'static str, help: &'static str, labels: Labels, value: f64) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
            labels,
            value,
        }
    }

    pub fn counter(name: &'static str, help: &'static str, labels: Labels, value: f64) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Counter,
            labels,
            value,
        }
    }
}

/// Shared output that scrape tasks publish onto.
pub type SampleSender = mpsc::UnboundedSender<Sample>;

/// Something that produces a fresh set of samples on every call.
#[async_trait]
pub trait Collect: Send + Sync {
    async fn collect(&self) -> Vec<Sample>;
}

/// Default `{region, instance}` labels with per-instance overrides applied.
/// An override with an empty value removes the label.
pub fn const_labels(region: &str, instance: &str, overrides: &BTreeMap<String, String>) -> Labels {
    let mut labels = Labels::new();
    labels.insert("region".to_string(), region.to_string());
    labels.insert("instance".to_string(), instance.to_string());
    for (name, value) in overrides {
        if value.is_empty() {
            labels.remove(name);
        } else {
            labels.insert(name.clone(), value.clone());
        }
    }
    labels
}

/// `base` plus sample-specific labels; sample-specific labels win on conflict.
pub fn with_labels(base: &Labels, extra: &[(&str, &str)]) -> Labels {
    let mut labels = base.clone();
    for (name, value) in extra {
        labels.insert((*name).to_string(), (*value).to_string());
    }
    labels
}

struct Family {
    help: &'static str,
    kind: MetricKind,
    metrics: Vec<proto::Metric>,
    seen: HashSet<Labels>,
}

fn to_proto(sample: &Sample) -> proto::Metric {
    let mut metric = proto::Metric::default();
    for (name, value) in &sample.labels {
        let mut pair = proto::LabelPair::default();
        pair.set_name(name.clone());
        pair.set_value(value.clone());
        metric.mut_label().push(pair);
    }
    match sample.kind {
        MetricKind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(sample.value);
            metric.set_gauge(gauge);
        }
        MetricKind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(sample.value);
            metric.set_counter(counter);
        }
    }
    metric
}

/// Group samples into metric families, sorted by name. Samples repeating an
/// already seen `(name, labels)` pair are dropped.
pub fn to_families(samples: Vec<Sample>) -> Vec<MetricFamily> {
    let mut families: BTreeMap<&'static str, Family> = BTreeMap::new();
    for sample in samples {
        let family = families.entry(sample.name).or_insert_with(|| Family {
            help: sample.help,
            kind: sample.kind,
            metrics: Vec::new(),
            seen: HashSet::new(),
        });
        if family.kind != sample.kind {
            warn!(
                "dropping {} sample with type {:?}, family is {:?}",
                sample.name, sample.kind, family.kind
            );
            continue;
        }
        if !family.seen.insert(sample.labels.clone()) {
            warn!(
                "dropping duplicate sample {} {:?}; check label overrides",
                sample.name, sample.labels
            );
            continue;
        }
        family.metrics.push(to_proto(&sample));
    }

    families
        .into_iter()
        .map(|(name, family)| {
            let mut mf = MetricFamily::default();
            mf.set_name(name.to_string());
            mf.set_help(family.help.to_string());
            mf.set_field_type(match family.kind {
                MetricKind::Gauge => MetricType::GAUGE,
                MetricKind::Counter => MetricType::COUNTER,
            });
            for metric in family.metrics {
                mf.mut_metric().push(metric);
            }
            mf
        })
        .collect()
}

/// Encode samples in the Prometheus text format.
pub fn encode(samples: Vec<Sample>) -> Result<Vec<u8>, prometheus::Error> {
    let families = to_families(samples);
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    Ok(buffer)
}

pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_const_labels_defaults() {
        let got = const_labels("us-east-1", "db", &BTreeMap::new());
        assert_eq!(got, labels(&[("instance", "db"), ("region", "us-east-1")]));
    }

    #[test]
    fn test_const_labels_overrides_add_replace_and_remove() {
        let overrides = labels(&[("team", "storage"), ("instance", ""), ("region", "east")]);
        let got = const_labels("us-east-1", "db", &overrides);
        assert_eq!(got, labels(&[("region", "east"), ("team", "storage")]));
    }

    #[test]
    fn test_with_labels_sample_label_wins() {
        let base = labels(&[("region", "us-east-1"), ("mode", "base")]);
        let got = with_labels(&base, &[("mode", "idle"), ("cpu", "All")]);
        assert_eq!(
            got,
            labels(&[("cpu", "All"), ("mode", "idle"), ("region", "us-east-1")])
        );
    }

    #[test]
    fn test_encode_groups_by_name() {
        let samples = vec![
            Sample::gauge("b_metric", "B help.", labels(&[("instance", "x")]), 2.0),
            Sample::gauge("a_metric", "A help.", labels(&[("instance", "x")]), 1.5),
            Sample::gauge("b_metric", "B help.", labels(&[("instance", "y")]), 3.0),
        ];
        let text = String::from_utf8(encode(samples).unwrap()).unwrap();
        let expected = "# HELP a_metric A help.\n\
# TYPE a_metric gauge\n\
a_metric{instance=\"x\"} 1.5\n\
# HELP b_metric B help.\n\
# TYPE b_metric gauge\n\
b_metric{instance=\"x\"} 2\n\
b_metric{instance=\"y\"} 3\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_encode_counter_type() {
        let samples = vec![Sample::counter("requests_total", "Requests.", Labels::new(), 7.0)];
        let text = String::from_utf8(encode(samples).unwrap()).unwrap();
        assert!(text.contains("# TYPE requests_total counter"));
        assert!(text.contains("requests_total 7"));
    }

    #[test]
    fn test_duplicate_series_keep_first() {
        let samples = vec![
            Sample::gauge("m", "h", labels(&[("region", "r")]), 1.0),
            Sample::gauge("m", "h", labels(&[("region", "r")]), 2.0),
        ];
        let families = to_families(samples);
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_metric().len(), 1);
        assert_eq!(families[0].get_metric()[0].get_gauge().get_value(), 1.0);
    }

    #[test]
    fn test_encode_empty() {
        assert!(encode(Vec::new()).unwrap().is_empty());
    }
}
