// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::catalog::{self, MetricDescriptor};
use crate::metrics::{Labels, Sample, with_labels};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Highest payload version whose layout is fully understood.
pub const SUPPORTED_VERSION: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsMetrics {
    pub engine: String,
    #[serde(rename = "instanceID")]
    pub instance_id: String,
    #[serde(rename = "instanceResourceID")]
    pub instance_resource_id: String,
    pub timestamp: DateTime<Utc>,
    pub version: f64,

    #[serde(default)]
    pub uptime: Option<String>,
    #[serde(default, rename = "numVCPUs")]
    pub num_vcpus: Option<f64>,
    #[serde(default)]
    pub cpu_utilization: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub load_average_minute: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub memory: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub tasks: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub swap: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub network: Option<Vec<NetworkInterface>>,
    #[serde(default, rename = "diskIO")]
    pub disk_io: Option<Vec<DiskDevice>>,
    #[serde(default)]
    pub file_sys: Option<Vec<FileSystem>>,

    // Known but not published.
    #[serde(default)]
    pub process_list: Option<serde_json::Value>,
    #[serde(default, rename = "physicalDeviceIO")]
    pub physical_device_io: Option<serde_json::Value>,

    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkInterface {
    pub interface: String,
    #[serde(default)]
    pub rx: Option<f64>,
    #[serde(default)]
    pub tx: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiskDevice {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystem {
    pub name: String,
    pub mount_point: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

/// A payload section; each one is synchronized as a separate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    General,
    CpuUtilization,
    LoadAverageMinute,
    Memory,
    Tasks,
    Swap,
    Network,
    DiskIo,
    FileSys,
}

impl Section {
    pub const ALL: [Section; 9] = [
        Section::General,
        Section::CpuUtilization,
        Section::LoadAverageMinute,
        Section::Memory,
        Section::Tasks,
        Section::Swap,
        Section::Network,
        Section::DiskIo,
        Section::FileSys,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Section::General => "general",
            Section::CpuUtilization => "cpuUtilization",
            Section::LoadAverageMinute => "loadAverageMinute",
            Section::Memory => "memory",
            Section::Tasks => "tasks",
            Section::Swap => "swap",
            Section::Network => "network",
            Section::DiskIo => "diskIO",
            Section::FileSys => "fileSys",
        }
    }
}

pub fn parse(message: &str) -> Result<OsMetrics, serde_json::Error> {
    serde_json::from_str(message)
}

/// Parses uptime strings like `"20 days, 22:47:30"`, `"1 day, 01:02:03"` or
/// `"05:00:01"` into seconds.
pub fn parse_uptime(uptime: &str) -> Option<u64> {
    let (days, clock) = match uptime.split_once(',') {
        Some((days, clock)) => {
            let days = days
                .trim()
                .strip_suffix("days")
                .or_else(|| days.trim().strip_suffix("day"))?;
            (days.trim().parse::<u64>().ok()?, clock.trim())
        }
        None => (0, uptime.trim()),
    };
    let mut parts = clock.split(':').map(|p| p.parse::<u64>().ok());
    let (h, m, s) = (parts.next()??, parts.next()??, parts.next()??);
    if parts.next().is_some() {
        return None;
    }
    Some(days * 86_400 + h * 3_600 + m * 60 + s)
}

fn sample(
    metric: &MetricDescriptor,
    base: &Labels,
    extra: &[(&str, &str)],
    value: f64,
    now: DateTime<Utc>,
) -> Sample {
    let mut labels = with_labels(base, metric.labels);
    for (name, value) in extra {
        labels.insert((*name).to_string(), (*value).to_string());
    }
    Sample::gauge(metric.name, metric.help, labels, metric.transform.apply(value, now))
}

fn map_samples(
    table: &'static [MetricDescriptor],
    values: &BTreeMap<String, f64>,
    base: &Labels,
    extra: &[(&str, &str)],
    now: DateTime<Utc>,
) -> Vec<Sample> {
    values
        .iter()
        .filter_map(|(field, value)| {
            catalog::find(table, field).map(|metric| sample(metric, base, extra, *value, now))
        })
        .collect()
}

impl OsMetrics {
    pub fn has_section(&self, section: Section) -> bool {
        match section {
            Section::General => self.uptime.is_some() || self.num_vcpus.is_some(),
            Section::CpuUtilization => self.cpu_utilization.is_some(),
            Section::LoadAverageMinute => self.load_average_minute.is_some(),
            Section::Memory => self.memory.is_some(),
            Section::Tasks => self.tasks.is_some(),
            Section::Swap => self.swap.is_some(),
            Section::Network => self.network.is_some(),
            Section::DiskIo => self.disk_io.is_some(),
            Section::FileSys => self.file_sys.is_some(),
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        Section::ALL.into_iter().filter(|s| self.has_section(*s))
    }

    /// Samples of one section, labeled with `base` plus any per-entry labels.
    ///
    /// Uptime is converted to a boot time relative to the payload's own
    /// timestamp, so publishing the same payload twice yields the same value.
    pub fn section_samples(
        &self,
        section: Section,
        base: &Labels,
        now: DateTime<Utc>,
    ) -> Vec<Sample> {
        let empty = BTreeMap::new();
        match section {
            Section::General => {
                let mut samples = Vec::new();
                let vcpus = catalog::find(catalog::GENERAL, "numVCPUs");
                if let (Some(value), Some(metric)) = (self.num_vcpus, vcpus) {
                    samples.push(sample(metric, base, &[], value, now));
                }
                let uptime = self.uptime.as_deref().and_then(parse_uptime);
                if let (Some(seconds), Some(metric)) =
                    (uptime, catalog::find(catalog::GENERAL, "uptime"))
                {
                    samples.push(sample(metric, base, &[], seconds as f64, self.timestamp));
                }
                samples
            }
            Section::CpuUtilization => map_samples(
                catalog::CPU_UTILIZATION,
                self.cpu_utilization.as_ref().unwrap_or(&empty),
                base,
                &[],
                now,
            ),
            Section::LoadAverageMinute => map_samples(
                catalog::LOAD_AVERAGE_MINUTE,
                self.load_average_minute.as_ref().unwrap_or(&empty),
                base,
                &[],
                now,
            ),
            Section::Memory => map_samples(
                catalog::MEMORY,
                self.memory.as_ref().unwrap_or(&empty),
                base,
                &[],
                now,
            ),
            Section::Tasks => map_samples(
                catalog::TASKS,
                self.tasks.as_ref().unwrap_or(&empty),
                base,
                &[],
                now,
            ),
            Section::Swap => map_samples(
                catalog::SWAP,
                self.swap.as_ref().unwrap_or(&empty),
                base,
                &[],
                now,
            ),
            Section::Network => {
                let mut samples = Vec::new();
                for interface in self.network.iter().flatten() {
                    let extra = [("interface", interface.interface.as_str())];
                    for (field, value) in [("rx", interface.rx), ("tx", interface.tx)] {
                        let metric = catalog::find(catalog::NETWORK, field);
                        if let (Some(value), Some(metric)) = (value, metric) {
                            samples.push(sample(metric, base, &extra, value, now));
                        }
                    }
                }
                samples
            }
            Section::DiskIo => self
                .disk_io
                .iter()
                .flatten()
                .flat_map(|disk| {
                    let extra: Vec<(&str, &str)> =
                        disk.device.as_deref().map(|d| ("device", d)).into_iter().collect();
                    map_samples(catalog::DISK_IO, &disk.values, base, &extra, now)
                })
                .collect(),
            Section::FileSys => self
                .file_sys
                .iter()
                .flatten()
                .flat_map(|fs| {
                    let extra = [
                        ("name", fs.name.as_str()),
                        ("mountpoint", fs.mount_point.as_str()),
                    ];
                    map_samples(catalog::FILE_SYS, &fs.values, base, &extra, now)
                })
                .collect(),
        }
    }

    pub fn unknown_fields(&self) -> impl Iterator<Item = &str> {
        self.unknown.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::const_labels;
    use chrono::TimeZone;

    const SAMPLE: &str = include_str!("../../testdata/postgres.json");

    fn base() -> Labels {
        const_labels("us-east-1", "db", &BTreeMap::new())
    }

    fn find<'a>(
        samples: &'a [Sample],
        name: &str,
        label: Option<(&str, &str)>,
    ) -> Option<&'a Sample> {
        samples.iter().find(|s| {
            s.name == name
                && label.is_none_or(|(k, v)| s.labels.get(k).map(String::as_str) == Some(v))
        })
    }

    #[test]
    fn test_parse_full_payload() {
        let metrics = parse(SAMPLE).unwrap();
        assert_eq!(metrics.engine, "POSTGRES");
        assert_eq!(metrics.instance_resource_id, "db-J6JH3LJAWBZ6MXDDWYRG4RRJ6A");
        assert_eq!(
            metrics.timestamp,
            Utc.with_ymd_and_hms(2018, 9, 25, 8, 16, 20).unwrap()
        );
        assert_eq!(metrics.version, 1.0);
        assert_eq!(metrics.sections().count(), Section::ALL.len());
        assert!(metrics.unknown.is_empty());
    }

    #[test]
    fn test_missing_required_field() {
        let message = r#"{"engine": "MYSQL", "instanceID": "db",
            "timestamp": "2018-09-25T08:16:20Z", "version": 1}"#;
        let err = parse(message).unwrap_err();
        assert!(err.to_string().contains("instanceResourceID"));
    }

    #[test]
    fn test_malformed_known_section() {
        let message = r#"{"engine": "MYSQL", "instanceID": "db", "instanceResourceID": "db-X",
            "timestamp": "2018-09-25T08:16:20Z", "version": 1, "memory": {"free": "lots"}}"#;
        assert!(parse(message).is_err());
    }

    #[test]
    fn test_unknown_fields_are_kept_aside() {
        let message = r#"{"engine": "MYSQL", "instanceID": "db", "instanceResourceID": "db-X",
            "timestamp": "2018-09-25T08:16:20Z", "version": 1.1, "futureSection": {"a": 1}}"#;
        let metrics = parse(message).unwrap();
        assert_eq!(metrics.unknown_fields().collect::<Vec<_>>(), vec!["futureSection"]);
        assert_eq!(metrics.sections().count(), 0);
    }

    #[test]
    fn test_parse_uptime() {
        assert_eq!(
            parse_uptime("20 days, 22:47:30"),
            Some(20 * 86_400 + 22 * 3_600 + 47 * 60 + 30)
        );
        assert_eq!(parse_uptime("1 day, 01:02:03"), Some(86_400 + 3_723));
        assert_eq!(parse_uptime("05:00:01"), Some(18_001));
        assert_eq!(parse_uptime("soon"), None);
        assert_eq!(parse_uptime("1:2:3:4"), None);
    }

    #[test]
    fn test_section_samples() {
        let metrics = parse(SAMPLE).unwrap();
        let now = Utc.with_ymd_and_hms(2018, 9, 25, 8, 17, 0).unwrap();
        let samples: Vec<Sample> = metrics
            .sections()
            .flat_map(|s| metrics.section_samples(s, &base(), now))
            .collect();

        let idle = find(&samples, "node_cpu_average", Some(("mode", "idle"))).unwrap();
        assert_eq!(idle.value, 97.21);
        assert_eq!(idle.labels.get("cpu").map(String::as_str), Some("All"));
        assert_eq!(idle.labels.get("instance").map(String::as_str), Some("db"));

        assert_eq!(find(&samples, "node_load1", None).unwrap().value, 0.03);
        assert_eq!(
            find(&samples, "node_memory_MemTotal_bytes", None).unwrap().value,
            3_854_700.0 * 1024.0
        );
        assert_eq!(find(&samples, "node_memory_HugePages_Total", None).unwrap().value, 0.0);
        assert_eq!(
            find(&samples, "rdsosmetrics_General_numVCPUs", None).unwrap().value,
            1.0
        );
        assert_eq!(find(&samples, "node_procs_running", None).unwrap().value, 1.0);
        assert_eq!(
            find(&samples, "rdsosmetrics_network_rx", Some(("interface", "eth0"))).unwrap().value,
            2_357.5
        );
        assert_eq!(
            find(&samples, "rdsosmetrics_diskIO_util", Some(("device", "rdsdev"))).unwrap().value,
            0.17
        );
        let fs = find(
            &samples,
            "node_filesystem_size_bytes",
            Some(("mountpoint", "/rdsdbdata")),
        )
        .unwrap();
        assert_eq!(fs.labels.get("name").map(String::as_str), Some("rdsfilesys"));
        assert_eq!(fs.value, 5_029_504.0 * 1024.0);

        // "1 day, 00:00:10" before the payload timestamp, not before `now`
        let boot = find(&samples, "node_boot_time_seconds", None).unwrap();
        assert_eq!(boot.value, (metrics.timestamp.timestamp() - 86_410) as f64);
    }

    #[test]
    fn test_boot_time_ignores_scrape_time() {
        let metrics = parse(SAMPLE).unwrap();
        let boot_at = |now: DateTime<Utc>| {
            let samples = metrics.section_samples(Section::General, &base(), now);
            find(&samples, "node_boot_time_seconds", None).unwrap().value
        };
        let first = boot_at(Utc.with_ymd_and_hms(2018, 9, 25, 8, 17, 0).unwrap());
        let later = boot_at(Utc.with_ymd_and_hms(2018, 9, 25, 9, 30, 0).unwrap());
        assert_eq!(first, later);
    }
}
