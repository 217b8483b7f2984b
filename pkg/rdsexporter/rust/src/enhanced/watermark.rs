// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Cross-stream synchronization of high-resolution payloads.
//!
//! Each payload section is its own sub-stream and they can arrive with
//! different lag. The next watermark is the earliest of the per-stream
//! latest timestamps, so a stream that is behind holds every stream back
//! until it catches up. A stream that has not been seen for longer than the
//! grace period, counted back from the newest observation, has ended and no
//! longer holds the others.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// Observed timestamps per stream name.
pub type StreamTimes = BTreeMap<String, Vec<DateTime<Utc>>>;

/// Latest timestamp of every stream that has at least one observation.
pub fn latest_per_stream(all: &StreamTimes) -> BTreeMap<String, DateTime<Utc>> {
    all.iter()
        .filter_map(|(stream, times)| times.iter().max().map(|t| (stream.clone(), *t)))
        .collect()
}

/// Minimum of the per-stream latest timestamps; `None` when nothing was observed.
pub fn next_watermark(latest: &BTreeMap<String, DateTime<Utc>>) -> Option<DateTime<Utc>> {
    latest.values().min().copied()
}

pub fn synchronize(
    all: &StreamTimes,
) -> (BTreeMap<String, DateTime<Utc>>, Option<DateTime<Utc>>) {
    let latest = latest_per_stream(all);
    let next = next_watermark(&latest);
    (latest, next)
}

/// Keeps the streams whose latest timestamp is within `grace` of the newest one.
pub fn live_streams(
    latest: BTreeMap<String, DateTime<Utc>>,
    grace: chrono::Duration,
) -> BTreeMap<String, DateTime<Utc>> {
    let Some(newest) = latest.values().max().copied() else {
        return latest;
    };
    latest
        .into_iter()
        .filter(|(_, at)| *at >= newest - grace)
        .collect()
}

/// [`BOOTSTRAP_INTERVALS`] monitoring intervals; a zero interval counts as a minute.
pub fn lookback(interval: Duration) -> chrono::Duration {
    let interval = if interval.is_zero() {
        FALLBACK_INTERVAL
    } else {
        interval
    };
    chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::seconds(60))
        * BOOTSTRAP_INTERVALS
}

/// Position up to which an instance's payloads have been published.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Watermark(Option<DateTime<Utc>>);

/// Number of monitoring intervals looked back on the first fetch.
pub const BOOTSTRAP_INTERVALS: i32 = 3;

const FALLBACK_INTERVAL: Duration = Duration::from_secs(60);

impl Watermark {
    pub fn get(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// Inclusive start of the next fetch.
    pub fn fetch_start(&self, now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
        match self.0 {
            Some(at) => at,
            None => now - lookback(interval),
        }
    }

    /// Moves the watermark forward. Never moves it back; returns whether it moved.
    pub fn advance(&mut self, to: DateTime<Utc>) -> bool {
        match self.0 {
            Some(current) if current >= to => false,
            _ => {
                self.0 = Some(to);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 9, 29, h, m, s).unwrap()
    }

    #[test]
    fn test_slowest_stream_sets_watermark() {
        let mut all = StreamTimes::new();
        all.insert("1".into(), vec![at(16, 27, 12), at(16, 27, 42)]);
        all.insert("2".into(), vec![at(16, 27, 46), at(16, 26, 46)]);
        all.insert("3".into(), vec![at(16, 27, 51)]);
        all.insert("4".into(), vec![at(16, 27, 3), at(16, 28, 3), at(16, 27, 33)]);

        let (latest, next) = synchronize(&all);

        assert_eq!(latest.get("1"), Some(&at(16, 27, 42)));
        assert_eq!(latest.get("2"), Some(&at(16, 27, 46)));
        assert_eq!(latest.get("3"), Some(&at(16, 27, 51)));
        assert_eq!(latest.get("4"), Some(&at(16, 28, 3)));
        assert_eq!(next, Some(at(16, 27, 42)));
    }

    #[test]
    fn test_empty_streams_are_ignored() {
        let mut all = StreamTimes::new();
        all.insert("empty".into(), vec![]);
        all.insert("cpu".into(), vec![at(10, 0, 0)]);

        let (latest, next) = synchronize(&all);
        assert_eq!(latest.len(), 1);
        assert_eq!(next, Some(at(10, 0, 0)));
    }

    #[test]
    fn test_nothing_observed() {
        assert_eq!(synchronize(&StreamTimes::new()).1, None);
    }

    #[test]
    fn test_silent_stream_ends_after_grace() {
        let mut all = StreamTimes::new();
        all.insert("swap".into(), vec![at(10, 0, 0)]);
        all.insert("load".into(), vec![at(10, 0, 0), at(10, 0, 3)]);
        all.insert("tasks".into(), vec![at(10, 0, 0), at(10, 0, 3), at(10, 0, 5)]);
        let (latest, _) = synchronize(&all);

        let live = live_streams(latest.clone(), chrono::Duration::seconds(3));
        assert!(!live.contains_key("swap"));
        assert_eq!(next_watermark(&live), Some(at(10, 0, 3)));

        let live = live_streams(latest, chrono::Duration::seconds(5));
        assert_eq!(next_watermark(&live), Some(at(10, 0, 0)));
        assert!(live_streams(BTreeMap::new(), chrono::Duration::zero()).is_empty());
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut watermark = Watermark::default();
        assert!(watermark.advance(at(12, 0, 0)));
        assert!(!watermark.advance(at(11, 59, 0)));
        assert!(!watermark.advance(at(12, 0, 0)));
        assert_eq!(watermark.get(), Some(at(12, 0, 0)));
        assert!(watermark.advance(at(12, 1, 0)));
        assert_eq!(watermark.get(), Some(at(12, 1, 0)));
    }

    #[test]
    fn test_fetch_start() {
        let now = at(12, 0, 0);
        let fresh = Watermark::default();
        assert_eq!(fresh.fetch_start(now, Duration::from_secs(5)), at(11, 59, 45));
        assert_eq!(fresh.fetch_start(now, Duration::ZERO), at(11, 57, 0));

        let mut seen = Watermark::default();
        seen.advance(at(11, 30, 0));
        assert_eq!(seen.fetch_start(now, Duration::from_secs(5)), at(11, 30, 0));
    }
}
