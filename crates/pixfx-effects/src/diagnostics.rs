//! Wall-clock timing of labelled sections.
//!
//! Purely observational: nothing in the engine reads these numbers.
//! Timestamps come from `web-time`, which uses `performance.now()` on WASM
//! and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) since
//! `std::time::Duration` does not implement serde traits.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use web_time::Instant;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }
}

/// One finished measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingEntry {
    /// Section label.
    pub label: String,
    /// Elapsed wall-clock time (seconds when serialized).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl TimingEntry {
    /// Whole milliseconds, saturating.
    #[must_use]
    pub fn millis(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Collects section timings in the order they finish.
#[derive(Debug, Default, Serialize)]
pub struct Timing {
    #[serde(skip)]
    running: Vec<(String, Instant)>,
    entries: Vec<TimingEntry>,
}

impl Timing {
    /// An empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the clock for `label`.
    pub fn start(&mut self, label: impl Into<String>) {
        let label = label.into();
        let now = Instant::now();
        match self.running.iter_mut().find(|(l, _)| *l == label) {
            Some((_, started)) => *started = now,
            None => self.running.push((label, now)),
        }
    }

    /// Stop the clock for `label`, record it and return the elapsed
    /// milliseconds. `None` if `label` was never started or already
    /// stopped.
    pub fn stop(&mut self, label: &str) -> Option<u64> {
        let index = self.running.iter().position(|(l, _)| l == label)?;
        let (label, started) = self.running.remove(index);
        let duration = started.elapsed();
        self.record(label, duration);
        self.entries.last().map(TimingEntry::millis)
    }

    /// Record an externally measured duration.
    pub fn record(&mut self, label: impl Into<String>, duration: Duration) {
        self.entries.push(TimingEntry {
            label: label.into(),
            duration,
        });
    }

    /// Finished measurements in completion order.
    #[must_use]
    pub fn entries(&self) -> &[TimingEntry] {
        &self.entries
    }

    /// Sum of all finished measurements.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.entries.iter().map(|e| e.duration).sum()
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TIMINGS ----------")?;
        for entry in &self.entries {
            writeln!(f, "{} : {}ms", entry.label, entry.millis())?;
        }
        writeln!(f, "------------------")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_start_is_none() {
        let mut t = Timing::new();
        assert_eq!(t.stop("decode"), None);
        assert!(t.entries().is_empty());
    }

    #[test]
    fn start_stop_records_once() {
        let mut t = Timing::new();
        t.start("oil");
        assert!(t.stop("oil").is_some());
        assert_eq!(t.stop("oil"), None);
        assert_eq!(t.entries().len(), 1);
        assert_eq!(t.entries()[0].label, "oil");
    }

    #[test]
    fn overlapping_sections() {
        let mut t = Timing::new();
        t.start("total");
        t.start("decode");
        t.stop("decode");
        t.start("decode");
        t.stop("decode");
        t.stop("total");
        let labels: Vec<&str> = t.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["decode", "decode", "total"]);
    }

    #[test]
    fn report_format() {
        let mut t = Timing::new();
        t.record("decode", Duration::from_millis(12));
        t.record("cartoon", Duration::from_micros(1_500_900));
        assert_eq!(
            t.to_string(),
            "TIMINGS ----------\ndecode : 12ms\ncartoon : 1500ms\n------------------\n"
        );
        assert_eq!(t.total(), Duration::from_micros(1_512_900));
    }

    #[test]
    fn empty_report_is_framed() {
        assert_eq!(
            Timing::new().to_string(),
            "TIMINGS ----------\n------------------\n"
        );
    }

    #[test]
    fn serializes_seconds() {
        let mut t = Timing::new();
        t.start("pending");
        t.record("encode", Duration::from_millis(250));
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "entries": [{ "label": "encode", "duration": 0.25 }] })
        );
    }
}
