//! Fixed-bucket latency histogram.
//!
//! Buckets are cumulative (`value <= le`) with an implicit `+Inf` bucket equal
//! to the series count. Counters are atomics; the `f64` sum is kept as raw
//! bits and updated with a CAS loop.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use super::labels::{validate_metric_name, LabelSchema, LabelSet};
use super::registry::{Collector, FamilySnapshot};
use super::ObservationSink;
use crate::error::{ReqLensError, Result};

/// Upper bounds (seconds) used when none are configured.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Debug, Clone)]
pub struct HistogramOpts {
    pub name: String,
    pub help: String,
    pub buckets: Vec<f64>,
}

impl Default for HistogramOpts {
    fn default() -> Self {
        Self {
            name: "http_request_duration_seconds".into(),
            help: "request duration in seconds".into(),
            buckets: DEFAULT_BUCKETS.to_vec(),
        }
    }
}

impl HistogramOpts {
    pub fn validate(&self) -> Result<()> {
        validate_metric_name(&self.name)?;
        if self.buckets.is_empty() {
            return Err(ReqLensError::InvalidConfig("histogram buckets must not be empty".into()));
        }
        if self.buckets.iter().any(|b| !b.is_finite() || *b <= 0.0) {
            return Err(ReqLensError::InvalidConfig(
                "histogram buckets must be finite and positive".into(),
            ));
        }
        if self.buckets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ReqLensError::InvalidConfig(
                "histogram buckets must be strictly increasing".into(),
            ));
        }
        Ok(())
    }
}

/// Cumulative count for one finite upper bound.
#[derive(Debug, Clone, Serialize)]
pub struct BucketCount {
    pub le: f64,
    pub count: u64,
}

/// Point-in-time view of one histogram series. `count` doubles as the
/// `+Inf` bucket.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramSnapshot {
    pub labels: LabelSet,
    pub count: u64,
    pub sum: f64,
    pub buckets: Vec<BucketCount>,
}

struct AtomicHistogram {
    count: AtomicU64,
    sum_bits: AtomicU64,
    buckets: Box<[AtomicU64]>,
}

impl AtomicHistogram {
    fn new(bucket_count: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_bits: AtomicU64::new(0f64.to_bits()),
            buckets: (0..bucket_count).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn sum(&self) -> f64 {
        f64::from_bits(self.sum_bits.load(Ordering::Relaxed))
    }

    fn record(&self, bounds: &[f64], value: f64) {
        for (&le, bucket) in bounds.iter().zip(self.buckets.iter()) {
            if value <= le {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.add_sum(value);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn add_sum(&self, v: f64) {
        let mut cur = self.sum_bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(cur) + v).to_bits();
            match self
                .sum_bits
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
    }
}

pub struct HistogramVec {
    name: String,
    help: String,
    schema: LabelSchema,
    bounds: Vec<f64>,
    map: DashMap<Vec<String>, AtomicHistogram>,
}

impl HistogramVec {
    pub fn new(opts: HistogramOpts, schema: LabelSchema) -> Result<Self> {
        opts.validate()?;
        schema.reject_reserved("le")?;
        Ok(Self {
            name: opts.name,
            help: opts.help,
            schema,
            bounds: opts.buckets,
            map: DashMap::new(),
        })
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Snapshot of the series matching `labels` exactly, if it has been observed.
    pub fn series(&self, labels: &LabelSet) -> Option<HistogramSnapshot> {
        let key = self.schema.key_for(&self.name, labels).ok()?;
        self.map.get(&key).map(|h| self.snapshot_of(&key, h.value()))
    }

    /// Snapshots of every observed series.
    pub fn snapshots(&self) -> Vec<HistogramSnapshot> {
        self.map
            .iter()
            .map(|r| self.snapshot_of(r.key(), r.value()))
            .collect()
    }

    fn snapshot_of(&self, key: &[String], hist: &AtomicHistogram) -> HistogramSnapshot {
        HistogramSnapshot {
            labels: self.schema.label_set(key),
            count: hist.count.load(Ordering::Relaxed),
            sum: hist.sum(),
            buckets: self
                .bounds
                .iter()
                .zip(hist.buckets.iter())
                .map(|(&le, c)| BucketCount { le, count: c.load(Ordering::Relaxed) })
                .collect(),
        }
    }
}

impl ObservationSink for HistogramVec {
    fn observe(&self, labels: &LabelSet, value: f64) -> Result<()> {
        let key = self.schema.key_for(&self.name, labels)?;
        // Existing series only need the shard read lock.
        if let Some(hist) = self.map.get(&key) {
            hist.record(&self.bounds, value);
            return Ok(());
        }
        self.map
            .entry(key)
            .or_insert_with(|| AtomicHistogram::new(self.bounds.len()))
            .record(&self.bounds, value);
        Ok(())
    }
}

impl Collector for HistogramVec {
    fn name(&self) -> &str {
        &self.name
    }

    /// Render in Prometheus text exposition format (unit: seconds).
    fn render(&self, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", self.name, self.help);
        let _ = writeln!(out, "# TYPE {} histogram", self.name);
        for r in self.map.iter() {
            let label_str = self.schema.render_pairs(r.key());
            let hist = r.value();
            let prefix = if label_str.is_empty() {
                String::new()
            } else {
                format!("{},", label_str)
            };

            for (le, bucket) in self.bounds.iter().zip(hist.buckets.iter()) {
                let count = bucket.load(Ordering::Relaxed);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", self.name, prefix, le, count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", self.name, prefix, count);
            let _ = writeln!(out, "{}_sum{{{}}} {}", self.name, label_str, hist.sum());
            let _ = writeln!(out, "{}_count{{{}}} {}", self.name, label_str, count);
        }
    }

    fn snapshot(&self) -> FamilySnapshot {
        FamilySnapshot::Histogram {
            name: self.name.clone(),
            help: self.help.clone(),
            series: self.snapshots(),
        }
    }
}
