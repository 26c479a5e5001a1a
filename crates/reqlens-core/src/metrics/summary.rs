//! Sliding-window quantile summary.
//!
//! Each series keeps `age_buckets` HdrHistograms in a ring. Every observation
//! lands in all of them; quantiles are read from the head, which is reset and
//! advanced once per `max_age / age_buckets`. The head therefore covers at
//! most `max_age` of history. Count and sum are cumulative, as in Prometheus.
//! Values are stored in microseconds with 3 significant figures.

use std::fmt::Write;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use super::labels::{validate_metric_name, LabelSchema, LabelSet};
use super::registry::{Collector, FamilySnapshot};
use super::ObservationSink;
use crate::error::{ReqLensError, Result};

pub const DEFAULT_QUANTILES: [f64; 7] = [0.01, 0.05, 0.5, 0.9, 0.95, 0.99, 0.999];
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(600);
pub const DEFAULT_AGE_BUCKETS: u32 = 5;
/// Every series allocates one HdrHistogram per age bucket.
pub const MAX_AGE_BUCKETS: u32 = 60;
/// Shortest allowed rotation step (`max_age / age_buckets`).
pub const MIN_ROTATION: Duration = Duration::from_millis(1);

const HIST_SIGFIG: u8 = 3;
const MICROS_PER_SEC: f64 = 1_000_000.0;

#[derive(Debug, Clone)]
pub struct SummaryOpts {
    pub name: String,
    pub help: String,
    pub quantiles: Vec<f64>,
    pub max_age: Duration,
    pub age_buckets: u32,
}

impl Default for SummaryOpts {
    fn default() -> Self {
        Self {
            name: "http_request_summary_seconds".into(),
            help: "request duration in seconds summary".into(),
            quantiles: DEFAULT_QUANTILES.to_vec(),
            max_age: DEFAULT_MAX_AGE,
            age_buckets: DEFAULT_AGE_BUCKETS,
        }
    }
}

impl SummaryOpts {
    pub fn validate(&self) -> Result<()> {
        validate_metric_name(&self.name)?;
        if self.quantiles.iter().any(|q| !(*q > 0.0 && *q < 1.0)) {
            return Err(ReqLensError::InvalidConfig(
                "summary quantiles must be within (0, 1)".into(),
            ));
        }
        if self.max_age.is_zero() {
            return Err(ReqLensError::InvalidConfig("summary max_age must be positive".into()));
        }
        if self.age_buckets == 0 || self.age_buckets > MAX_AGE_BUCKETS {
            return Err(ReqLensError::InvalidConfig(format!(
                "summary age_buckets must be between 1 and {MAX_AGE_BUCKETS}"
            )));
        }
        if self.max_age / self.age_buckets < MIN_ROTATION {
            return Err(ReqLensError::InvalidConfig(
                "summary max_age / age_buckets must be at least 1ms".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuantileValue {
    pub quantile: f64,
    /// `None` while the current window holds no observation.
    pub value: Option<f64>,
}

/// Point-in-time view of one summary series.
#[derive(Debug, Clone, Serialize)]
pub struct SummarySnapshot {
    pub labels: LabelSet,
    pub count: u64,
    pub sum: f64,
    pub quantiles: Vec<QuantileValue>,
}

impl SummarySnapshot {
    pub fn quantile(&self, q: f64) -> Option<f64> {
        self.quantiles
            .iter()
            .find(|v| (v.quantile - q).abs() < f64::EPSILON)
            .and_then(|v| v.value)
    }
}

struct TimeWindowQuantiles {
    ring: Vec<Histogram<u64>>,
    head: usize,
    rotate_every: Duration,
    last_rotation: Instant,
}

impl TimeWindowQuantiles {
    fn new(max_age: Duration, age_buckets: u32) -> Result<Self> {
        let ring = (0..age_buckets)
            .map(|_| Histogram::<u64>::new(HIST_SIGFIG))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ReqLensError::Internal(format!("histogram creation failed: {e}")))?;
        Ok(Self {
            ring,
            head: 0,
            rotate_every: max_age / age_buckets,
            last_rotation: Instant::now(),
        })
    }

    fn rotate(&mut self) {
        let elapsed = self.last_rotation.elapsed();
        if elapsed < self.rotate_every {
            return;
        }
        let steps = (elapsed.as_nanos() / self.rotate_every.as_nanos().max(1)) as usize;
        if steps >= self.ring.len() {
            self.ring.iter_mut().for_each(|h| h.reset());
            self.last_rotation = Instant::now();
            return;
        }
        for _ in 0..steps {
            if let Some(h) = self.ring.get_mut(self.head) {
                h.reset();
            }
            self.head = (self.head + 1) % self.ring.len();
        }
        self.last_rotation += self.rotate_every * steps as u32;
    }

    fn record(&mut self, micros: u64) -> Result<()> {
        self.rotate();
        for h in &mut self.ring {
            h.record(micros)
                .map_err(|e| ReqLensError::Internal(format!("histogram record failed: {e}")))?;
        }
        Ok(())
    }

    fn quantile(&mut self, q: f64) -> Option<f64> {
        self.rotate();
        let h = self.ring.get(self.head)?;
        if h.len() == 0 {
            return None;
        }
        Some(h.value_at_quantile(q) as f64 / MICROS_PER_SEC)
    }
}

struct SummarySeries {
    window: TimeWindowQuantiles,
    count: u64,
    sum: f64,
}

impl SummarySeries {
    fn record(&mut self, value: f64) -> Result<()> {
        let micros = (value.max(0.0) * MICROS_PER_SEC).round() as u64;
        self.window.record(micros)?;
        self.count += 1;
        self.sum += value;
        Ok(())
    }
}

pub struct SummaryVec {
    name: String,
    help: String,
    schema: LabelSchema,
    quantiles: Vec<f64>,
    max_age: Duration,
    age_buckets: u32,
    map: DashMap<Vec<String>, Mutex<SummarySeries>>,
}

impl SummaryVec {
    pub fn new(opts: SummaryOpts, schema: LabelSchema) -> Result<Self> {
        opts.validate()?;
        schema.reject_reserved("quantile")?;
        Ok(Self {
            name: opts.name,
            help: opts.help,
            schema,
            quantiles: opts.quantiles,
            max_age: opts.max_age,
            age_buckets: opts.age_buckets,
            map: DashMap::new(),
        })
    }

    /// Snapshot of the series matching `labels` exactly, if it has been observed.
    pub fn series(&self, labels: &LabelSet) -> Option<SummarySnapshot> {
        let key = self.schema.key_for(&self.name, labels).ok()?;
        self.map.get(&key).map(|s| self.snapshot_of(&key, s.value()))
    }

    /// Snapshots of every observed series.
    pub fn snapshots(&self) -> Vec<SummarySnapshot> {
        self.map
            .iter()
            .map(|r| self.snapshot_of(r.key(), r.value()))
            .collect()
    }

    fn snapshot_of(&self, key: &[String], series: &Mutex<SummarySeries>) -> SummarySnapshot {
        let mut s = series.lock();
        SummarySnapshot {
            labels: self.schema.label_set(key),
            count: s.count,
            sum: s.sum,
            quantiles: self
                .quantiles
                .iter()
                .map(|&q| QuantileValue { quantile: q, value: s.window.quantile(q) })
                .collect(),
        }
    }
}

impl ObservationSink for SummaryVec {
    fn observe(&self, labels: &LabelSet, value: f64) -> Result<()> {
        let key = self.schema.key_for(&self.name, labels)?;
        if let Some(series) = self.map.get(&key) {
            return series.lock().record(value);
        }
        let series = self.map.entry(key).or_try_insert_with(|| {
            Ok::<_, ReqLensError>(Mutex::new(SummarySeries {
                window: TimeWindowQuantiles::new(self.max_age, self.age_buckets)?,
                count: 0,
                sum: 0.0,
            }))
        })?;
        let mut s = series.lock();
        s.record(value)
    }
}

impl Collector for SummaryVec {
    fn name(&self) -> &str {
        &self.name
    }

    /// Render in Prometheus text exposition format (unit: seconds).
    fn render(&self, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", self.name, self.help);
        let _ = writeln!(out, "# TYPE {} summary", self.name);
        for r in self.map.iter() {
            let snap = self.snapshot_of(r.key(), r.value());
            let label_str = self.schema.render_pairs(r.key());
            let prefix = if label_str.is_empty() {
                String::new()
            } else {
                format!("{},", label_str)
            };

            for q in &snap.quantiles {
                let v = q.value.map_or_else(|| "NaN".to_string(), |v| v.to_string());
                let _ = writeln!(
                    out,
                    "{}{{{}quantile=\"{}\"}} {}",
                    self.name, prefix, q.quantile, v
                );
            }
            let _ = writeln!(out, "{}_sum{{{}}} {}", self.name, label_str, snap.sum);
            let _ = writeln!(out, "{}_count{{{}}} {}", self.name, label_str, snap.count);
        }
    }

    fn snapshot(&self) -> FamilySnapshot {
        FamilySnapshot::Summary {
            name: self.name.clone(),
            help: self.help.clone(),
            series: self.snapshots(),
        }
    }
}
