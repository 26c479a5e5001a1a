//! In-process metric sinks for request latency.
//!
//! Two engines share one label model: [`HistogramVec`] (cumulative fixed
//! buckets, Prometheus histogram) and [`SummaryVec`] (sliding-window
//! quantiles, Prometheus summary). Series are keyed by label values in schema
//! order and stored in `DashMap`s so concurrent commits from many requests
//! only contend per shard.

pub mod histogram;
pub mod labels;
pub mod registry;
pub mod summary;

pub use histogram::{BucketCount, HistogramOpts, HistogramSnapshot, HistogramVec};
pub use labels::{LabelSchema, LabelSet};
pub use registry::{Collector, FamilySnapshot, MetricsRegistry};
pub use summary::{QuantileValue, SummaryOpts, SummarySnapshot, SummaryVec};

use crate::error::Result;

/// Write side of a metric sink: one elapsed-duration sample under a label set.
///
/// Fails only when `labels` doesn't fit the sink's registered schema.
pub trait ObservationSink: Send + Sync {
    /// Commit one observation (seconds).
    fn observe(&self, labels: &LabelSet, value: f64) -> Result<()>;
}
