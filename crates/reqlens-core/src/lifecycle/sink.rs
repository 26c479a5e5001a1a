//! Fan-out of one elapsed value to the distribution and histogram sinks.

use std::sync::Arc;

use crate::error::{ReqLensError, Result};
use crate::metrics::{LabelSet, ObservationSink};

/// The two sinks sharing one label schema.
#[derive(Clone)]
pub struct SinkPair {
    pub distribution: Arc<dyn ObservationSink>,
    pub histogram: Arc<dyn ObservationSink>,
}

/// Per-sink result of one commit. Both commits are always attempted.
#[derive(Debug)]
pub struct CommitOutcome {
    pub distribution: Result<()>,
    pub histogram: Result<()>,
}

impl CommitOutcome {
    pub fn is_complete(&self) -> bool {
        self.distribution.is_ok() && self.histogram.is_ok()
    }

    pub fn into_errors(self) -> impl Iterator<Item = ReqLensError> {
        [self.distribution.err(), self.histogram.err()].into_iter().flatten()
    }
}

pub struct MetricSinkAdapter {
    sinks: SinkPair,
}

impl MetricSinkAdapter {
    pub fn new(sinks: SinkPair) -> Self {
        Self { sinks }
    }

    pub fn observe(&self, labels: &LabelSet, elapsed_secs: f64) -> CommitOutcome {
        CommitOutcome {
            distribution: self.sinks.distribution.observe(labels, elapsed_secs),
            histogram: self.sinks.histogram.observe(labels, elapsed_secs),
        }
    }

    /// One zero-duration observation per sink so scrapers see populated
    /// series before any traffic. Startup-only; failures abort startup.
    pub fn zero_fill(&self, labels: &LabelSet) -> Result<()> {
        self.observe(labels, 0.0)
            .into_errors()
            .next()
            .map_or(Ok(()), Err)
    }
}
