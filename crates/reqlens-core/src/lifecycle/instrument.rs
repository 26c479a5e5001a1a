//! Request instrumentation: the arrival/completion state machine.
//!
//! ```text
//! Unseen --arrival, not ignored--> Armed --completion--> Measured
//!    |                               |
//!    +--arrival, ignored--> (no timer) +--dynamic ignore--> Discarded
//! ```
//!
//! A completion with no armed timer (ignored at arrival, short-circuited
//! before the arrival hook, or already swept) is a silent no-op.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::metrics::{HistogramOpts, HistogramVec, MetricsRegistry, SummaryOpts, SummaryVec};

use super::ignore::{IgnoreFn, IgnorePolicy, DEFAULT_IGNORED_METHODS};
use super::labels::{CustomLabelsFn, LabelResolver};
use super::sink::{MetricSinkAdapter, SinkPair};
use super::timers::TimerRegistry;
use super::{HttpRequest, HttpResponse, RequestId};

/// Terminal state of one completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Both sinks accepted the observation.
    Measured,
    /// Armed, then discarded by the dynamic ignore predicate.
    IgnoredAtCompletion,
    /// No timer existed for this request.
    NotArmed,
    /// Armed and resolved, but at least one sink rejected the labels.
    SinkRejected,
}

/// Configuration surface of [`Instrumentation`].
pub struct InstrumentationOptions<Req, Res> {
    pub ignored_methods: Vec<String>,
    pub ignored_routes: Vec<String>,
    pub ignore: Option<IgnoreFn<Req, Res>>,
    pub custom_label_names: Vec<String>,
    pub custom_labels: Option<CustomLabelsFn<Req, Res>>,
    pub zero_fill: bool,
    pub histogram: HistogramOpts,
    pub summary: SummaryOpts,
}

impl<Req, Res> Default for InstrumentationOptions<Req, Res> {
    fn default() -> Self {
        Self {
            ignored_methods: DEFAULT_IGNORED_METHODS.iter().map(|m| m.to_string()).collect(),
            ignored_routes: Vec::new(),
            ignore: None,
            custom_label_names: Vec::new(),
            custom_labels: None,
            zero_fill: false,
            histogram: HistogramOpts::default(),
            summary: SummaryOpts::default(),
        }
    }
}

impl<Req, Res> InstrumentationOptions<Req, Res> {
    pub fn ignore_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_routes = routes.into_iter().map(Into::into).collect();
        self
    }

    pub fn ignore_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn ignore_when<F>(mut self, pred: F) -> Self
    where
        F: Fn(&Req, &Res) -> bool + Send + Sync + 'static,
    {
        self.ignore = Some(Arc::new(pred));
        self
    }

    pub fn custom_labels<I, S, F>(mut self, names: I, values: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Req, &Res) -> std::collections::HashMap<String, String> + Send + Sync + 'static,
    {
        self.custom_label_names = names.into_iter().map(Into::into).collect();
        self.custom_labels = Some(Arc::new(values));
        self
    }

    pub fn zero_fill(mut self, enabled: bool) -> Self {
        self.zero_fill = enabled;
        self
    }
}

pub struct Instrumentation<Req, Res> {
    policy: IgnorePolicy<Req, Res>,
    resolver: LabelResolver<Req, Res>,
    timers: TimerRegistry,
    sinks: MetricSinkAdapter,
    next_id: AtomicU64,
}

impl<Req: HttpRequest, Res: HttpResponse> Instrumentation<Req, Res> {
    /// Build both sinks, register them in `registry` and run the optional
    /// zero-fill. Any error here is a configuration defect: callers must not
    /// start serving.
    pub fn new(opts: InstrumentationOptions<Req, Res>, registry: &MetricsRegistry) -> Result<Self> {
        let resolver = LabelResolver::new(opts.custom_label_names, opts.custom_labels)?;

        let summary = Arc::new(SummaryVec::new(opts.summary, resolver.schema().clone())?);
        let histogram = Arc::new(HistogramVec::new(opts.histogram, resolver.schema().clone())?);
        registry.register(summary.clone())?;
        registry.register(histogram.clone())?;

        let policy = IgnorePolicy::new(opts.ignored_methods, opts.ignored_routes, opts.ignore);
        let sinks = SinkPair { distribution: summary, histogram };
        Self::from_parts(policy, resolver, sinks, opts.zero_fill)
    }

    /// Assemble from prebuilt components (custom sinks).
    pub fn from_parts(
        policy: IgnorePolicy<Req, Res>,
        resolver: LabelResolver<Req, Res>,
        sinks: SinkPair,
        zero_fill: bool,
    ) -> Result<Self> {
        let sinks = MetricSinkAdapter::new(sinks);
        if zero_fill {
            sinks.zero_fill(&resolver.zero_fill_labels())?;
        }
        Ok(Self {
            policy,
            resolver,
            timers: TimerRegistry::new(),
            sinks,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn next_request_id(&self) -> RequestId {
        RequestId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Arrival callback. Returns whether a timer was armed.
    pub fn on_request(&self, id: RequestId, req: &Req) -> bool {
        if self.policy.should_ignore_at_arrival(req.method(), req.route()) {
            tracing::trace!(
                request_id = id.get(),
                method = req.method(),
                route = req.route(),
                "request ignored at arrival"
            );
            return false;
        }
        self.timers.start(id);
        true
    }

    /// Completion callback. The timer is removed before anything else runs,
    /// so no later step can leak it.
    pub fn on_response(&self, id: RequestId, req: &Req, res: &Res) -> Outcome {
        let Some(timer) = self.timers.stop(id) else {
            return Outcome::NotArmed;
        };
        let elapsed = timer.elapsed_secs();

        if self.policy.should_ignore_at_completion(req, res) {
            tracing::debug!(request_id = id.get(), "request ignored at completion");
            return Outcome::IgnoredAtCompletion;
        }

        let labels = self.resolver.resolve(req, res);
        let commit = self.sinks.observe(&labels, elapsed);
        if commit.is_complete() {
            tracing::debug!(request_id = id.get(), elapsed, "request measured");
            return Outcome::Measured;
        }

        for err in commit.into_errors() {
            tracing::warn!(
                request_id = id.get(),
                code = err.code().as_str(),
                error = %err,
                "observation rejected by sink"
            );
        }
        Outcome::SinkRejected
    }

    /// Drop the timer of a request that will never complete (e.g. its
    /// handler future was cancelled). Returns whether one was armed.
    pub fn abandon(&self, id: RequestId) -> bool {
        self.timers.stop(id).is_some()
    }

    /// Evict timers of requests in flight for longer than `ttl`.
    pub fn sweep_abandoned(&self, ttl: Duration) -> usize {
        self.timers.sweep(ttl)
    }

    /// Number of armed, not yet completed requests.
    pub fn in_flight(&self) -> usize {
        self.timers.len()
    }
}
