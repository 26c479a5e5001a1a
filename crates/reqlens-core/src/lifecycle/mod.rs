//! Request-lifecycle timing.
//!
//! Arrival: static ignore check, then a timer is armed for the request.
//! Completion: the timer is removed, the dynamic ignore check runs, labels
//! are resolved and one observation is committed to each sink.
//!
//! The host framework is seen only through [`HttpRequest`] / [`HttpResponse`]
//! and two callbacks on [`Instrumentation`].

pub mod ignore;
pub mod instrument;
pub mod labels;
pub mod sink;
pub mod timers;

pub use ignore::{IgnoreFn, IgnorePolicy, DEFAULT_IGNORED_METHODS};
pub use instrument::{Instrumentation, InstrumentationOptions, Outcome};
pub use labels::{CustomLabelsFn, LabelResolver, FIXED_LABELS};
pub use sink::{CommitOutcome, MetricSinkAdapter, SinkPair};
pub use timers::{TimerEntry, TimerRegistry};

/// Route label used when the framework matched no route.
pub const UNKNOWN_ROUTE: &str = "unknown";

/// Identity of one in-flight request. Allocated by
/// [`Instrumentation::next_request_id`]; never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// What the core needs to know about a request.
pub trait HttpRequest {
    fn method(&self) -> &str;

    /// Matched route pattern (e.g. `/users/:id`), not the raw path.
    fn matched_route(&self) -> Option<&str>;

    fn route(&self) -> &str {
        self.matched_route().unwrap_or(UNKNOWN_ROUTE)
    }
}

/// What the core needs to know about a finalized response.
pub trait HttpResponse {
    fn status_code(&self) -> u16;
}
