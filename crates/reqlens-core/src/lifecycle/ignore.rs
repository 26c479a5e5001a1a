//! Ignore policy: which requests are never measured.
//!
//! Two evaluation points with different information:
//! - arrival: method and matched route only; an ignored request never gets a timer.
//! - completion: full request/response through a caller predicate; a `true`
//!   discards the elapsed time of an already armed request.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Methods without meaningful response-body latency: existence checks,
/// option discovery, diagnostic tracing and tunnel establishment.
pub const DEFAULT_IGNORED_METHODS: [&str; 4] = ["HEAD", "OPTIONS", "TRACE", "CONNECT"];

/// Outcome-dependent ignore predicate, evaluated once per armed request.
pub type IgnoreFn<Req, Res> = Arc<dyn Fn(&Req, &Res) -> bool + Send + Sync>;

/// Compiled ignore configuration. Immutable after construction.
pub struct IgnorePolicy<Req, Res> {
    methods: HashSet<String>,
    routes: HashSet<String>,
    dynamic: Option<IgnoreFn<Req, Res>>,
}

impl<Req, Res> IgnorePolicy<Req, Res> {
    pub fn new<M, R>(methods: M, routes: R, dynamic: Option<IgnoreFn<Req, Res>>) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            methods: methods.into_iter().map(Into::into).collect(),
            routes: routes.into_iter().map(Into::into).collect(),
            dynamic,
        }
    }

    /// Static check. Side-effect free; HTTP methods compare case-sensitively.
    pub fn should_ignore_at_arrival(&self, method: &str, route: &str) -> bool {
        self.methods.contains(method) || self.routes.contains(route)
    }

    /// Dynamic check, only reached for requests that were armed.
    pub fn should_ignore_at_completion(&self, req: &Req, res: &Res) -> bool {
        match &self.dynamic {
            Some(pred) => pred(req, res),
            None => false,
        }
    }
}

impl<Req, Res> Default for IgnorePolicy<Req, Res> {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORED_METHODS, Vec::<String>::new(), None)
    }
}

impl<Req, Res> fmt::Debug for IgnorePolicy<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnorePolicy")
            .field("methods", &self.methods)
            .field("routes", &self.routes)
            .field("dynamic", &self.dynamic.is_some())
            .finish()
    }
}
