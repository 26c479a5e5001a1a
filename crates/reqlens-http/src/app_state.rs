//! Shared application state for the reqlens server.
//!
//! Builds the metric registry and the request instrumentation from config.
//! Every error here is a configuration defect and must stop startup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqlens_core::error::Result;
use reqlens_core::lifecycle::{Instrumentation, InstrumentationOptions};
use reqlens_core::metrics::MetricsRegistry;

use crate::config::ServerConfig;
use crate::request::{CompletedResponse, RequestSnapshot};

pub type HttpInstrumentation = Instrumentation<RequestSnapshot, CompletedResponse>;
pub type HttpOptions = InstrumentationOptions<RequestSnapshot, CompletedResponse>;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    instrumentation: Arc<HttpInstrumentation>,
}

struct AppStateInner {
    cfg: ServerConfig,
    registry: Arc<MetricsRegistry>,
    draining: AtomicBool,
}

impl AppState {
    /// Build application state from config alone.
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        let opts = options_from_config(&cfg);
        Self::with_options(cfg, opts)
    }

    /// Build application state with caller-supplied options (code-level
    /// predicates and label functions on top of what config can express).
    pub fn with_options(cfg: ServerConfig, opts: HttpOptions) -> Result<Self> {
        let registry = Arc::new(MetricsRegistry::new());
        let instrumentation = Arc::new(Instrumentation::new(opts, &registry)?);

        tracing::info!(
            families = registry.len(),
            zero_fill = cfg.metrics.zero_fill,
            custom_labels = cfg.metrics.custom_labels.len(),
            "request instrumentation ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                draining: AtomicBool::new(false),
            }),
            instrumentation,
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn instrumentation(&self) -> Arc<HttpInstrumentation> {
        Arc::clone(&self.instrumentation)
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}

/// Translate the static config into instrumentation options.
pub fn options_from_config(cfg: &ServerConfig) -> HttpOptions {
    let m = &cfg.metrics;
    let mut opts = HttpOptions::default()
        .ignore_methods(m.ignored_methods.iter().cloned())
        .ignore_routes(m.ignored_routes.iter().cloned())
        .zero_fill(m.zero_fill);
    opts.histogram = m.histogram.to_opts();
    opts.summary = m.summary.to_opts();

    if let Some(header) = m.ignore_header.clone() {
        opts = opts.ignore_when(move |req: &RequestSnapshot, res: &CompletedResponse| {
            req.header(&header) == Some("true") || res.header(&header) == Some("true")
        });
    }

    if !m.custom_labels.is_empty() {
        let sources = m.custom_labels.clone();
        let names: Vec<String> = sources.iter().map(|c| c.name.clone()).collect();
        opts = opts.custom_labels(names, move |req: &RequestSnapshot, _res: &CompletedResponse| {
            sources
                .iter()
                .map(|c| (c.name.clone(), req.header(&c.header).unwrap_or_default().to_string()))
                .collect::<HashMap<_, _>>()
        });
    }

    opts
}
