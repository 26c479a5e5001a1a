use std::time::Duration;

use serde::Deserialize;

use reqlens_core::error::{ReqLensError, Result};
use reqlens_core::lifecycle::DEFAULT_IGNORED_METHODS;
use reqlens_core::metrics::histogram::DEFAULT_BUCKETS;
use reqlens_core::metrics::summary::{DEFAULT_AGE_BUCKETS, DEFAULT_QUANTILES};
use reqlens_core::metrics::{HistogramOpts, SummaryOpts};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ReqLensError::UnsupportedVersion);
        }

        self.server.validate()?;
        self.metrics.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// How often abandoned request timers are swept.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Age after which an armed timer is considered abandoned.
    #[serde(default = "default_timer_ttl_ms")]
    pub timer_ttl_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            sweep_interval_ms: default_sweep_interval_ms(),
            timer_ttl_ms: default_timer_ttl_ms(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=600_000).contains(&self.sweep_interval_ms) {
            return Err(ReqLensError::InvalidConfig(
                "server.sweep_interval_ms must be between 100 and 600000".into(),
            ));
        }
        if self.timer_ttl_ms <= self.sweep_interval_ms {
            return Err(ReqLensError::InvalidConfig(
                "server.timer_ttl_ms must be greater than sweep_interval_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn timer_ttl(&self) -> Duration {
        Duration::from_millis(self.timer_ttl_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_sweep_interval_ms() -> u64 {
    30_000
}
fn default_timer_ttl_ms() -> u64 {
    300_000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_ignored_methods")]
    pub ignored_methods: Vec<String>,

    #[serde(default)]
    pub ignored_routes: Vec<String>,

    /// Discard a measured request when this header is `"true"` on the
    /// request or the response.
    #[serde(default)]
    pub ignore_header: Option<String>,

    #[serde(default)]
    pub custom_labels: Vec<CustomLabel>,

    #[serde(default)]
    pub zero_fill: bool,

    #[serde(default)]
    pub histogram: HistogramSection,

    #[serde(default)]
    pub summary: SummarySection,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            ignored_methods: default_ignored_methods(),
            ignored_routes: Vec::new(),
            ignore_header: None,
            custom_labels: Vec::new(),
            zero_fill: false,
            histogram: HistogramSection::default(),
            summary: SummarySection::default(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if let Some(h) = &self.ignore_header {
            if h.trim().is_empty() {
                return Err(ReqLensError::InvalidConfig(
                    "metrics.ignore_header must not be empty".into(),
                ));
            }
        }
        for c in &self.custom_labels {
            if c.header.trim().is_empty() {
                return Err(ReqLensError::InvalidConfig(format!(
                    "metrics.custom_labels[{}].header must not be empty",
                    c.name
                )));
            }
        }
        self.histogram.to_opts().validate()?;
        self.summary.to_opts().validate()?;
        Ok(())
    }
}

fn default_ignored_methods() -> Vec<String> {
    DEFAULT_IGNORED_METHODS.iter().map(|m| m.to_string()).collect()
}

/// Custom label whose value is read from a request header (`""` when absent).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomLabel {
    pub name: String,
    pub header: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistogramSection {
    #[serde(default = "default_histogram_name")]
    pub name: String,
    #[serde(default = "default_histogram_help")]
    pub help: String,
    #[serde(default = "default_buckets")]
    pub buckets: Vec<f64>,
}

impl Default for HistogramSection {
    fn default() -> Self {
        Self {
            name: default_histogram_name(),
            help: default_histogram_help(),
            buckets: default_buckets(),
        }
    }
}

impl HistogramSection {
    pub fn to_opts(&self) -> HistogramOpts {
        HistogramOpts {
            name: self.name.clone(),
            help: self.help.clone(),
            buckets: self.buckets.clone(),
        }
    }
}

fn default_histogram_name() -> String {
    HistogramOpts::default().name
}
fn default_histogram_help() -> String {
    HistogramOpts::default().help
}
fn default_buckets() -> Vec<f64> {
    DEFAULT_BUCKETS.to_vec()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummarySection {
    #[serde(default = "default_summary_name")]
    pub name: String,
    #[serde(default = "default_summary_help")]
    pub help: String,
    #[serde(default = "default_quantiles")]
    pub quantiles: Vec<f64>,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    #[serde(default = "default_age_buckets")]
    pub age_buckets: u32,
}

impl Default for SummarySection {
    fn default() -> Self {
        Self {
            name: default_summary_name(),
            help: default_summary_help(),
            quantiles: default_quantiles(),
            max_age_secs: default_max_age_secs(),
            age_buckets: default_age_buckets(),
        }
    }
}

impl SummarySection {
    pub fn to_opts(&self) -> SummaryOpts {
        SummaryOpts {
            name: self.name.clone(),
            help: self.help.clone(),
            quantiles: self.quantiles.clone(),
            max_age: Duration::from_secs(self.max_age_secs),
            age_buckets: self.age_buckets,
        }
    }
}

fn default_summary_name() -> String {
    SummaryOpts::default().name
}
fn default_summary_help() -> String {
    SummaryOpts::default().help
}
fn default_quantiles() -> Vec<f64> {
    DEFAULT_QUANTILES.to_vec()
}
fn default_max_age_secs() -> u64 {
    600
}
fn default_age_buckets() -> u32 {
    DEFAULT_AGE_BUCKETS
}
