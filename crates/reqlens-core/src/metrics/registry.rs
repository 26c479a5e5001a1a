//! Metric family registry.
//!
//! Families are registered once at startup; a second family with the same
//! name is a configuration error. The registry renders the Prometheus text
//! exposition format and JSON-serialisable snapshots.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use super::histogram::HistogramSnapshot;
use super::summary::SummarySnapshot;
use crate::error::{ReqLensError, Result};

/// Read side of a registered metric family.
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;
    fn render(&self, out: &mut String);
    fn snapshot(&self) -> FamilySnapshot;
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FamilySnapshot {
    Histogram {
        name: String,
        help: String,
        series: Vec<HistogramSnapshot>,
    },
    Summary {
        name: String,
        help: String,
        series: Vec<SummarySnapshot>,
    },
}

impl FamilySnapshot {
    pub fn name(&self) -> &str {
        match self {
            FamilySnapshot::Histogram { name, .. } | FamilySnapshot::Summary { name, .. } => name,
        }
    }
}

#[derive(Default)]
pub struct MetricsRegistry {
    families: RwLock<Vec<Arc<dyn Collector>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, family: Arc<dyn Collector>) -> Result<()> {
        let mut families = self.families.write();
        if families.iter().any(|f| f.name() == family.name()) {
            return Err(ReqLensError::DuplicateMetric(family.name().to_string()));
        }
        tracing::debug!(metric = family.name(), "metric family registered");
        families.push(family);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.families.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.read().is_empty()
    }

    /// Render all registered families in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for family in self.families.read().iter() {
            family.render(&mut out);
        }
        out
    }

    pub fn snapshot(&self) -> Vec<FamilySnapshot> {
        self.families.read().iter().map(|f| f.snapshot()).collect()
    }
}
