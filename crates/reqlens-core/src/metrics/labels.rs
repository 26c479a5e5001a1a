//! Label schema and label sets.
//!
//! A [`LabelSchema`] is fixed when a metric family is constructed; every
//! committed [`LabelSet`] is projected onto it to build the series key.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{ReqLensError, Result};

/// Helper to escape label values.
pub(crate) fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub(crate) fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    };
    if !ok {
        return Err(ReqLensError::InvalidMetricName(name.to_string()));
    }
    Ok(())
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, and not `__`-prefixed.
fn validate_label_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !ok || name.starts_with("__") {
        return Err(ReqLensError::InvalidLabelName(name.to_string()));
    }
    Ok(())
}

/// Ordered label names of one metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSchema {
    names: Vec<String>,
}

impl LabelSchema {
    /// Validate and fix the label names. Duplicates are rejected.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            validate_label_name(&name)?;
            if out.contains(&name) {
                return Err(ReqLensError::InvalidLabelName(format!("{name} (declared twice)")));
            }
            out.push(name);
        }
        Ok(Self { names: out })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Sinks reserve some names for their own exposition (`le`, `quantile`).
    pub(crate) fn reject_reserved(&self, reserved: &str) -> Result<()> {
        if self.contains(reserved) {
            return Err(ReqLensError::InvalidLabelName(format!("{reserved} (reserved)")));
        }
        Ok(())
    }

    /// Project `labels` onto this schema: values in schema order, missing
    /// names default to `""`. A label the schema doesn't declare is a mismatch.
    pub(crate) fn key_for(&self, metric: &str, labels: &LabelSet) -> Result<Vec<String>> {
        if let Some((name, _)) = labels.iter().find(|(name, _)| !self.contains(name)) {
            return Err(ReqLensError::LabelMismatch {
                metric: metric.to_string(),
                detail: format!("label {name} is not part of the registered label set"),
            });
        }
        Ok(self
            .names
            .iter()
            .map(|n| labels.get(n).unwrap_or_default().to_string())
            .collect())
    }

    /// Rebuild a label set from a series key.
    pub(crate) fn label_set(&self, key: &[String]) -> LabelSet {
        let mut set = LabelSet::new();
        for (name, value) in self.names.iter().zip(key) {
            set.insert(name.as_str(), value.as_str());
        }
        set
    }

    /// `k1="v1",k2="v2"` for the exposition format.
    pub(crate) fn render_pairs(&self, key: &[String]) -> String {
        self.names
            .iter()
            .zip(key)
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Ordered name/value pairs of one observation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    pairs: Vec<(String, String)>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.pairs.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = LabelSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl Serialize for LabelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (k, v) in &self.pairs {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
