//! Label resolution for committed observations.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::metrics::{LabelSchema, LabelSet};

use super::{HttpRequest, HttpResponse};

/// Labels every observation carries, in exposition order.
pub const FIXED_LABELS: [&str; 3] = ["method", "route", "status_code"];

/// Caller-supplied custom label values. Runs once per committed observation,
/// never for discarded requests.
pub type CustomLabelsFn<Req, Res> =
    Arc<dyn Fn(&Req, &Res) -> HashMap<String, String> + Send + Sync>;

pub struct LabelResolver<Req, Res> {
    schema: LabelSchema,
    custom: Option<CustomLabelsFn<Req, Res>>,
}

impl<Req, Res> LabelResolver<Req, Res> {
    /// Fix the label schema: the fixed labels followed by `custom_names`,
    /// deduplicated in declaration order. Malformed names fail here, at
    /// configuration time.
    pub fn new<I, S>(custom_names: I, custom: Option<CustomLabelsFn<Req, Res>>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = FIXED_LABELS.iter().map(|n| n.to_string()).collect();
        for name in custom_names {
            let name = name.into();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(Self {
            schema: LabelSchema::new(names)?,
            custom,
        })
    }

    pub fn schema(&self) -> &LabelSchema {
        &self.schema
    }

    /// Every schema name with an empty value.
    fn blank(&self) -> LabelSet {
        self.schema.names().iter().map(|n| (n.as_str(), "")).collect()
    }

    /// Harmless placeholder labels for the startup zero-fill observation.
    pub fn zero_fill_labels(&self) -> LabelSet {
        let mut labels = self.blank();
        labels.insert("method", "GET");
        labels.insert("route", "");
        labels.insert("status_code", "404");
        labels
    }
}

impl<Req: HttpRequest, Res: HttpResponse> LabelResolver<Req, Res> {
    /// Fixed fields first, then custom values, which may override them.
    pub fn resolve(&self, req: &Req, res: &Res) -> LabelSet {
        let mut labels = self.blank();
        labels.insert("method", req.method());
        labels.insert("route", req.route());
        labels.insert("status_code", res.status_code().to_string());

        if let Some(custom) = &self.custom {
            for (name, value) in custom(req, res) {
                labels.insert(name, value);
            }
        }
        labels
    }
}
