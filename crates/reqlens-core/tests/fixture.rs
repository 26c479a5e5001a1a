//! Request/response doubles and recording sinks shared by lifecycle tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use reqlens_core::lifecycle::{HttpRequest, HttpResponse};
use reqlens_core::metrics::{LabelSet, ObservationSink};
use reqlens_core::{ReqLensError, Result};

#[derive(Debug, Clone)]
pub struct FakeRequest {
    pub method: String,
    pub route: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl FakeRequest {
    pub fn new(method: &str, route: &str) -> Self {
        Self { method: method.into(), route: Some(route.into()), headers: vec![] }
    }

    pub fn unmatched(method: &str) -> Self {
        Self { method: method.into(), route: None, headers: vec![] }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl HttpRequest for FakeRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn matched_route(&self) -> Option<&str> {
        self.route.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub status: u16,
}

impl FakeResponse {
    pub fn status(status: u16) -> Self {
        Self { status }
    }
}

impl HttpResponse for FakeResponse {
    fn status_code(&self) -> u16 {
        self.status
    }
}

/// Sink that stores every observation.
#[derive(Default)]
pub struct RecordingSink {
    pub observations: Mutex<Vec<(LabelSet, f64)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.observations.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<(LabelSet, f64)> {
        self.observations.lock().unwrap().clone()
    }
}

impl ObservationSink for RecordingSink {
    fn observe(&self, labels: &LabelSet, value: f64) -> Result<()> {
        self.observations.lock().unwrap().push((labels.clone(), value));
        Ok(())
    }
}

/// Sink that rejects every observation.
#[derive(Default)]
pub struct FailingSink;

impl ObservationSink for FailingSink {
    fn observe(&self, _labels: &LabelSet, _value: f64) -> Result<()> {
        Err(ReqLensError::LabelMismatch {
            metric: "failing".into(),
            detail: "rejects everything".into(),
        })
    }
}

pub fn epsilon(value: f64, expected: f64) -> f64 {
    (value - expected).abs() / expected
}
