//! Histogram and summary engines, registry exposition.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use reqlens_core::metrics::{
    HistogramOpts, HistogramVec, LabelSchema, LabelSet, MetricsRegistry, ObservationSink,
    SummaryOpts, SummaryVec,
};

mod fixture;
use fixture::epsilon;

fn schema() -> LabelSchema {
    LabelSchema::new(["method", "route", "status_code"]).unwrap()
}

fn get_ok() -> LabelSet {
    [("method", "GET"), ("route", "/dynamic_delay"), ("status_code", "200")]
        .into_iter()
        .collect()
}

const SAMPLES: [f64; 3] = [0.501, 1.001, 2.001];

#[test]
fn histogram_buckets_count_samples_below_bound() {
    let hist = HistogramVec::new(HistogramOpts::default(), schema()).unwrap();
    for v in SAMPLES {
        hist.observe(&get_ok(), v).unwrap();
    }

    let snap = hist.series(&get_ok()).expect("series exists");
    assert_eq!(snap.count, 3);
    assert!(epsilon(snap.sum, SAMPLES.iter().sum()) < 1e-9);

    for b in &snap.buckets {
        let expected = SAMPLES.iter().filter(|m| **m < b.le).count() as u64;
        assert_eq!(b.count, expected, "le {}", b.le);
    }
    assert_eq!(snap.buckets.len(), hist.bounds().len());
}

#[test]
fn histogram_rejects_bad_buckets() {
    for buckets in [vec![], vec![1.0, 0.5], vec![0.1, f64::INFINITY], vec![-1.0, 1.0]] {
        let opts = HistogramOpts { buckets: buckets.clone(), ..HistogramOpts::default() };
        let err = HistogramVec::new(opts, schema()).err().expect("must fail");
        assert_eq!(err.code().as_str(), "INVALID_CONFIG", "buckets={buckets:?}");
    }
}

#[test]
fn histogram_rejects_le_label() {
    let err = HistogramVec::new(HistogramOpts::default(), LabelSchema::new(["le"]).unwrap())
        .err()
        .expect("must fail");
    assert_eq!(err.code().as_str(), "INVALID_LABEL_NAME");
}

#[test]
fn summary_quantiles_track_order_statistics() {
    let summary = SummaryVec::new(SummaryOpts::default(), schema()).unwrap();
    for v in SAMPLES {
        summary.observe(&get_ok(), v).unwrap();
    }

    let snap = summary.series(&get_ok()).expect("series exists");
    assert_eq!(snap.count, 3);

    let expected = [
        (0.01, SAMPLES[0]),
        (0.05, SAMPLES[0]),
        (0.5, SAMPLES[1]),
        (0.9, SAMPLES[2]),
        (0.95, SAMPLES[2]),
        (0.99, SAMPLES[2]),
        (0.999, SAMPLES[2]),
    ];
    for (q, want) in expected {
        let got = snap.quantile(q).expect("quantile present");
        assert!(epsilon(got, want) < 0.05, "q={q}: expected {want}, got {got}");
    }
}

#[test]
fn summary_window_expires_old_samples() {
    let opts = SummaryOpts {
        max_age: Duration::from_millis(100),
        age_buckets: 2,
        ..SummaryOpts::default()
    };
    let summary = SummaryVec::new(opts, schema()).unwrap();
    summary.observe(&get_ok(), 1.0).unwrap();
    assert!(summary.series(&get_ok()).unwrap().quantile(0.5).is_some());

    std::thread::sleep(Duration::from_millis(250));
    let snap = summary.series(&get_ok()).unwrap();
    assert_eq!(snap.quantile(0.5), None);
    assert_eq!(snap.count, 1, "count stays cumulative");
}

#[test]
fn summary_rejects_bad_quantiles() {
    for q in [0.0, 1.0, 1.5, -0.1] {
        let opts = SummaryOpts { quantiles: vec![q], ..SummaryOpts::default() };
        let err = SummaryVec::new(opts, schema()).err().expect("must fail");
        assert_eq!(err.code().as_str(), "INVALID_CONFIG", "q={q}");
    }
}

#[test]
fn summary_rejects_oversized_or_degenerate_windows() {
    let cases = [
        (Duration::from_secs(600), 0),
        (Duration::from_secs(600), 61),
        (Duration::from_secs(600), 4_000_000_000),
        (Duration::from_micros(500), 2),
    ];
    for (max_age, age_buckets) in cases {
        let opts = SummaryOpts { max_age, age_buckets, ..SummaryOpts::default() };
        let err = SummaryVec::new(opts, schema()).err().expect("must fail");
        assert_eq!(err.code().as_str(), "INVALID_CONFIG", "{max_age:?}/{age_buckets}");
    }

    let opts = SummaryOpts { age_buckets: 60, ..SummaryOpts::default() };
    assert!(SummaryVec::new(opts, schema()).is_ok());
}

#[test]
fn repeated_observations_share_one_series() {
    let hist = HistogramVec::new(HistogramOpts::default(), schema()).unwrap();
    let summary = SummaryVec::new(SummaryOpts::default(), schema()).unwrap();
    for _ in 0..10 {
        hist.observe(&get_ok(), 0.2).unwrap();
        summary.observe(&get_ok(), 0.2).unwrap();
    }
    assert_eq!(hist.snapshots().len(), 1);
    assert_eq!(hist.series(&get_ok()).unwrap().count, 10);
    assert_eq!(summary.snapshots().len(), 1);
    assert_eq!(summary.series(&get_ok()).unwrap().count, 10);
}

#[test]
fn unknown_label_is_a_mismatch() {
    let hist = HistogramVec::new(HistogramOpts::default(), schema()).unwrap();
    let mut labels = get_ok();
    labels.insert("tenant", "acme");
    let err = hist.observe(&labels, 0.1).err().expect("must fail");
    assert_eq!(err.code().as_str(), "LABEL_MISMATCH");
    assert!(hist.snapshots().is_empty());
}

#[test]
fn missing_label_defaults_to_empty() {
    let hist = HistogramVec::new(HistogramOpts::default(), schema()).unwrap();
    let partial: LabelSet = [("method", "GET")].into_iter().collect();
    hist.observe(&partial, 0.1).unwrap();

    let snaps = hist.snapshots();
    assert_eq!(snaps.len(), 1);
    assert_eq!(snaps[0].labels.get("route"), Some(""));
}

#[test]
fn registry_rejects_duplicates_and_bad_names() {
    let registry = MetricsRegistry::new();
    let a = Arc::new(HistogramVec::new(HistogramOpts::default(), schema()).unwrap());
    let b = Arc::new(HistogramVec::new(HistogramOpts::default(), schema()).unwrap());
    registry.register(a).unwrap();
    let err = registry.register(b).err().expect("must fail");
    assert_eq!(err.code().as_str(), "DUPLICATE_METRIC");
    assert_eq!(registry.len(), 1);

    let bad = HistogramOpts { name: "http-duration".into(), ..HistogramOpts::default() };
    let err = HistogramVec::new(bad, schema()).err().expect("must fail");
    assert_eq!(err.code().as_str(), "INVALID_METRIC_NAME");
}

#[test]
fn registry_renders_text_exposition() {
    let registry = MetricsRegistry::new();
    let hist = Arc::new(
        HistogramVec::new(
            HistogramOpts { buckets: vec![0.5, 1.0], ..HistogramOpts::default() },
            schema(),
        )
        .unwrap(),
    );
    let summary = Arc::new(
        SummaryVec::new(SummaryOpts { quantiles: vec![0.5], ..SummaryOpts::default() }, schema())
            .unwrap(),
    );
    registry.register(summary.clone()).unwrap();
    registry.register(hist.clone()).unwrap();

    hist.observe(&get_ok(), 0.75).unwrap();
    summary.observe(&get_ok(), 0.75).unwrap();

    let text = registry.render();
    let labels = r#"method="GET",route="/dynamic_delay",status_code="200""#;
    assert!(text.contains("# TYPE http_request_duration_seconds histogram"));
    assert!(text
        .contains("# HELP http_request_summary_seconds request duration in seconds summary"));
    assert!(text.contains(&format!(
        "http_request_duration_seconds_bucket{{{labels},le=\"0.5\"}} 0"
    )));
    assert!(text.contains(&format!("http_request_duration_seconds_bucket{{{labels},le=\"1\"}} 1")));
    assert!(text.contains(&format!(
        "http_request_duration_seconds_bucket{{{labels},le=\"+Inf\"}} 1"
    )));
    assert!(text.contains(&format!("http_request_duration_seconds_count{{{labels}}} 1")));
    assert!(text.contains(&format!("http_request_summary_seconds{{{labels},quantile=\"0.5\"}}")));
    assert!(text.contains(&format!("http_request_summary_seconds_count{{{labels}}} 1")));
}

#[test]
fn label_values_are_escaped() {
    let registry = MetricsRegistry::new();
    let schema = LabelSchema::new(["route"]).unwrap();
    let hist = Arc::new(HistogramVec::new(HistogramOpts::default(), schema).unwrap());
    registry.register(hist.clone()).unwrap();
    let labels: LabelSet = [("route", "a\"b\\c")].into_iter().collect();
    hist.observe(&labels, 0.1).unwrap();

    assert!(registry.render().contains(r#"route="a\"b\\c""#));
}

#[test]
fn snapshots_serialize_to_json() {
    let registry = MetricsRegistry::new();
    let hist = Arc::new(HistogramVec::new(HistogramOpts::default(), schema()).unwrap());
    registry.register(hist.clone()).unwrap();
    hist.observe(&get_ok(), 0.2).unwrap();

    let json = serde_json::to_value(registry.snapshot()).unwrap();
    assert_eq!(json[0]["type"], "histogram");
    assert_eq!(json[0]["name"], "http_request_duration_seconds");
    assert_eq!(json[0]["series"][0]["labels"]["method"], "GET");
    assert_eq!(json[0]["series"][0]["count"], 1);
}
