//! Ignore policy and label resolution.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;

use reqlens_core::lifecycle::{HttpRequest, IgnorePolicy, LabelResolver, UNKNOWN_ROUTE};

mod fixture;
use fixture::{FakeRequest, FakeResponse};

type Policy = IgnorePolicy<FakeRequest, FakeResponse>;
type Resolver = LabelResolver<FakeRequest, FakeResponse>;

#[test]
fn default_policy_ignores_bodyless_methods() {
    let policy = Policy::default();
    for m in ["HEAD", "OPTIONS", "TRACE", "CONNECT"] {
        assert!(policy.should_ignore_at_arrival(m, "/users"), "method={m}");
    }
    for m in ["GET", "POST", "PUT", "DELETE", "PATCH"] {
        assert!(!policy.should_ignore_at_arrival(m, "/users"), "method={m}");
    }
}

#[test]
fn method_match_is_case_sensitive() {
    let policy = Policy::default();
    assert!(!policy.should_ignore_at_arrival("head", "/users"));
}

#[test]
fn ignored_routes_match_route_pattern() {
    let policy = Policy::new(Vec::<String>::new(), ["/healthz", UNKNOWN_ROUTE], None);
    assert!(policy.should_ignore_at_arrival("GET", "/healthz"));
    assert!(policy.should_ignore_at_arrival("GET", "unknown"));
    assert!(!policy.should_ignore_at_arrival("GET", "/healthz/deep"));
}

#[test]
fn arrival_check_is_repeatable() {
    let policy = Policy::new(["HEAD"], ["/2s"], None);
    for _ in 0..3 {
        assert!(policy.should_ignore_at_arrival("GET", "/2s"));
        assert!(!policy.should_ignore_at_arrival("GET", "/1s"));
    }
}

#[test]
fn dynamic_predicate_sees_request_and_response() {
    let policy = Policy::new(
        Vec::<String>::new(),
        Vec::<String>::new(),
        Some(Arc::new(|req: &FakeRequest, res: &FakeResponse| {
            req.header("x-ignore") == Some("true") || res.status == 418
        })),
    );

    let plain = FakeRequest::new("GET", "/");
    let marked = FakeRequest::new("GET", "/").with_header("x-ignore", "true");

    assert!(!policy.should_ignore_at_completion(&plain, &FakeResponse::status(200)));
    assert!(policy.should_ignore_at_completion(&marked, &FakeResponse::status(200)));
    assert!(policy.should_ignore_at_completion(&plain, &FakeResponse::status(418)));
}

#[test]
fn no_dynamic_predicate_never_ignores() {
    let policy = Policy::default();
    let req = FakeRequest::new("GET", "/");
    assert!(!policy.should_ignore_at_completion(&req, &FakeResponse::status(500)));
}

#[test]
fn unmatched_route_uses_sentinel() {
    let req = FakeRequest::unmatched("GET");
    assert_eq!(req.route(), "unknown");
}

#[test]
fn resolves_fixed_labels() {
    let resolver = Resolver::new(Vec::<String>::new(), None).unwrap();
    let labels = resolver.resolve(
        &FakeRequest::new("POST", "/users/:id"),
        &FakeResponse::status(201),
    );

    let pairs: Vec<_> = labels.iter().collect();
    assert_eq!(
        pairs,
        vec![("method", "POST"), ("route", "/users/:id"), ("status_code", "201")]
    );
}

#[test]
fn custom_labels_default_to_empty_and_may_override_fixed() {
    let resolver = Resolver::new(
        ["tenant", "region", "method"],
        Some(Arc::new(|req: &FakeRequest, _res: &FakeResponse| {
            let mut m = HashMap::new();
            if let Some(t) = req.header("x-tenant") {
                m.insert("tenant".to_string(), t.to_string());
            }
            m.insert("method".to_string(), "ANY".to_string());
            m
        })),
    )
    .unwrap();

    assert_eq!(
        resolver.schema().names(),
        ["method", "route", "status_code", "tenant", "region"]
    );

    let req = FakeRequest::new("GET", "/").with_header("x-tenant", "acme");
    let labels = resolver.resolve(&req, &FakeResponse::status(200));
    assert_eq!(labels.get("tenant"), Some("acme"));
    assert_eq!(labels.get("region"), Some(""));
    assert_eq!(labels.get("method"), Some("ANY"));
    assert_eq!(labels.len(), 5);
}

#[test]
fn malformed_custom_label_name_fails_at_configuration() {
    for bad in ["1st", "with-dash", "__reserved", ""] {
        let err = Resolver::new([bad], None).err().expect("must fail");
        assert_eq!(err.code().as_str(), "INVALID_LABEL_NAME", "name={bad:?}");
    }
}

#[test]
fn zero_fill_labels_are_placeholders() {
    let resolver = Resolver::new(["tenant"], None).unwrap();
    let labels = resolver.zero_fill_labels();
    assert_eq!(labels.get("method"), Some("GET"));
    assert_eq!(labels.get("route"), Some(""));
    assert_eq!(labels.get("status_code"), Some("404"));
    assert_eq!(labels.get("tenant"), Some(""));
}
