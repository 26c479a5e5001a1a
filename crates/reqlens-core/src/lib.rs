//! reqlens core: request-lifecycle latency instrumentation.
//!
//! This crate holds the transport-agnostic half of reqlens: the metric
//! registry with its two sink engines (sliding-window summary and fixed-bucket
//! histogram) and the lifecycle components that decide which requests are
//! timed and how each observation is labeled. It carries no runtime or HTTP
//! framework dependency; hosts plug in through the [`lifecycle::HttpRequest`]
//! and [`lifecycle::HttpResponse`] views.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `ReqLensError`/`Result`; per-request failures are contained by
//! [`lifecycle::Instrumentation`] and never reach the response path.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod lifecycle;
pub mod metrics;

/// Shared result type.
pub use error::{ErrorCode, ReqLensError, Result};
