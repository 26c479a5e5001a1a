//! reqlens HTTP adapter.
//!
//! Wires the lifecycle core into an axum stack: the timing middleware,
//! strict YAML config, shared app state, ops endpoints and the background
//! sweeper for abandoned timers. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod demo;
pub mod middleware;
pub mod ops;
pub mod request;
pub mod router;
pub mod sweeper;
