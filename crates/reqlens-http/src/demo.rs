//! Demo handlers with known latency, used to exercise the instrumentation.

use axum::extract::Query;
use serde::Deserialize;
use tokio::time::{sleep, Duration};

const BODY: &str = "Hello World\n";

#[derive(Debug, Deserialize)]
pub struct DelayQuery {
    /// Milliseconds.
    #[serde(default)]
    pub delay: u64,
}

pub async fn half_second() -> &'static str {
    sleep(Duration::from_millis(500)).await;
    BODY
}

pub async fn one_second() -> &'static str {
    sleep(Duration::from_secs(1)).await;
    BODY
}

pub async fn two_seconds() -> &'static str {
    sleep(Duration::from_secs(2)).await;
    BODY
}

pub async fn dynamic_delay(Query(q): Query<DelayQuery>) -> &'static str {
    sleep(Duration::from_millis(q.delay)).await;
    BODY
}
