//! Background eviction of abandoned request timers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::app_state::HttpInstrumentation;

/// Every `interval`, drop timers armed longer than `ttl` ago.
pub fn spawn_timer_sweeper(
    instrumentation: Arc<HttpInstrumentation>,
    interval: Duration,
    ttl: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = instrumentation.sweep_abandoned(ttl);
            if evicted > 0 {
                tracing::warn!(
                    evicted,
                    in_flight = instrumentation.in_flight(),
                    "evicted abandoned request timers"
                );
            }
        }
    })
}
