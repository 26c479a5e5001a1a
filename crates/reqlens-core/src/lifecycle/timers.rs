//! In-flight request timers keyed by request identity.
//!
//! Entries are created on arrival and removed on completion. Requests whose
//! completion never fires (client gone, handler future dropped) leave their
//! entry behind; `sweep` evicts those past a TTL so the table stays bounded
//! under sustained traffic.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::RequestId;

/// One monotonic capture shared by both sinks.
#[derive(Debug, Clone, Copy)]
pub struct TimerEntry {
    started_at: Instant,
}

impl TimerEntry {
    pub fn start() -> Self {
        Self { started_at: Instant::now() }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Elapsed seconds since arrival.
    pub fn elapsed_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: DashMap<RequestId, TimerEntry>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer. A second start for the same id overwrites the first;
    /// only one entry can ever be consumed.
    pub fn start(&self, id: RequestId) {
        if self.timers.insert(id, TimerEntry::start()).is_some() {
            tracing::warn!(request_id = id.get(), "timer restarted for in-flight request");
        }
    }

    /// Remove and return the entry. Absent is not an error.
    pub fn stop(&self, id: RequestId) -> Option<TimerEntry> {
        self.timers.remove(&id).map(|(_, entry)| entry)
    }

    /// Evict entries older than `ttl`. Returns how many were evicted.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let mut evicted = 0;
        self.timers.retain(|_, entry| {
            let keep = entry.started_at.elapsed() < ttl;
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
