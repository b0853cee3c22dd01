//! Per-user sliding-window rate limiting.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Storage for per-user request timestamps.
///
/// The in-memory store is enough for a single bot instance; a shared
/// store can implement the same interface for multi-instance setups.
pub trait RequestLog: Send + Sync {
    /// Drop timestamps whose age is `>= window` and return how many remain.
    fn purge_and_count(&self, user_id: i64, now: Instant, window: Duration) -> usize;

    /// Record a request at `at`.
    fn record(&self, user_id: i64, at: Instant);

    /// Purge, and record `now` if fewer than `limit` requests remain.
    /// Returns whether the request was admitted.
    ///
    /// Implementations should make this atomic per user; the default is not.
    fn admit(&self, user_id: i64, now: Instant, window: Duration, limit: usize) -> bool {
        if self.purge_and_count(user_id, now, window) >= limit {
            return false;
        }
        self.record(user_id, now);
        true
    }
}

/// Admission checks between sweeps of users whose window has emptied.
const SWEEP_EVERY: usize = 1024;

#[derive(Default)]
pub struct InMemoryRequestLog {
    entries: Mutex<HashMap<i64, VecDeque<Instant>>>,
    admits: AtomicUsize,
}

impl InMemoryRequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with at least one retained timestamp.
    #[cfg(test)]
    pub fn tracked_users(&self) -> usize {
        self.entries.lock().expect("request log lock poisoned").len()
    }
}

fn purge(entries: &mut HashMap<i64, VecDeque<Instant>>, user_id: i64, now: Instant, window: Duration) -> usize {
    let Some(times) = entries.get_mut(&user_id) else {
        return 0;
    };
    // Timestamps are appended in order, so expired ones are at the front
    while times
        .front()
        .is_some_and(|t| now.saturating_duration_since(*t) >= window)
    {
        times.pop_front();
    }
    let remaining = times.len();
    if remaining == 0 {
        entries.remove(&user_id);
    }
    remaining
}

/// Drop every user whose newest timestamp has left the window.
fn sweep(entries: &mut HashMap<i64, VecDeque<Instant>>, now: Instant, window: Duration) {
    entries.retain(|_, times| {
        times
            .back()
            .is_some_and(|t| now.saturating_duration_since(*t) < window)
    });
}

impl RequestLog for InMemoryRequestLog {
    fn purge_and_count(&self, user_id: i64, now: Instant, window: Duration) -> usize {
        let mut entries = self.entries.lock().expect("request log lock poisoned");
        purge(&mut entries, user_id, now, window)
    }

    fn record(&self, user_id: i64, at: Instant) {
        let mut entries = self.entries.lock().expect("request log lock poisoned");
        entries.entry(user_id).or_default().push_back(at);
    }

    fn admit(&self, user_id: i64, now: Instant, window: Duration, limit: usize) -> bool {
        let mut entries = self.entries.lock().expect("request log lock poisoned");
        if (self.admits.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            sweep(&mut entries, now, window);
        }
        if purge(&mut entries, user_id, now, window) >= limit {
            return false;
        }
        entries.entry(user_id).or_default().push_back(now);
        true
    }
}

/// Sliding-window limiter: at most `limit` admitted requests per user
/// within any `window`. Rejected attempts are not recorded.
pub struct RateLimiter {
    store: Arc<dyn RequestLog>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RequestLog>, limit: usize, window: Duration) -> Self {
        Self { store, limit, window }
    }

    /// In-memory limiter with the given bounds.
    pub fn in_memory(limit: usize, window: Duration) -> Self {
        Self::new(Arc::new(InMemoryRequestLog::new()), limit, window)
    }

    pub fn is_rate_limited(&self, user_id: i64) -> bool {
        self.is_rate_limited_at(user_id, Instant::now())
    }

    pub fn is_rate_limited_at(&self, user_id: i64, now: Instant) -> bool {
        !self.store.admit(user_id, now, self.window, self.limit)
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
