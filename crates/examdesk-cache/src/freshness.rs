//! Fetch-time tracking for TTL-based staleness.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks when a cached value was last fetched.
///
/// Uses tokio's clock so paused-time tests can move past the TTL without
/// sleeping.
#[derive(Debug, Clone)]
pub struct Freshness {
    /// Time of the last successful fetch. `None` means never fetched, or
    /// invalidated since.
    fetched_at: Option<Instant>,

    /// TTL duration.
    ttl: Duration,
}

impl Freshness {
    /// Create a tracker that has never seen a fetch.
    pub fn new(ttl: Duration) -> Self {
        Self {
            fetched_at: None,
            ttl,
        }
    }

    /// Record a successful fetch at `now`.
    pub fn mark_fetched(&mut self, now: Instant) {
        self.fetched_at = Some(now);
    }

    /// Forget the fetch time so the next check reports stale.
    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }

    /// Check staleness at `now`.
    pub fn is_stale_at(&self, now: Instant) -> bool {
        match self.fetched_at {
            None => true,
            Some(at) => now.saturating_duration_since(at) > self.ttl,
        }
    }

    /// Check staleness against the current time.
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Instant::now())
    }

    /// Age of the held value, if it was ever fetched.
    pub fn age(&self) -> Option<Duration> {
        self.fetched_at.map(|at| at.elapsed())
    }

    /// Whether a fetch has been recorded.
    pub fn has_fetched(&self) -> bool {
        self.fetched_at.is_some()
    }

    /// Get the configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
