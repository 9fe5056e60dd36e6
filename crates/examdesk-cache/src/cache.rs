//! Single-value stale-while-revalidate cache.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::bus::{Invalidate, InvalidationBus, SettingsTopic};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::fetcher::SettingsFetcher;
use crate::freshness::Freshness;

/// Bookkeeping protected by a mutex. Never held across an await.
#[derive(Debug)]
struct CacheState {
    /// TTL tracking for the held value.
    freshness: Freshness,

    /// Sequence number handed to the most recently issued fetch.
    issued: u64,

    /// Sequence number of the fetch whose value is currently held.
    applied: u64,

    /// Fetches issued at or before this number started before the last
    /// invalidation; their values are applied but do not count as fresh.
    invalidated_through: u64,

    /// Successful fetches applied.
    refreshes: u64,

    /// Fetches that failed.
    failures: u64,
}

struct Shared<T> {
    name: String,
    fetcher: Arc<dyn SettingsFetcher<T>>,
    state: Mutex<CacheState>,
    /// Holds the current value and notifies subscribers when it changes.
    value: watch::Sender<T>,
}

impl<T: Send + Sync + 'static> Invalidate for Shared<T> {
    fn invalidate(&self) {
        let mut state = self.state.lock();
        state.freshness.invalidate();
        state.invalidated_through = state.issued;
        debug!(cache = %self.name, "Settings cache invalidated");
    }
}

/// Stale-while-revalidate cache for one settings value.
///
/// [`read`](Self::read) always answers immediately with the held value; if
/// that value is older than the TTL (or was invalidated, or was never
/// fetched) a background refresh is started. Failed refreshes keep the old
/// value. Clones share the same value, so one consumer's refresh is visible
/// to all of them.
///
/// Concurrent stale reads are not de-duplicated: each may issue a fetch.
/// Every fetch carries a sequence number and a response older than the one
/// already applied is dropped, so a slow early fetch cannot overwrite a
/// newer value.
pub struct SettingsCache<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SettingsCache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> SettingsCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cache that serves `fallback` until the first successful fetch.
    pub fn new(
        name: impl Into<String>,
        fallback: T,
        fetcher: Arc<dyn SettingsFetcher<T>>,
        config: CacheConfig,
    ) -> Self {
        let (value, _) = watch::channel(fallback);
        let state = CacheState {
            freshness: Freshness::new(config.ttl),
            issued: 0,
            applied: 0,
            invalidated_through: 0,
            refreshes: 0,
            failures: 0,
        };

        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                fetcher,
                state: Mutex::new(state),
                value,
            }),
        }
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Return the held value, starting a background refresh if it is stale.
    ///
    /// Needs a tokio runtime to refresh; without one the held value is
    /// returned and the refresh is skipped.
    pub fn read(&self) -> T {
        self.read_revalidating().0
    }

    /// Like [`read`](Self::read), also returning the refresh task if one
    /// was started. The task resolves to `true` if its value was applied.
    pub fn read_revalidating(&self) -> (T, Option<JoinHandle<bool>>) {
        let value = self.current();

        if self.is_fresh() {
            trace!(cache = %self.shared.name, "Settings cache hit");
            return (value, None);
        }

        let handle = match Handle::try_current() {
            Ok(runtime) => {
                debug!(cache = %self.shared.name, "Settings stale, refreshing in background");
                let this = self.clone();
                Some(runtime.spawn(async move { this.refresh().await.unwrap_or(false) }))
            }
            Err(_) => {
                debug!(cache = %self.shared.name, "No runtime, skipping background refresh");
                None
            }
        };

        (value, handle)
    }

    /// Return the held value without checking staleness.
    pub fn current(&self) -> T {
        self.shared.value.borrow().clone()
    }

    /// Whether the held value came from a fetch within the TTL.
    pub fn is_fresh(&self) -> bool {
        !self.shared.state.lock().freshness.is_stale()
    }

    /// Refresh now if stale; otherwise do nothing.
    ///
    /// Returns `Ok(true)` if a fetched value was applied.
    pub async fn revalidate(&self) -> Result<bool> {
        if self.is_fresh() {
            return Ok(false);
        }
        self.refresh().await
    }

    /// Fetch unconditionally and apply the result unless superseded.
    ///
    /// On failure the held value is kept and the error is returned (it has
    /// already been logged).
    pub async fn refresh(&self) -> Result<bool> {
        let seq = {
            let mut state = self.shared.state.lock();
            state.issued += 1;
            state.issued
        };
        trace!(cache = %self.shared.name, seq, "Settings fetch issued");

        let fetched = self.shared.fetcher.fetch().await;

        let mut state = self.shared.state.lock();
        match fetched {
            Ok(value) => {
                if seq <= state.applied {
                    debug!(
                        cache = %self.shared.name,
                        seq,
                        applied = state.applied,
                        "Discarding superseded settings response"
                    );
                    return Ok(false);
                }

                state.applied = seq;
                state.refreshes += 1;
                if seq > state.invalidated_through {
                    state.freshness.mark_fetched(Instant::now());
                }
                self.shared.value.send_replace(value);

                debug!(cache = %self.shared.name, seq, "Settings refreshed");
                Ok(true)
            }
            Err(e) => {
                state.failures += 1;
                warn!(
                    cache = %self.shared.name,
                    error = %e,
                    "Settings refresh failed, keeping cached value"
                );
                Err(e)
            }
        }
    }

    /// Mark the held value stale. The value itself stays visible.
    pub fn invalidate(&self) {
        self.shared.invalidate();
    }

    /// Invalidate this cache whenever `topic` is published on `bus`.
    pub fn attach(&self, bus: &InvalidationBus, topic: SettingsTopic) {
        let target: Weak<dyn Invalidate> = Arc::downgrade(&self.shared) as Weak<dyn Invalidate>;
        bus.subscribe(topic, target);
    }

    /// Watch value changes.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.shared.value.subscribe()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.shared.state.lock();
        CacheStats {
            fetched: state.freshness.has_fetched(),
            age: state.freshness.age(),
            ttl: state.freshness.ttl(),
            refreshes: state.refreshes,
            failures: state.failures,
        }
    }
}

impl<T> fmt::Debug for SettingsCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsCache")
            .field("name", &self.shared.name)
            .finish_non_exhaustive()
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Whether the held value counts as fetched (not fallback, not invalidated).
    pub fetched: bool,

    /// Age of the held value.
    pub age: Option<Duration>,

    /// Configured TTL.
    pub ttl: Duration,

    /// Successful fetches applied.
    pub refreshes: u64,

    /// Failed fetches.
    pub failures: u64,
}
