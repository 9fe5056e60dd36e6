//! Configuration for the settings cache.

use std::time::Duration;

/// Default TTL for cached settings.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Configuration for a settings cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a successful fetch stays fresh.
    /// Expiry is only checked on read; nothing runs on a timer.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}
