//! Cache configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capacity, expiry and global switch for the render caches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether caching starts enabled
    pub enabled: bool,
    /// Max entries in the raw content tier
    pub raw_capacity: u64,
    /// Max entries in the expanded content tier
    pub expanded_capacity: u64,
    /// Max entries in the chart artifact tier
    pub chart_capacity: u64,
    /// Optional time-to-live for every entry, in seconds
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With caching switched on or off
    #[inline]
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// With time-to-live
    #[inline]
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = Some(ttl.as_secs());
        self
    }

    /// Time-to-live as a duration
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            raw_capacity: 10_000,
            expanded_capacity: 10_000,
            chart_capacity: 2_000,
            ttl_secs: None,
        }
    }
}
