//! Configuration for the BBO engine.
//!
//! This module provides the [`Config`] struct shared by the engine and every
//! pair tracker it creates.

use std::time::Duration;

/// Default per-side queue capacity
pub const DEFAULT_MAX_LEVELS: usize = 10;

/// Default age after which a top-of-book level is considered stale
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30 * 60);

/// Configuration for the BBO engine
///
/// # Example
///
/// ```rust
/// use bbo_tracker::Config;
/// use std::time::Duration;
///
/// let config = Config::new();
/// assert_eq!(config.max_levels(), 10);
///
/// // Tighter staleness and reclaim pairs that go quiet for an hour
/// let config = Config::new()
///     .with_stale_after(Duration::from_secs(60))
///     .with_idle_pair_ttl(Some(Duration::from_secs(3600)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Per-side queue capacity
    max_levels: usize,

    /// Staleness threshold for the top-of-book sweep
    stale_after: Duration,

    /// Remove trackers for pairs silent longer than this (None = keep forever)
    idle_pair_ttl: Option<Duration>,

    /// Keep only the first level per side of a full snapshot
    truncate_snapshots: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_levels: DEFAULT_MAX_LEVELS,
            stale_after: DEFAULT_STALE_AFTER,
            idle_pair_ttl: None,
            truncate_snapshots: true,
        }
    }
}

impl Config {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-side queue capacity (minimum 1)
    #[must_use]
    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels.max(1);
        self
    }

    /// Set the staleness threshold for the top of each side
    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Set the idle TTL used by [`BboEngine::sweep_idle_pairs`](crate::orderbook::BboEngine::sweep_idle_pairs)
    #[must_use]
    pub fn with_idle_pair_ttl(mut self, idle_pair_ttl: Option<Duration>) -> Self {
        self.idle_pair_ttl = idle_pair_ttl;
        self
    }

    /// Apply every level of a full snapshot instead of only the first per side
    ///
    /// Intended for tests; the default (`true`) treats the queue as holding
    /// only the top entry in authoritative mode.
    #[must_use]
    pub fn with_truncate_snapshots(mut self, truncate: bool) -> Self {
        self.truncate_snapshots = truncate;
        self
    }

    /// Get the per-side queue capacity
    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Get the staleness threshold
    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Get the staleness threshold in milliseconds
    pub fn stale_after_ms(&self) -> i64 {
        i64::try_from(self.stale_after.as_millis()).unwrap_or(i64::MAX)
    }

    /// Get the idle pair TTL
    pub fn idle_pair_ttl(&self) -> Option<Duration> {
        self.idle_pair_ttl
    }

    /// Check if full snapshots are truncated to the top level
    pub fn truncate_snapshots(&self) -> bool {
        self.truncate_snapshots
    }
}
