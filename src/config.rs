//! Configuration surface.
//!
//! Every field here is a system property consulted exactly once at
//! startup; there is no hot-reload. Defaults match the documented
//! values. This module does not read system properties itself; sourcing
//! a [`Config`] from whatever property store the platform uses is part
//! of the out-of-scope RPC/platform-integration layer; this crate only
//! defines the shape and the defaults.

use std::time::Duration;

/// Startup configuration for the suspend controller.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// `base_sleep_time_millis`. Floor of the inter-suspend sleep.
    pub base_sleep_time_millis: u64,
    /// `max_sleep_time_millis`. Ceiling of the inter-suspend sleep.
    pub max_sleep_time_millis: u64,
    /// `sleep_time_scale_factor`. Must be >= 1.0.
    pub sleep_time_scale_factor: f64,
    /// `backoff_threshold_count`. Consecutive bad outcomes tolerated
    /// before backoff starts scaling `current_sleep`.
    pub backoff_threshold_count: u32,
    /// `short_suspend_threshold_millis`. A suspend that resumed faster
    /// than this is a "short wake".
    pub short_suspend_threshold_millis: u64,
    /// `failed_suspend_backoff_enabled`.
    pub failed_suspend_backoff_enabled: bool,
    /// `short_suspend_backoff_enabled`.
    pub short_suspend_backoff_enabled: bool,
    /// Capacity of the wake-lock stats LRU table (component B). Not a
    /// named system property, but every deployment needs one; chosen
    /// to match the AOSP default of 20 entries.
    pub max_stats_entries: usize,
    /// Capacity of the wakeup-reason LRU table (component C).
    pub max_wakeup_reason_entries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_sleep_time_millis: 100,
            max_sleep_time_millis: 60_000,
            sleep_time_scale_factor: 2.0,
            backoff_threshold_count: 0,
            short_suspend_threshold_millis: 0,
            failed_suspend_backoff_enabled: true,
            short_suspend_backoff_enabled: false,
            max_stats_entries: 20,
            max_wakeup_reason_entries: 20,
        }
    }
}

impl Config {
    pub fn base_sleep(&self) -> Duration {
        Duration::from_millis(self.base_sleep_time_millis)
    }

    pub fn max_sleep(&self) -> Duration {
        Duration::from_millis(self.max_sleep_time_millis)
    }

    pub fn short_suspend_threshold(&self) -> Duration {
        Duration::from_millis(self.short_suspend_threshold_millis)
    }
}
