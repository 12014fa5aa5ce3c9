//! Adaptive inter-suspend backoff.

use std::time::Duration;

use crate::config::Config;

/// Runtime backoff state. Constructed once from [`Config`] and then
/// driven purely by [`BackoffState::record_outcome`].
///
/// Invariant: `base_sleep <= current_sleep <= max_sleep` at all times.
pub struct BackoffState {
    base_sleep: Duration,
    max_sleep: Duration,
    scale_factor: f64,
    short_suspend_threshold: Duration,
    failure_backoff_threshold: u32,
    failure_backoff_enabled: bool,
    short_backoff_enabled: bool,

    current_sleep: Duration,
    consecutive_bad_outcomes: u32,
}

impl BackoffState {
    pub fn new(config: &Config) -> Self {
        Self {
            base_sleep: config.base_sleep(),
            max_sleep: config.max_sleep(),
            scale_factor: config.sleep_time_scale_factor,
            short_suspend_threshold: config.short_suspend_threshold(),
            failure_backoff_threshold: config.backoff_threshold_count,
            failure_backoff_enabled: config.failed_suspend_backoff_enabled,
            short_backoff_enabled: config.short_suspend_backoff_enabled,
            current_sleep: config.base_sleep(),
            consecutive_bad_outcomes: 0,
        }
    }

    pub fn current_sleep(&self) -> Duration {
        self.current_sleep
    }

    /// Records one suspend attempt's outcome and returns the sleep time
    /// to use before the next iteration.
    ///
    /// `sleep_time` is the measured kernel sleep duration on a
    /// successful suspend, or `None` if it couldn't be read/parsed; a
    /// parse failure is treated as a non-short outcome.
    pub fn record_outcome(&mut self, success: bool, sleep_time: Option<Duration>) -> Duration {
        let short_wake = self.short_backoff_enabled
            && success
            && sleep_time.is_some_and(|d| d < self.short_suspend_threshold);

        let good = success
            && (!self.short_backoff_enabled
                || sleep_time.is_none_or(|d| d >= self.short_suspend_threshold));

        if good {
            self.consecutive_bad_outcomes = 0;
            self.current_sleep = self.base_sleep;
            return self.current_sleep;
        }

        self.consecutive_bad_outcomes += 1;
        let failure = !success;

        let scale_applies = self.consecutive_bad_outcomes > self.failure_backoff_threshold
            && ((failure && self.failure_backoff_enabled)
                || (short_wake && self.short_backoff_enabled));

        if scale_applies {
            let scaled_millis = self.current_sleep.as_secs_f64() * self.scale_factor;
            let scaled = Duration::from_secs_f64(scaled_millis);
            self.current_sleep = scaled.min(self.max_sleep);
        }

        self.current_sleep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_ms: u64, max_ms: u64, scale: f64, threshold: u32) -> Config {
        Config {
            base_sleep_time_millis: base_ms,
            max_sleep_time_millis: max_ms,
            sleep_time_scale_factor: scale,
            backoff_threshold_count: threshold,
            short_suspend_threshold_millis: 0,
            failed_suspend_backoff_enabled: true,
            short_suspend_backoff_enabled: false,
            max_stats_entries: 20,
            max_wakeup_reason_entries: 20,
        }
    }

    #[test]
    fn failure_backoff_trajectory_ramps_then_resets() {
        let mut backoff = BackoffState::new(&config(10, 80, 2.0, 0));

        let mut trajectory = vec![];
        for _ in 0..4 {
            trajectory.push(backoff.record_outcome(false, None).as_millis());
        }
        assert_eq!(trajectory, vec![20, 40, 80, 80]);

        let after_success = backoff.record_outcome(true, Some(Duration::from_secs(1)));
        assert_eq!(after_success.as_millis(), 10);
    }

    #[test]
    fn p5_monotonic_formula_holds_for_n_failures() {
        let base = 10u64;
        let max = 100_000u64;
        let scale = 2.0;
        let mut backoff = BackoffState::new(&config(base, max, scale, 0));

        for n in 1..=6u32 {
            let got = backoff.record_outcome(false, None);
            let want_ms = (base as f64 * scale.powi(n as i32)).min(max as f64);
            assert!(
                (got.as_millis() as f64 - want_ms).abs() < 1.0,
                "n={n}, got={got:?}, want_ms={want_ms}"
            );
        }
    }

    #[test]
    fn backoff_threshold_delays_scaling() {
        // With a threshold of 2, the first two bad outcomes don't scale.
        let mut backoff = BackoffState::new(&config(10, 80, 2.0, 2));
        assert_eq!(backoff.record_outcome(false, None).as_millis(), 10);
        assert_eq!(backoff.record_outcome(false, None).as_millis(), 10);
        assert_eq!(backoff.record_outcome(false, None).as_millis(), 20);
    }

    #[test]
    fn short_wake_backoff_only_applies_when_enabled() {
        let mut cfg = config(10, 80, 2.0, 0);
        cfg.short_suspend_backoff_enabled = true;
        cfg.short_suspend_threshold_millis = 500;
        let mut backoff = BackoffState::new(&cfg);

        // Success, but resumed too fast: counts as a bad (short-wake) outcome.
        let got = backoff.record_outcome(true, Some(Duration::from_millis(100)));
        assert_eq!(got.as_millis(), 20);

        // Success with a long-enough sleep is a good outcome.
        let got = backoff.record_outcome(true, Some(Duration::from_secs(2)));
        assert_eq!(got.as_millis(), 10);
    }

    #[test]
    fn disabled_backoff_keeps_current_sleep_at_base() {
        let mut cfg = config(10, 80, 2.0, 0);
        cfg.failed_suspend_backoff_enabled = false;
        let mut backoff = BackoffState::new(&cfg);

        for _ in 0..5 {
            assert_eq!(backoff.record_outcome(false, None).as_millis(), 10);
        }
    }

    #[test]
    fn parse_failure_is_treated_as_non_short() {
        let mut cfg = config(10, 80, 2.0, 0);
        cfg.short_suspend_backoff_enabled = true;
        cfg.short_suspend_threshold_millis = 500;
        let mut backoff = BackoffState::new(&cfg);

        // success=true, sleep_time=None (unreadable file): not a short wake.
        assert_eq!(backoff.record_outcome(true, None).as_millis(), 10);
    }
}
