//! Suspend loop (component E): drives the kernel wakeup-count protocol
//! and feeds the adaptive backoff state machine.

pub mod backoff;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::arbiter::Arbiter;
use crate::config::Config;
use crate::stats::WakeupReasonTable;

use backoff::BackoffState;

/// Owns the dedicated suspend thread and the backoff state it drives.
/// Constructed once alongside the arbiter it shares; `enable_autosuspend`
/// starts the thread and is safe to call from any thread.
pub struct SuspendLoop {
    arbiter: Arc<Arbiter>,
    wakeup_reasons: Arc<WakeupReasonTable>,
    backoff: Mutex<BackoffState>,
    enabled: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SuspendLoop {
    pub fn new(config: &Config, arbiter: Arc<Arbiter>, wakeup_reasons: Arc<WakeupReasonTable>) -> Self {
        Self {
            arbiter,
            wakeup_reasons,
            backoff: Mutex::new(BackoffState::new(config)),
            enabled: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    /// Starts the dedicated suspend thread. Idempotent: a second call
    /// returns `false` without starting a second thread.
    pub fn enable_autosuspend(self: &Arc<Self>) -> bool {
        if self.enabled.swap(true, Ordering::AcqRel) {
            return false;
        }

        let this = Arc::clone(self);
        let thread = thread::Builder::new()
            .name("suspend-loop".to_owned())
            .spawn(move || this.run())
            .expect("failed to spawn suspend-loop thread");

        *self.handle.lock().unwrap() = Some(thread);
        true
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn run(&self) {
        while !self.arbiter.is_shutdown() {
            self.run_iteration();
        }
    }

    /// Runs exactly one suspend-loop iteration. Broken out from [`run`]
    /// so tests can drive it deterministically without a background
    /// thread.
    pub fn run_iteration(&self) {
        let sleep_for = self.backoff.lock().unwrap().current_sleep();
        thread::sleep(sleep_for);

        let wakeup_count = match self.arbiter.kernel().read_wakeup_count() {
            Ok(s) => s,
            Err(e) => {
                log::error!("failed to read wakeup_count, restarting iteration: {e}");
                return;
            }
        };

        // The mutex guarding suspend_counter is held from the moment the
        // gate clears through the State write, released only once this
        // closure returns.
        let committed = self.arbiter.with_gate_held(|| {
            if !self.arbiter.kernel().arm(&wakeup_count) {
                log::warn!("wakeup count changed since read, arm rejected");
                return None;
            }
            Some(self.arbiter.kernel().commit())
        });

        let success = committed.unwrap_or(false);

        let sleep_time = success
            .then(|| self.arbiter.kernel().read_suspend_time())
            .flatten()
            .map(|(_, sleep)| Duration::from_secs_f64(sleep));

        let reasons = self
            .arbiter
            .kernel()
            .read_wakeup_reasons()
            .unwrap_or_default();

        self.wakeup_reasons.update(&reasons);
        self.arbiter.callbacks().notify_wakeup(success, &reasons);

        self.backoff.lock().unwrap().record_outcome(success, sleep_time);
    }

    pub fn current_sleep(&self) -> Duration {
        self.backoff.lock().unwrap().current_sleep()
    }
}
