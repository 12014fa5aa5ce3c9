//! Control facade (component G): the stable surface an out-of-process
//! caller drives the controller through.
//!
//! Holds no state of its own beyond the handles needed to delegate; all
//! operations forward to the arbiter, the suspend loop, or one of the
//! stats tables.

use std::sync::Arc;

use crate::arbiter::{Arbiter, Mode, WakeLock};
use crate::callback::{CallbackRegistry, PeerId, WakeLockObserver, WakeupObserver};
use crate::config::Config;
use crate::error::SuspendError;
use crate::kernel::KernelInterface;
use crate::stats::{
    self, KernelWakeLockInfo, SuspendStats, WakeLockInfo, WakeLockStatsTable, WakeupInfo,
    WakeupReasonTable,
};
use crate::suspend::SuspendLoop;

/// The only wake-lock type this crate recognizes. Carried through
/// `acquire_wake_lock` purely for call-site parity with the RPC
/// surface; not otherwise interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WakeLockType {
    Partial,
}

/// Combined snapshot returned by [`SuspendService::get_wakelock_stats`]:
/// the caller-tracked entries alongside what the kernel itself reports
/// per wakeup source.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WakeLockStatsSnapshot {
    pub entries: Vec<WakeLockInfo>,
    pub kernel_entries: Vec<KernelWakeLockInfo>,
}

/// Process-wide entry point: owns the arbiter, the suspend loop, and the
/// stats tables, constructed once at startup and shared for the life of
/// the process.
pub struct SuspendService {
    arbiter: Arc<Arbiter>,
    suspend_loop: Arc<SuspendLoop>,
    wakelock_stats: Arc<WakeLockStatsTable>,
    wakeup_reasons: Arc<WakeupReasonTable>,
}

impl SuspendService {
    /// Opens the kernel endpoints (substituting pipes on failure) and
    /// wires up the arbiter, stats tables, and suspend loop. Does not
    /// start the suspend thread; call [`SuspendService::enable_autosuspend`]
    /// for that.
    pub fn new(config: &Config, mode: Mode) -> Self {
        Self::with_kernel(config, mode, KernelInterface::open())
    }

    /// Same as [`SuspendService::new`] but takes a pre-built
    /// [`KernelInterface`] (the hook tests use to substitute pipes or
    /// fixture files for the real sysfs tree).
    pub fn with_kernel(config: &Config, mode: Mode, mut kernel: KernelInterface) -> Self {
        if mode == Mode::KernelPassthrough {
            if let Err(e) = kernel.open_passthrough() {
                log::warn!("failed to open wake_lock/wake_unlock for passthrough mode: {e}");
            }
        }
        let kernel = Arc::new(kernel);
        let wakelock_stats = Arc::new(WakeLockStatsTable::new(config.max_stats_entries));
        let callbacks = Arc::new(CallbackRegistry::new());
        let arbiter = Arc::new(Arbiter::new(
            mode,
            Arc::clone(&kernel),
            Arc::clone(&wakelock_stats),
            callbacks,
        ));
        let wakeup_reasons = Arc::new(WakeupReasonTable::new(config.max_wakeup_reason_entries));
        let suspend_loop = Arc::new(SuspendLoop::new(
            config,
            Arc::clone(&arbiter),
            Arc::clone(&wakeup_reasons),
        ));

        Self {
            arbiter,
            suspend_loop,
            wakelock_stats,
            wakeup_reasons,
        }
    }

    /// Acquires a wake lock. `lock_type` is currently always
    /// [`WakeLockType::Partial`]; it exists so the call shape matches the
    /// RPC surface, not because any other variant changes behavior.
    pub fn acquire_wake_lock(
        &self,
        _lock_type: WakeLockType,
        name: &str,
        pid: i32,
    ) -> Result<WakeLock, SuspendError> {
        self.arbiter.acquire(name, pid)
    }

    pub fn enable_autosuspend(&self) -> bool {
        self.suspend_loop.enable_autosuspend()
    }

    pub fn force_suspend(&self) -> bool {
        self.arbiter.force_suspend()
    }

    pub fn register_wakeup_callback(&self, peer: PeerId, observer: Arc<dyn WakeupObserver>) -> bool {
        self.arbiter.callbacks().register_wakeup(peer, observer)
    }

    pub fn register_wakelock_callback(
        &self,
        peer: PeerId,
        name: &str,
        observer: Arc<dyn WakeLockObserver>,
    ) -> bool {
        self.arbiter.callbacks().register_wakelock(peer, name, observer)
    }

    /// Removes every callback registered under `peer`, in both
    /// collections. The RPC layer calls this on peer death alongside
    /// [`Arbiter::release_all`] for that peer's live handles.
    pub fn remove_peer_callbacks(&self, peer: PeerId) {
        self.arbiter.callbacks().remove_peer(peer);
    }

    /// Snapshot of the caller-tracked wake-lock table, MRU-first,
    /// alongside what the kernel reports per wakeup source.
    pub fn get_wakelock_stats(&self, now_us: u64) -> WakeLockStatsSnapshot {
        WakeLockStatsSnapshot {
            entries: self.wakelock_stats.refreshed_snapshot(now_us),
            kernel_entries: stats::read_kernel_wakelocks(self.arbiter.kernel()),
        }
    }

    pub fn get_wakeup_stats(&self) -> Vec<WakeupInfo> {
        self.wakeup_reasons.snapshot()
    }

    pub fn get_suspend_stats(&self) -> Result<SuspendStats, SuspendError> {
        SuspendStats::read(self.arbiter.kernel()).map_err(|source| SuspendError::KernelReadFailed {
            path: crate::kernel::SUSPEND_STATS,
            source,
        })
    }

    pub fn arbiter(&self) -> &Arc<Arbiter> {
        &self.arbiter
    }

    pub fn suspend_loop(&self) -> &Arc<SuspendLoop> {
        &self.suspend_loop
    }
}
