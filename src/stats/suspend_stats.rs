//! Suspend-stats snapshot: success/failure counters, per-stage failure
//! counts, and the identity of the last failure, read as a family of
//! files from `/sys/power/suspend_stats/`.

use crate::kernel::KernelInterface;

/// A snapshot of `/sys/power/suspend_stats/`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SuspendStats {
    pub success: u64,
    pub fail: u64,
    pub failed_freeze: u64,
    pub failed_prepare: u64,
    pub failed_suspend: u64,
    pub failed_suspend_late: u64,
    pub failed_suspend_noirq: u64,
    pub failed_resume: u64,
    pub failed_resume_early: u64,
    pub failed_resume_noirq: u64,
    pub last_failed_dev: String,
    pub last_failed_errno: i64,
    pub last_failed_step: String,
}

impl SuspendStats {
    /// Reads and parses every sibling file under `SuspendStats`. Missing
    /// or unparseable siblings default to zero/empty rather than
    /// failing the whole read, since the kernel only creates the files
    /// relevant to the path it has actually taken.
    pub fn read(kernel: &KernelInterface) -> std::io::Result<Self> {
        let siblings = kernel.read_suspend_stats_dir()?;
        let field = |key: &str| -> u64 {
            siblings
                .iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.parse::<u64>().ok())
                .unwrap_or(0)
        };
        let text = |key: &str| -> String {
            siblings
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        Ok(Self {
            success: field("success"),
            fail: field("fail"),
            failed_freeze: field("failed_freeze"),
            failed_prepare: field("failed_prepare"),
            failed_suspend: field("failed_suspend"),
            failed_suspend_late: field("failed_suspend_late"),
            failed_suspend_noirq: field("failed_suspend_noirq"),
            failed_resume: field("failed_resume"),
            failed_resume_early: field("failed_resume_early"),
            failed_resume_noirq: field("failed_resume_noirq"),
            last_failed_dev: text("last_failed_dev"),
            last_failed_errno: text("last_failed_errno").parse().unwrap_or(0),
            last_failed_step: text("last_failed_step"),
        })
    }
}
