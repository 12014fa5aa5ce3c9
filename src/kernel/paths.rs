//! Logical-identifier-to-path table.

pub const WAKEUP_COUNT: &str = "/sys/power/wakeup_count";
pub const STATE: &str = "/sys/power/state";
pub const SUSPEND_STATS: &str = "/sys/power/suspend_stats";
pub const CLASS_WAKEUP: &str = "/sys/class/wakeup";
pub const KERNEL_WAKEUP_REASONS: &str = "/sys/kernel/wakeup_reasons/last_resume_reason";
pub const KERNEL_SUSPEND_TIME: &str = "/sys/kernel/wakeup_reasons/last_suspend_time";
pub const WAKE_LOCK: &str = "/sys/power/wake_lock";
pub const WAKE_UNLOCK: &str = "/sys/power/wake_unlock";
