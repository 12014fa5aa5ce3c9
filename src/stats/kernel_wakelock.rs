//! The kernel-wakelock stats entry: same shape as
//! [`super::WakeLockInfo`], plus a handful of fields the kernel itself
//! tracks for each wakeup source under `/sys/class/wakeup/<source>/`.

/// A live-read snapshot of one kernel wakeup source's sibling files.
/// Unlike [`super::WakeLockInfo`], this is never cached; it's read
/// fresh from `ClassWakeup` on every call.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KernelWakeLockInfo {
    pub name: String,
    pub active_count: u64,
    pub active_since: u64,
    pub last_change: u64,
    pub max_held_time: u64,
    pub total_held_time: u64,
    pub is_active: bool,
    pub event_count: u64,
    pub wakeup_count: u64,
    pub expire_count: u64,
    pub prevent_suspend_time: u64,
    pub active_time: u64,
}

impl KernelWakeLockInfo {
    pub(crate) fn from_siblings(name: String, siblings: &[(String, String)]) -> Self {
        let field = |key: &str| -> u64 {
            siblings
                .iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.parse::<u64>().ok())
                .unwrap_or(0)
        };

        Self {
            name,
            active_count: field("active_count"),
            active_since: field("last_change_ms"),
            last_change: field("last_change_ms"),
            max_held_time: field("max_time_ms"),
            total_held_time: field("total_time_ms"),
            is_active: field("active_count") > 0 && field("active_time_ms") > 0,
            event_count: field("event_count"),
            wakeup_count: field("wakeup_count"),
            expire_count: field("expire_count"),
            prevent_suspend_time: field("prevent_suspend_time_ms"),
            active_time: field("active_time_ms"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_siblings_default_to_zero() {
        let info = KernelWakeLockInfo::from_siblings("eth0".to_owned(), &[]);
        assert_eq!(info.event_count, 0);
        assert!(!info.is_active);
    }

    #[test]
    fn parses_present_siblings() {
        let siblings = vec![
            ("event_count".to_owned(), "7".to_owned()),
            ("wakeup_count".to_owned(), "2".to_owned()),
            ("active_time_ms".to_owned(), "500".to_owned()),
        ];
        let info = KernelWakeLockInfo::from_siblings("wlan0".to_owned(), &siblings);
        assert_eq!(info.event_count, 7);
        assert_eq!(info.wakeup_count, 2);
        assert_eq!(info.active_time, 500);
    }
}
