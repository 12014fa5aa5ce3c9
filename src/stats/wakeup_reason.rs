//! Wakeup-reason table (component C): a bounded LRU counter keyed by the
//! kernel's last-resume-reason string.

use std::sync::Mutex;

use lru::LruCache;

/// One `(reason, count)` entry as returned by [`WakeupReasonTable::snapshot`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WakeupInfo {
    pub reason: String,
    pub count: u64,
}

pub struct WakeupReasonTable {
    inner: Mutex<LruCache<String, u64>>,
}

impl WakeupReasonTable {
    pub fn new(capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Takes the first non-empty line of `reasons` as the key and
    /// increments its count, inserting with 1 if absent and evicting
    /// the LRU entry on overflow.
    pub fn update(&self, reasons: &[String]) {
        let Some(reason) = reasons.iter().find(|l| !l.is_empty()) else {
            return;
        };

        let mut table = self.inner.lock().unwrap();
        if let Some(count) = table.get_mut(reason.as_str()) {
            *count += 1;
            return;
        }

        if table.len() == table.cap().get() {
            if let Some((evicted, _)) = table.pop_lru() {
                log::warn!("wakeup-reason table at capacity, evicted {evicted:?}");
            }
        }
        table.put(reason.clone(), 1);
    }

    pub fn snapshot(&self) -> Vec<WakeupInfo> {
        let table = self.inner.lock().unwrap();
        table
            .iter()
            .map(|(reason, count)| WakeupInfo {
                reason: reason.clone(),
                count: *count,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_non_empty_line_is_the_key() {
        let table = WakeupReasonTable::new(4);
        table.update(&["".to_owned(), "Abort: pending wakeup irq".to_owned()]);
        table.update(&["Abort: pending wakeup irq".to_owned()]);

        let snap = table.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].count, 2);
    }

    #[test]
    fn evicts_lru_reason_on_overflow() {
        let table = WakeupReasonTable::new(1);
        table.update(&["reason-a".to_owned()]);
        table.update(&["reason-b".to_owned()]);

        let snap = table.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].reason, "reason-b");
    }

    #[test]
    fn all_empty_lines_are_ignored() {
        let table = WakeupReasonTable::new(4);
        table.update(&["".to_owned(), "".to_owned()]);
        assert!(table.snapshot().is_empty());
    }
}
