//! Wake-lock entry table (component B): a bounded LRU indexed by
//! `(name, pid)`, mutation-safe behind a single mutex.

use std::sync::Mutex;

use lru::LruCache;

/// A snapshot of one wake-lock's accumulated statistics.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WakeLockInfo {
    pub name: String,
    pub pid: i32,
    pub active_count: u64,
    pub active_since: u64,
    pub last_change: u64,
    pub max_held_time: u64,
    pub total_held_time: u64,
    pub is_active: bool,
}

impl WakeLockInfo {
    fn new(name: String, pid: i32, now: u64) -> Self {
        Self {
            name,
            pid,
            active_count: 1,
            active_since: now,
            last_change: now,
            max_held_time: 0,
            total_held_time: 0,
            is_active: true,
        }
    }

    fn on_acquire(&mut self, now: u64) {
        self.is_active = true;
        self.active_since = now;
        self.active_count += 1;
        self.last_change = now;
    }

    fn on_release(&mut self, now: u64) {
        self.max_held_time = self.max_held_time.max(now.saturating_sub(self.active_since));
        self.total_held_time += now.saturating_sub(self.last_change);
        self.is_active = false;
        self.last_change = now;
    }

    // Accounts for an active entry as though released at `now`, without
    // flipping `is_active`.
    fn refresh(&mut self, now: u64) {
        if self.is_active {
            self.max_held_time = self.max_held_time.max(now.saturating_sub(self.active_since));
            self.total_held_time += now.saturating_sub(self.last_change);
            self.last_change = now;
        }
    }
}

type Key = (String, i32);

/// Thread-safe, capacity-bounded LRU table of [`WakeLockInfo`] keyed by
/// `(name, pid)`. All operations are O(1) expected and hold the internal
/// mutex only for the duration of a single call.
pub struct WakeLockStatsTable {
    inner: Mutex<LruCache<Key, WakeLockInfo>>,
}

impl WakeLockStatsTable {
    pub fn new(capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Inserts a new entry as MRU, or updates and promotes an existing
    /// one. Evicts the LRU entry on overflow, logging a warning exactly
    /// once per eviction.
    pub fn on_acquire(&self, name: &str, pid: i32, now_us: u64) {
        let mut table = self.inner.lock().unwrap();
        let key = (name.to_owned(), pid);

        if let Some(entry) = table.get_mut(&key) {
            entry.on_acquire(now_us);
            return;
        }

        if table.len() == table.cap().get() {
            if let Some((evicted_key, _)) = table.pop_lru() {
                log::warn!(
                    "wake-lock stats table at capacity, evicted ({:?}, {})",
                    evicted_key.0,
                    evicted_key.1
                );
            }
        }
        table.put(key.clone(), WakeLockInfo::new(key.0, key.1, now_us));
    }

    /// Accounts for a release. If the key was already evicted this is
    /// non-fatal and only logged at info.
    pub fn on_release(&self, name: &str, pid: i32, now_us: u64) {
        let mut table = self.inner.lock().unwrap();
        let key = (name.to_owned(), pid);
        match table.get_mut(&key) {
            Some(entry) => entry.on_release(now_us),
            None => log::info!(
                "wake-lock stats entry for ({name:?}, {pid}) not found, likely evicted"
            ),
        }
    }

    /// Accounts for every active entry as though released at `now_us`,
    /// without changing `is_active`. Used before a stats dump so that
    /// still-active entries report up-to-date totals.
    pub fn refresh(&self, now_us: u64) {
        let mut table = self.inner.lock().unwrap();
        for (_, entry) in table.iter_mut() {
            entry.refresh(now_us);
        }
    }

    /// Returns every entry, in MRU-first order.
    pub fn snapshot(&self) -> Vec<WakeLockInfo> {
        let table = self.inner.lock().unwrap();
        table.iter().map(|(_, v)| v.clone()).collect()
    }

    /// `refresh` then `snapshot`, for callers that don't need to control
    /// the refresh timing separately.
    pub fn refreshed_snapshot(&self, now_us: u64) -> Vec<WakeLockInfo> {
        self.refresh(now_us);
        self.snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_then_release_tracks_duration() {
        let table = WakeLockStatsTable::new(4);
        table.on_acquire("L", 100, 1_000);
        table.on_release("L", 100, 1_500);

        let snap = table.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].active_count, 1);
        assert!(!snap[0].is_active);
        assert_eq!(snap[0].total_held_time, 500);
        assert_eq!(snap[0].max_held_time, 500);
    }

    #[test]
    fn release_of_unknown_key_is_non_fatal() {
        let table = WakeLockStatsTable::new(4);
        table.on_release("ghost", 1, 10);
        assert!(table.is_empty());
    }

    #[test]
    fn lru_eviction_at_capacity() {
        let table = WakeLockStatsTable::new(1);
        table.on_acquire("A", 1, 0);
        table.on_acquire("B", 1, 1);

        let snap = table.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].name, "B");
    }

    #[test]
    fn repeated_acquire_promotes_to_mru_and_bumps_count() {
        let table = WakeLockStatsTable::new(2);
        table.on_acquire("A", 1, 0);
        table.on_acquire("B", 1, 1);
        table.on_acquire("A", 1, 2);

        let snap = table.snapshot();
        assert_eq!(snap[0].name, "A");
        assert_eq!(snap[0].active_count, 2);

        // "C" should evict "B" (the LRU one), not "A".
        table.on_acquire("C", 1, 3);
        let snap = table.snapshot();
        assert!(snap.iter().any(|e| e.name == "A"));
        assert!(snap.iter().any(|e| e.name == "C"));
        assert!(!snap.iter().any(|e| e.name == "B"));
    }
}
