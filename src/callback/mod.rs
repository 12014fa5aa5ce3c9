//! Callback registry (component F): death-linked wakeup and
//! per-wake-lock observers.
//!
//! Dispatch always copies the observer list under the collection's
//! mutex, releases the lock, then invokes observers, so an observer is
//! free to re-enter registration (or even unregister a peer) from
//! inside its own callback without deadlocking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Opaque identity assigned by the (out-of-scope) RPC layer to whatever
/// delivered a registration, used only to group observers for
/// death-linked cleanup. Not interpreted otherwise.
pub type PeerId = u64;

/// Observes the outcome of every suspend attempt.
pub trait WakeupObserver: Send + Sync {
    fn on_wakeup(&self, success: bool, reasons: &[String]);
}

/// Observes acquire/release edges for one wake-lock name.
pub trait WakeLockObserver: Send + Sync {
    /// `acquired = true` on the first acquire while no caller holds a
    /// lock of this name; `acquired = false` on the last release.
    /// Edge-triggered: intermediate re-acquisitions while another caller
    /// already holds a lock of the same name fire neither callback.
    fn on_edge(&self, name: &str, acquired: bool);
}

struct Entry<T: ?Sized> {
    peer: PeerId,
    observer: Arc<T>,
}

/// Holds both observer collections, each behind its own mutex.
#[derive(Default)]
pub struct CallbackRegistry {
    wakeup: Mutex<Vec<Entry<dyn WakeupObserver>>>,
    per_wakelock: Mutex<HashMap<String, Vec<Entry<dyn WakeLockObserver>>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a wakeup observer under `peer`. Returns `false` without
    /// side effects if this exact observer (by pointer identity) is
    /// already registered.
    pub fn register_wakeup(&self, peer: PeerId, observer: Arc<dyn WakeupObserver>) -> bool {
        let mut list = self.wakeup.lock().unwrap();
        if list.iter().any(|e| Arc::ptr_eq(&e.observer, &observer)) {
            return false;
        }
        list.push(Entry { peer, observer });
        true
    }

    /// Registers a per-wake-lock observer for `name` under `peer`.
    /// Returns `false` on an empty name or a duplicate `(observer,
    /// name)` pair.
    pub fn register_wakelock(
        &self,
        peer: PeerId,
        name: &str,
        observer: Arc<dyn WakeLockObserver>,
    ) -> bool {
        if name.is_empty() {
            return false;
        }
        let mut map = self.per_wakelock.lock().unwrap();
        let list = map.entry(name.to_owned()).or_default();
        if list.iter().any(|e| Arc::ptr_eq(&e.observer, &observer)) {
            return false;
        }
        list.push(Entry { peer, observer });
        true
    }

    /// Dispatches `(success, reasons)` to every registered wakeup
    /// observer. Unordered across observers.
    pub fn notify_wakeup(&self, success: bool, reasons: &[String]) {
        let snapshot: Vec<_> = {
            let list = self.wakeup.lock().unwrap();
            list.iter().map(|e| Arc::clone(&e.observer)).collect()
        };
        for observer in snapshot {
            observer.on_wakeup(success, reasons);
        }
    }

    /// Dispatches an acquire/release edge to every observer registered
    /// for `name`.
    pub fn notify_edge(&self, name: &str, acquired: bool) {
        let snapshot: Vec<_> = {
            let map = self.per_wakelock.lock().unwrap();
            map.get(name)
                .map(|list| list.iter().map(|e| Arc::clone(&e.observer)).collect())
                .unwrap_or_default()
        };
        for observer in snapshot {
            observer.on_edge(name, acquired);
        }
    }

    /// Removes every observer registered under `peer` from both
    /// collections.
    pub fn remove_peer(&self, peer: PeerId) {
        self.wakeup.lock().unwrap().retain(|e| e.peer != peer);

        let mut map = self.per_wakelock.lock().unwrap();
        for list in map.values_mut() {
            list.retain(|e| e.peer != peer);
        }
        map.retain(|_, list| !list.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWakeup(AtomicUsize);
    impl WakeupObserver for CountingWakeup {
        fn on_wakeup(&self, _success: bool, _reasons: &[String]) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn duplicate_wakeup_registration_is_rejected() {
        let registry = CallbackRegistry::new();
        let observer: Arc<dyn WakeupObserver> = Arc::new(CountingWakeup(AtomicUsize::new(0)));

        assert!(registry.register_wakeup(1, Arc::clone(&observer)));
        assert!(!registry.register_wakeup(1, Arc::clone(&observer)));
    }

    #[test]
    fn empty_name_registration_is_rejected() {
        struct Noop;
        impl WakeLockObserver for Noop {
            fn on_edge(&self, _name: &str, _acquired: bool) {}
        }
        let registry = CallbackRegistry::new();
        assert!(!registry.register_wakelock(1, "", Arc::new(Noop)));
    }

    #[test]
    fn peer_death_removes_both_collections() {
        let registry = CallbackRegistry::new();
        let wakeup_obs: Arc<dyn WakeupObserver> = Arc::new(CountingWakeup(AtomicUsize::new(0)));
        struct Noop;
        impl WakeLockObserver for Noop {
            fn on_edge(&self, _name: &str, _acquired: bool) {}
        }

        registry.register_wakeup(42, Arc::clone(&wakeup_obs));
        registry.register_wakelock(42, "L", Arc::new(Noop));

        registry.remove_peer(42);

        registry.notify_wakeup(true, &[]);
        let CountingWakeup(count) = &*wakeup_obs;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(registry.per_wakelock.lock().unwrap().is_empty());
    }

    #[test]
    fn reentrant_registration_during_dispatch_does_not_deadlock() {
        struct Reentrant {
            registry: Arc<CallbackRegistry>,
            fired: AtomicUsize,
        }
        impl WakeupObserver for Reentrant {
            fn on_wakeup(&self, success: bool, reasons: &[String]) {
                self.fired.fetch_add(1, Ordering::SeqCst);
                if self.fired.load(Ordering::SeqCst) == 1 {
                    let other: Arc<dyn WakeupObserver> =
                        Arc::new(CountingWakeup(AtomicUsize::new(0)));
                    self.registry.register_wakeup(2, other);
                }
                let _ = (success, reasons);
            }
        }

        let registry = Arc::new(CallbackRegistry::new());
        let observer: Arc<dyn WakeupObserver> = Arc::new(Reentrant {
            registry: Arc::clone(&registry),
            fired: AtomicUsize::new(0),
        });
        registry.register_wakeup(1, observer);

        registry.notify_wakeup(true, &[]);
        assert_eq!(registry.wakeup.lock().unwrap().len(), 2);
    }
}
