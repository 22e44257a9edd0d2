//! Component B: per-bag mutual exclusion so concurrent resolves collapse
//! into a single torrent-start + downloader-create.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::bag_id::BagId;

/// Holds the owned per-bag lock; releases it on drop.
pub struct SingleFlightGuard {
    _guard: OwnedMutexGuard<()>,
}

/// `DashMap`-backed registry of per-bag locks.
///
/// Entries are never removed except by an explicit [`SingleFlightRegistry::sweep`]
/// call, which the core never invokes automatically -- callers that want to
/// bound memory growth may schedule it themselves.
#[derive(Default)]
pub struct SingleFlightRegistry {
    locks: DashMap<BagId, Arc<Mutex<()>>>,
}

impl SingleFlightRegistry {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Acquires the per-bag lock, waiting out any in-flight resolver for the
    /// same `bag_id`.
    pub async fn lock_for(&self, bag_id: BagId) -> SingleFlightGuard {
        let lock = self
            .locks
            .entry(bag_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        SingleFlightGuard { _guard: guard }
    }

    /// Removes entries with no other outstanding reference. Not called by
    /// the core automatically.
    pub fn sweep(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn id(last: u8) -> BagId {
        let mut s = "0".repeat(63);
        s.push(char::from_digit(last as u32, 10).unwrap());
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn collapses_concurrent_waiters() {
        let registry = Arc::new(SingleFlightRegistry::new());
        let bag = id(7);
        let counter = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let registry = registry.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = registry.lock_for(bag).await;
                let prev = counter.fetch_add(1, Ordering::SeqCst);
                assert_eq!(prev, 0, "a second task entered while holding the guard");
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
    }

    #[tokio::test]
    async fn sweep_removes_unreferenced_locks() {
        let registry = SingleFlightRegistry::new();
        let bag = id(3);
        {
            let _guard = registry.lock_for(bag).await;
        }
        assert_eq!(registry.len(), 1);
        registry.sweep();
        assert_eq!(registry.len(), 0);
    }
}
