//! Component A: the bounded LRU cache of live torrents and downloaders.

use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;

use crate::bag_id::BagId;
use crate::metrics::GatewayMetrics;
use crate::transport::{Downloader, TorrentHandle};

/// An active torrent/downloader pair owned exclusively by the [`BagCache`].
#[derive(Clone)]
pub struct CacheEntry {
    pub torrent: Arc<dyn TorrentHandle>,
    pub downloader: Arc<dyn Downloader>,
    pub bag_size: u64,
    pub last_used: Instant,
}

/// Bounded, LRU-ordered store of [`CacheEntry`] keyed by normalized [`BagId`].
///
/// A single `parking_lot::Mutex` guards the index. It is never held across an
/// `.await`: eviction closes the evicted entry's resources only after the
/// lock is released.
pub struct BagCache {
    inner: Mutex<LruCache<BagId, CacheEntry>>,
    metrics: Arc<GatewayMetrics>,
}

impl BagCache {
    pub fn new(max_entries: usize, metrics: Arc<GatewayMetrics>) -> Self {
        let capacity = std::num::NonZeroUsize::new(max_entries)
            .unwrap_or(std::num::NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            metrics,
        }
    }

    /// Looks up `bag_id`, bumping recency and `last_used` on hit.
    pub fn get(&self, bag_id: &BagId) -> Option<(Arc<dyn TorrentHandle>, Arc<dyn Downloader>)> {
        let mut guard = self.inner.lock();
        match guard.get_mut(bag_id) {
            Some(entry) => {
                entry.last_used = Instant::now();
                let result = (entry.torrent.clone(), entry.downloader.clone());
                drop(guard);
                self.metrics.cache_hits();
                Some(result)
            }
            None => {
                drop(guard);
                self.metrics.cache_misses();
                None
            }
        }
    }

    /// Inserts or replaces the entry for `bag_id`. If the cache was at
    /// capacity, the evicted entry's torrent is stopped and downloader
    /// closed *after* the lock is dropped.
    pub async fn set(
        &self,
        bag_id: BagId,
        torrent: Arc<dyn TorrentHandle>,
        downloader: Arc<dyn Downloader>,
        bag_size: u64,
    ) {
        let entry = CacheEntry {
            torrent,
            downloader,
            bag_size,
            last_used: Instant::now(),
        };
        let replaced = {
            let mut guard = self.inner.lock();
            // `push` (unlike `put`) hands back whatever entry it displaced,
            // whether that's the old value for this key or the LRU tail
            // evicted to make room -- `put` would drop it silently.
            let replaced = guard.push(bag_id, entry);
            self.metrics.set_active_torrents(guard.len());
            replaced
        };
        if let Some((evicted_id, entry)) = replaced {
            entry.torrent.stop().await;
            entry.downloader.close().await;
            if evicted_id != bag_id {
                self.metrics.cache_evicts();
            }
        }
    }

    /// Drains every entry and closes its resources outside the lock.
    pub async fn clear(&self) {
        let drained: Vec<CacheEntry> = {
            let mut guard = self.inner.lock();
            let entries = guard.iter().map(|(_, v)| v.clone()).collect();
            guard.clear();
            self.metrics.set_active_torrents(0);
            entries
        };
        for entry in drained {
            entry.torrent.stop().await;
            entry.downloader.close().await;
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}
