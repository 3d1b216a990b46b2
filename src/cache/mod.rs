//! Bounded, time-limited, concurrent LRU cache.
//!
//! Grounded on `pkg/haystack/src/cache/memory.rs`'s `MemoryStore`: a
//! `HashMap` index paired with an ordered map that tracks recency, reaped
//! lazily on access and eagerly on `size`/`for_each`. Generalized from that
//! single-purpose needle cache to an arbitrary `K -> V` cache with pluggable
//! retention, and guarded by one coarse `Mutex` per SPEC_FULL.md's
//! single-lock concurrency model instead of the teacher's unsynchronized
//! `&mut self` API (this cache is meant to be shared across threads).

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

/// How long a cached value is kept alive once nothing else references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// The cache itself keeps the value alive; it's evicted only by
    /// capacity pressure, `remove`, or expiry.
    Strong,
    /// The cache keeps only a weak handle. The value is evicted as soon as
    /// every other owner has dropped their `Arc`, which `LruCache` detects
    /// lazily on the entry's next access -- the closest stable-Rust analogue
    /// to a memory-pressure-reclaimable reference.
    Evictable,
}

enum Slot<V> {
    Strong(Arc<V>),
    Evictable(Weak<V>),
}

impl<V> Slot<V> {
    fn upgrade(&self) -> Option<Arc<V>> {
        match self {
            Slot::Strong(v) => Some(v.clone()),
            Slot::Evictable(w) => w.upgrade(),
        }
    }
}

struct Entry<V> {
    slot: Slot<V>,
    seq: u64,
    expires_at: Option<Instant>,
}

struct Inner<K, V> {
    capacity: usize,
    timeout: Option<Duration>,
    retention: Retention,
    index: HashMap<K, Entry<V>>,
    /// Recency order: smallest sequence number is least-recently-used.
    /// `put`/`get` both bump an entry's position by re-inserting it under a
    /// fresh sequence number, mirroring the teacher's
    /// `order: BTreeMap<SystemTime, NeedleKeys>`.
    order: BTreeMap<u64, K>,
    next_seq: u64,
}

/// Bounded + time-limited key-value cache, safe for concurrent use. Each
/// public operation takes the single internal lock for its full duration,
/// so callers never observe a partially-applied `put`.
pub struct LruCache<K, V> {
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// `capacity = 0` means unbounded. `timeout = None` means entries never
    /// expire on their own.
    pub fn new(capacity: usize, timeout: Option<Duration>, retention: Retention) -> Self {
        LruCache {
            inner: Mutex::new(Inner {
                capacity,
                timeout,
                retention,
                index: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Inserts `value`, evicting LRU order until back under capacity.
    /// Returns the `Arc` the cache will serve back on `get` -- in
    /// `Retention::Evictable` mode the caller must keep this (or a clone)
    /// alive itself, or the entry becomes eligible for reclamation
    /// immediately.
    pub fn put(&self, key: K, value: V) -> Arc<V> {
        let mut inner = self.inner.lock().unwrap();
        inner.reap_expired();

        if let Some(entry) = inner.index.remove(&key) {
            inner.order.remove(&entry.seq);
        }

        let arc = Arc::new(value);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let expires_at = inner.timeout.map(|d| Instant::now() + d);
        let slot = match inner.retention {
            Retention::Strong => Slot::Strong(arc.clone()),
            Retention::Evictable => Slot::Evictable(Arc::downgrade(&arc)),
        };
        inner.index.insert(
            key.clone(),
            Entry {
                slot,
                seq,
                expires_at,
            },
        );
        inner.order.insert(seq, key);
        log::trace!("cache insert, seq={}", seq);

        inner.evict_over_capacity();
        arc
    }

    /// Returns the cached value, promoting it to most-recently-used.
    /// Expired or reclaimed entries are removed and treated as a miss.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let mut inner = self.inner.lock().unwrap();
        inner.reap_expired();

        let old_seq = inner.index.get(key)?.seq;

        let value = match inner.index.get(key).and_then(|e| e.slot.upgrade()) {
            Some(v) => v,
            None => {
                inner.remove_key(key);
                return None;
            }
        };

        inner.order.remove(&old_seq);
        let new_seq = inner.next_seq;
        inner.next_seq += 1;
        if let Some(entry) = inner.index.get_mut(key) {
            entry.seq = new_seq;
        }
        inner.order.insert(new_seq, key.clone());

        Some(value)
    }

    pub fn remove(&self, key: &K) {
        let mut inner = self.inner.lock().unwrap();
        inner.remove_key(key);
    }

    /// Eagerly reaps expired and reclaimed entries, then reports the count.
    pub fn size(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.reap_expired();
        inner.reap_reclaimed();
        inner.index.len()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.index.clear();
        inner.order.clear();
    }

    /// Shrinks capacity, evicting oldest-accessed-first until `size <= new`.
    /// Growing capacity never evicts.
    pub fn set_capacity(&self, new_capacity: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.capacity = new_capacity;
        inner.evict_over_capacity();
    }

    pub fn set_timeout(&self, seconds: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.timeout = if seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(seconds))
        };
    }

    /// Visits every live entry in least-to-most-recently-used order, after
    /// eagerly reaping expired and reclaimed entries.
    pub fn for_each(&self, mut visitor: impl FnMut(&K, &Arc<V>)) {
        let mut inner = self.inner.lock().unwrap();
        inner.reap_expired();
        inner.reap_reclaimed();
        for key in inner.order.values() {
            if let Some(entry) = inner.index.get(key) {
                if let Some(value) = entry.slot.upgrade() {
                    visitor(key, &value);
                }
            }
        }
    }
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone,
{
    fn remove_key(&mut self, key: &K) {
        if let Some(entry) = self.index.remove(key) {
            self.order.remove(&entry.seq);
        }
    }

    fn reap_expired(&mut self) {
        let now = Instant::now();
        let expired: Vec<K> = self
            .index
            .iter()
            .filter(|(_, e)| e.expires_at.is_some_and(|t| t < now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            log::trace!("cache expire");
            self.remove_key(&key);
        }
    }

    fn reap_reclaimed(&mut self) {
        let reclaimed: Vec<K> = self
            .index
            .iter()
            .filter(|(_, e)| e.slot.upgrade().is_none())
            .map(|(k, _)| k.clone())
            .collect();
        for key in reclaimed {
            log::trace!("cache entry reclaimed");
            self.remove_key(&key);
        }
    }

    fn evict_over_capacity(&mut self) {
        if self.capacity == 0 {
            return;
        }
        while self.index.len() > self.capacity {
            let oldest_key = match self.order.iter().next() {
                Some((_, k)) => k.clone(),
                None => break,
            };
            log::trace!("cache evict over capacity");
            self.remove_key(&oldest_key);
        }
    }
}
