use std::{num::NonZeroUsize, sync::Mutex};

use lru::LruCache;
use metrics::counter;
use sha2::{Digest, Sha256};

use super::{
    METRIC_ENTRY_HIT, METRIC_ENTRY_MISS, METRIC_ENTRY_STORE, keys::EntryKey, lock::mutex_lock,
};

const SOURCE: &str = "cache::entries";

/// Hex SHA-256 of an entry's source text.
pub fn source_digest(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

struct Slot<V> {
    digest: String,
    value: V,
}

/// LRU of compiled entries. A hit requires the stored source digest to match
/// the current one, so edits on disk are picked up without explicit
/// invalidation.
pub struct EntryCache<V> {
    entries: Mutex<LruCache<EntryKey, Slot<V>>>,
}

impl<V: Clone> EntryCache<V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &EntryKey, digest: &str) -> Option<V> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");
        let fresh = entries.get(key).filter(|slot| slot.digest == digest);
        match fresh {
            Some(slot) => {
                counter!(METRIC_ENTRY_HIT).increment(1);
                Some(slot.value.clone())
            }
            None => {
                counter!(METRIC_ENTRY_MISS).increment(1);
                None
            }
        }
    }

    pub fn put(&self, key: EntryKey, digest: String, value: V) {
        mutex_lock(&self.entries, SOURCE, "put").put(key, Slot { digest, value });
        counter!(METRIC_ENTRY_STORE).increment(1);
    }

    pub fn clear(&self) {
        mutex_lock(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
