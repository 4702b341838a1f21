/// Content-addressed cache shared by the device object caches
///
/// Keys are hashed with `FxHasher` into buckets; a hit requires full key
/// equality, so hash collisions never alias two objects. The whole lookup,
/// including compilation on a miss, runs under one mutex: two threads asking
/// for the same key get the same object and the backend compiles it once.

use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use rustc_hash::{FxHashMap, FxHasher};
use crate::engine_trace;
use crate::error::Result;

pub struct ObjectCache<K, V> {
    /// Log name (e.g. "SamplerCache")
    name: &'static str,
    buckets: Mutex<FxHashMap<u64, Vec<(K, V)>>>,
}

fn hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

impl<K: Hash + Eq, V: Clone> ObjectCache<K, V> {
    pub fn new(name: &'static str) -> Self {
        Self { name, buckets: Mutex::new(FxHashMap::default()) }
    }

    /// Return the object cached for `key`, creating it on a miss
    ///
    /// A creation failure is returned as is and nothing is cached.
    pub fn get_or_create<F>(&self, key: K, create: F) -> Result<V>
    where
        F: FnOnce(&K) -> Result<V>,
    {
        let hash = hash_key(&key);
        let mut buckets = self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let bucket = buckets.entry(hash).or_default();

        if let Some((_, value)) = bucket.iter().find(|(cached, _)| *cached == key) {
            engine_trace!("fusion::cache", "{} hit (hash {:016x})", self.name, hash);
            return Ok(value.clone());
        }

        let value = create(&key)?;
        engine_trace!("fusion::cache", "{} miss, created entry (hash {:016x})", self.name, hash);
        bucket.push((key, value.clone()));
        Ok(value)
    }

    /// Number of distinct objects in the cache
    pub fn len(&self) -> usize {
        self.buckets
            .lock()
            .map(|buckets| buckets.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
