/// Command pools, one per (thread, queue)
///
/// Command pools are not thread safe: each thread records through its own
/// pool, created on first use. A pool whose command buffers are all gone and
/// that stayed unused for the purge interval is released.

use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use rustc_hash::FxHashMap;
use crate::engine_debug;
use crate::error::Result;
use crate::graphics_device::{CommandPool, GraphicsDevice, QueueType};

struct PoolEntry {
    pool: Arc<dyn CommandPool>,
    last_used: Instant,
}

pub struct CommandPools {
    device: Arc<dyn GraphicsDevice>,
    purge_interval: Duration,
    pools: Mutex<FxHashMap<(ThreadId, QueueType), PoolEntry>>,
}

impl CommandPools {
    pub fn new(device: Arc<dyn GraphicsDevice>, purge_interval: Duration) -> Self {
        Self { device, purge_interval, pools: Mutex::new(FxHashMap::default()) }
    }

    /// Pool of the calling thread for `queue`, created on first use
    pub fn get(&self, queue: QueueType) -> Result<Arc<dyn CommandPool>> {
        let key = (thread::current().id(), queue);
        let mut pools = self.pools.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(entry) = pools.get_mut(&key) {
            entry.last_used = Instant::now();
            return Ok(Arc::clone(&entry.pool));
        }

        let pool = self.device.create_command_pool(queue)?;
        engine_debug!("fusion::CommandPools", "Created {:?} command pool for thread {:?}", queue, key.0);
        pools.insert(key, PoolEntry { pool: Arc::clone(&pool), last_used: Instant::now() });
        Ok(pool)
    }

    /// Release pools no command buffer refers to and idle since the purge
    /// interval, returns how many were released
    pub fn purge(&self) -> usize {
        self.purge_at(Instant::now())
    }

    pub fn purge_at(&self, now: Instant) -> usize {
        let mut pools = self.pools.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = pools.len();
        pools.retain(|_, entry| {
            Arc::strong_count(&entry.pool) > 1
                || now.saturating_duration_since(entry.last_used) < self.purge_interval
        });
        let purged = before - pools.len();
        if purged > 0 {
            engine_debug!("fusion::CommandPools", "Purged {} idle command pools", purged);
        }
        purged
    }

    pub fn purge_interval(&self) -> Duration {
        self.purge_interval
    }

    pub fn len(&self) -> usize {
        self.pools.lock().map(|pools| pools.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
