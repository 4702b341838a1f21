/// Sampler cache - one sampler per distinct `SamplerDesc`

use std::sync::Arc;
use crate::cache::ObjectCache;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, Sampler, SamplerDesc};

pub struct SamplerCache {
    device: Arc<dyn GraphicsDevice>,
    cache: ObjectCache<SamplerDesc, Arc<dyn Sampler>>,
}

impl SamplerCache {
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self { device, cache: ObjectCache::new("SamplerCache") }
    }

    /// Get the sampler matching `desc`, creating it on first use
    pub fn create(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>> {
        self.cache.get_or_create(*desc, |desc| self.device.create_sampler(desc))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
