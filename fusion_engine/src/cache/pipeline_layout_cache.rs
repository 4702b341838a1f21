/// Pipeline layout cache
///
/// Set layouts compare by identity, so they should come from the
/// `DescriptorLayoutCache`. Push constant ranges are sorted by offset.

use std::sync::Arc;
use crate::cache::ObjectCache;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, PipelineLayout, PipelineLayoutDesc};

pub struct PipelineLayoutCache {
    device: Arc<dyn GraphicsDevice>,
    cache: ObjectCache<PipelineLayoutDesc, Arc<dyn PipelineLayout>>,
}

impl PipelineLayoutCache {
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self { device, cache: ObjectCache::new("PipelineLayoutCache") }
    }

    pub fn create(&self, desc: &PipelineLayoutDesc) -> Result<Arc<dyn PipelineLayout>> {
        let mut key = desc.clone();
        key.push_constants.sort_by_key(|range| range.offset);
        self.cache
            .get_or_create(key, |key| self.device.create_pipeline_layout(key))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
