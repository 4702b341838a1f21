/// Descriptor set layout cache
///
/// Binding order in the description is irrelevant: bindings are sorted by
/// index before hashing, so `{0, 1}` and `{1, 0}` share one layout.

use std::sync::Arc;
use crate::cache::ObjectCache;
use crate::error::Result;
use crate::graphics_device::{DescriptorSetLayout, DescriptorSetLayoutDesc, GraphicsDevice};

pub struct DescriptorLayoutCache {
    device: Arc<dyn GraphicsDevice>,
    cache: ObjectCache<DescriptorSetLayoutDesc, Arc<dyn DescriptorSetLayout>>,
}

impl DescriptorLayoutCache {
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self { device, cache: ObjectCache::new("DescriptorLayoutCache") }
    }

    pub fn create(&self, desc: &DescriptorSetLayoutDesc) -> Result<Arc<dyn DescriptorSetLayout>> {
        let mut key = desc.clone();
        key.bindings.sort_by_key(|b| b.binding);
        self.cache
            .get_or_create(key, |key| self.device.create_descriptor_set_layout(key))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
