/// Graphics pipeline cache
///
/// The key covers shaders, fixed-function state, and the identity of the
/// layout and render pass. A stage that recompiles its render pass therefore
/// gets new pipelines; the old ones stay cached until the device goes away.

use std::sync::Arc;
use crate::cache::ObjectCache;
use crate::engine_debug;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, GraphicsPipelineDesc, Pipeline};

pub struct PipelineCache {
    device: Arc<dyn GraphicsDevice>,
    cache: ObjectCache<GraphicsPipelineDesc, Arc<dyn Pipeline>>,
}

impl PipelineCache {
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self { device, cache: ObjectCache::new("PipelineCache") }
    }

    pub fn create(&self, desc: &GraphicsPipelineDesc) -> Result<Arc<dyn Pipeline>> {
        self.cache.get_or_create(desc.clone(), |desc| {
            engine_debug!("fusion::cache", "Compiling graphics pipeline {:?}", desc);
            self.device.create_graphics_pipeline(desc)
        })
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
