/// GraphicsContext - the device and everything shared across the render core
///
/// Passed explicitly to render stages, subrenders and hooks. Everything in
/// here is usable from any thread through `&GraphicsContext`.

use std::sync::Arc;
use crate::cache::{DescriptorLayoutCache, PipelineCache, PipelineLayoutCache, SamplerCache};
use crate::error::Result;
use crate::graphics::CommandPools;
use crate::graphics_device::{CommandPool, Config, GraphicsDevice, QueueType, SampleCount};

pub struct GraphicsContext {
    config: Config,
    pipeline_layouts: PipelineLayoutCache,
    descriptor_layouts: DescriptorLayoutCache,
    samplers: SamplerCache,
    pipelines: PipelineCache,
    command_pools: CommandPools,
    device: Arc<dyn GraphicsDevice>,
}

impl GraphicsContext {
    pub fn new(device: Arc<dyn GraphicsDevice>, config: Config) -> Self {
        Self {
            pipeline_layouts: PipelineLayoutCache::new(Arc::clone(&device)),
            descriptor_layouts: DescriptorLayoutCache::new(Arc::clone(&device)),
            samplers: SamplerCache::new(Arc::clone(&device)),
            pipelines: PipelineCache::new(Arc::clone(&device)),
            command_pools: CommandPools::new(Arc::clone(&device), config.command_pool_purge_interval),
            config,
            device,
        }
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline_layouts(&self) -> &PipelineLayoutCache {
        &self.pipeline_layouts
    }

    pub fn descriptor_layouts(&self) -> &DescriptorLayoutCache {
        &self.descriptor_layouts
    }

    pub fn samplers(&self) -> &SamplerCache {
        &self.samplers
    }

    pub fn pipelines(&self) -> &PipelineCache {
        &self.pipelines
    }

    pub fn command_pools(&self) -> &CommandPools {
        &self.command_pools
    }

    /// Command pool of the calling thread
    pub fn command_pool(&self, queue: QueueType) -> Result<Arc<dyn CommandPool>> {
        self.command_pools.get(queue)
    }

    /// Sample count of multisampled attachments (device limit capped by config)
    pub fn msaa_samples(&self) -> SampleCount {
        self.device.msaa_samples().min(self.config.max_msaa_samples)
    }
}
