/*!
# Fusion Engine - Vulkan Backend

Vulkan implementation of the `fusion_engine` graphics device traits.

Bindings come from `ash`, window surfaces from `ash-window` and GPU memory
from `gpu-allocator`. Every object the device hands out keeps the shared
device context alive, so the core can drop them in any order.

```no_run
use std::sync::Arc;
use fusion_engine::fusion::device::{Config, GraphicsDevice};
use fusion_engine_renderer_vulkan::fusion::VulkanGraphicsDevice;

# fn run(window: &winit::window::Window) -> fusion_engine::fusion::Result<()> {
let device: Arc<dyn GraphicsDevice> = Arc::new(VulkanGraphicsDevice::new(window, &Config::default())?);
# Ok(())
# }
```
*/

mod debug;
mod vulkan_context;
mod vulkan_format;
mod vulkan_sync;
mod vulkan_surface;
mod vulkan_swapchain;
mod vulkan_texture;
mod vulkan_render_pass;
mod vulkan_frame_buffer;
mod vulkan_command_list;
mod vulkan_sampler;
mod vulkan_descriptor_set;
mod vulkan_pipeline;
mod vulkan_graphics_device;

pub use vulkan_graphics_device::VulkanGraphicsDevice;
pub use vulkan_surface::VulkanSurface;
pub use vulkan_swapchain::VulkanSwapchain;
pub use vulkan_texture::VulkanTexture;
pub use vulkan_command_list::{VulkanCommandList, VulkanCommandPool};
pub use vulkan_pipeline::{VulkanPipeline, VulkanPipelineLayout};

// Validation message counters
pub use debug::{validation_stats, ValidationStats};

/// Backend namespace, mirroring `fusion_engine::fusion`
pub mod fusion {
    pub use crate::vulkan_graphics_device::VulkanGraphicsDevice;
    pub use crate::debug::{validation_stats, ValidationStats};
}
