/// CommandPool and CommandList - Vulkan implementations of the recording traits
///
/// A command list keeps its pool alive; the pool is destroyed with the last
/// list allocated from it.

use ash::vk;
use std::any::Any;
use std::sync::{Arc, Mutex};
use fusion_engine::fusion::{Error, Result};
use fusion_engine::fusion::device::{
    ClearValue, CommandList, CommandPool, Framebuffer, Pipeline, PipelineLayout, QueueType, Rect2D,
    RenderPass, ShaderStageFlags, Viewport,
};

use crate::vulkan_context::{vk_error, DeviceContext};
use crate::vulkan_format::shader_stages_to_vk;
use crate::vulkan_frame_buffer::VulkanFramebuffer;
use crate::vulkan_pipeline::{VulkanPipeline, VulkanPipelineLayout};
use crate::vulkan_render_pass::VulkanRenderPass;

/// Owned VkCommandPool
///
/// Allocation and freeing go through the mutex; recording is the owning
/// thread's business.
struct PoolHandle {
    ctx: Arc<DeviceContext>,
    pool: Mutex<vk::CommandPool>,
}

impl Drop for PoolHandle {
    fn drop(&mut self) {
        if let Ok(pool) = self.pool.get_mut() {
            unsafe {
                self.ctx.device.destroy_command_pool(*pool, None);
            }
        }
    }
}

/// Vulkan command pool
pub struct VulkanCommandPool {
    handle: Arc<PoolHandle>,
    queue_type: QueueType,
}

impl VulkanCommandPool {
    pub(crate) fn new(ctx: Arc<DeviceContext>, queue_type: QueueType) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(ctx.queue_family(queue_type))
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool = unsafe { ctx.device.create_command_pool(&create_info, None) }
            .map_err(|e| vk_error(e, "Failed to create command pool"))?;
        Ok(Self { handle: Arc::new(PoolHandle { ctx, pool: Mutex::new(pool) }), queue_type })
    }
}

impl CommandPool for VulkanCommandPool {
    fn allocate(&self) -> Result<Box<dyn CommandList>> {
        let pool = self
            .handle
            .pool
            .lock()
            .map_err(|_| Error::BackendError("Command pool mutex poisoned".to_string()))?;
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.handle.ctx.device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| vk_error(e, "Failed to allocate command buffer"))?;
        let command_buffer = buffers
            .first()
            .copied()
            .ok_or_else(|| Error::BackendError("Driver returned no command buffer".to_string()))?;
        drop(pool);

        Ok(Box::new(VulkanCommandList {
            pool: Arc::clone(&self.handle),
            command_buffer,
            is_recording: false,
            in_render_pass: false,
        }))
    }

    fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Vulkan command list implementation
pub struct VulkanCommandList {
    pool: Arc<PoolHandle>,
    command_buffer: vk::CommandBuffer,
    is_recording: bool,
    in_render_pass: bool,
}

impl VulkanCommandList {
    /// Get the underlying Vulkan command buffer
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    fn device(&self) -> &ash::Device {
        &self.pool.ctx.device
    }

    fn check_recording(&self) -> Result<()> {
        if self.is_recording {
            Ok(())
        } else {
            Err(Error::BackendError("Command list not recording".to_string()))
        }
    }

    fn check_in_render_pass(&self) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            Ok(())
        } else {
            Err(Error::BackendError("Not inside a render pass".to_string()))
        }
    }
}

impl CommandList for VulkanCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            return Err(Error::BackendError("Command list already recording".to_string()));
        }

        unsafe {
            self.device()
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| vk_error(e, "Failed to reset command buffer"))?;

            let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device()
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| vk_error(e, "Failed to begin command buffer"))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Render pass not ended before ending command list".to_string()));
        }

        unsafe { self.device().end_command_buffer(self.command_buffer) }
            .map_err(|e| vk_error(e, "Failed to end command buffer"))?;
        self.is_recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.is_recording
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        render_area: Rect2D,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Already inside a render pass".to_string()));
        }

        let vk_render_pass = render_pass
            .as_any()
            .downcast_ref::<VulkanRenderPass>()
            .ok_or_else(|| Error::InvalidResource("Render pass was not created by the Vulkan device".to_string()))?;
        let vk_framebuffer = framebuffer
            .as_any()
            .downcast_ref::<VulkanFramebuffer>()
            .ok_or_else(|| Error::InvalidResource("Framebuffer was not created by the Vulkan device".to_string()))?;

        let vk_clear_values: Vec<vk::ClearValue> = clear_values
            .iter()
            .map(|value| match value {
                ClearValue::Color(color) => vk::ClearValue { color: vk::ClearColorValue { float32: *color } },
                ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue { depth: *depth, stencil: *stencil },
                },
            })
            .collect();

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: render_area.x, y: render_area.y },
                extent: vk::Extent2D { width: render_area.width, height: render_area.height },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.device()
                .cmd_begin_render_pass(self.command_buffer, &begin_info, vk::SubpassContents::INLINE);
        }
        self.in_render_pass = true;
        Ok(())
    }

    fn next_subpass(&mut self) -> Result<()> {
        self.check_in_render_pass()?;
        unsafe {
            self.device().cmd_next_subpass(self.command_buffer, vk::SubpassContents::INLINE);
        }
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.check_in_render_pass()?;
        unsafe {
            self.device().cmd_end_render_pass(self.command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.check_recording()?;
        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);
        unsafe {
            self.device().cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.check_recording()?;
        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });
        unsafe {
            self.device().cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.check_recording()?;
        let vk_pipeline = pipeline
            .as_any()
            .downcast_ref::<VulkanPipeline>()
            .ok_or_else(|| Error::InvalidResource("Pipeline was not created by the Vulkan device".to_string()))?;
        unsafe {
            self.device()
                .cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::GRAPHICS, vk_pipeline.pipeline);
        }
        Ok(())
    }

    fn push_constants(
        &mut self,
        layout: &Arc<dyn PipelineLayout>,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.check_recording()?;
        let vk_layout = layout
            .as_any()
            .downcast_ref::<VulkanPipelineLayout>()
            .ok_or_else(|| Error::InvalidResource("Pipeline layout was not created by the Vulkan device".to_string()))?;
        unsafe {
            self.device().cmd_push_constants(
                self.command_buffer,
                vk_layout.layout,
                shader_stages_to_vk(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<()> {
        self.check_in_render_pass()?;
        unsafe {
            self.device()
                .cmd_draw(self.command_buffer, vertex_count, instance_count, first_vertex, first_instance);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for VulkanCommandList {
    fn drop(&mut self) {
        if let Ok(pool) = self.pool.pool.lock() {
            unsafe {
                self.pool.ctx.device.free_command_buffers(*pool, &[self.command_buffer]);
            }
        }
    }
}
