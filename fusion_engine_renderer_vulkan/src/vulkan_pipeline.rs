/// PipelineLayout and Pipeline - Vulkan implementations of the pipeline traits

use ash::vk;
use std::any::Any;
use std::ffi::CString;
use std::sync::Arc;
use fusion_engine::fusion::{Error, Result};
use fusion_engine::fusion::device::{
    GraphicsPipelineDesc, Pipeline, PipelineLayout, PipelineLayoutDesc, PushConstantRange, ShaderCode,
};
use fusion_engine::{engine_bail, engine_err};

use crate::vulkan_context::{vk_error, DeviceContext, SOURCE};
use crate::vulkan_descriptor_set::VulkanDescriptorSetLayout;
use crate::vulkan_format::{
    blend_to_vk, compare_op_to_vk, cull_mode_to_vk, format_to_vk, front_face_to_vk, input_rate_to_vk,
    polygon_mode_to_vk, sample_count_to_vk, shader_stages_to_vk, topology_to_vk,
};
use crate::vulkan_render_pass::VulkanRenderPass;

// ============================================================================
// Pipeline layout
// ============================================================================

pub struct VulkanPipelineLayout {
    ctx: Arc<DeviceContext>,
    pub(crate) layout: vk::PipelineLayout,
    /// Sorted by offset
    push_constants: Vec<PushConstantRange>,
}

impl VulkanPipelineLayout {
    pub(crate) fn new(ctx: Arc<DeviceContext>, desc: &PipelineLayoutDesc) -> Result<Self> {
        let set_layouts = desc
            .set_layouts
            .iter()
            .map(|layout| {
                layout
                    .as_any()
                    .downcast_ref::<VulkanDescriptorSetLayout>()
                    .map(|layout| layout.layout)
                    .ok_or_else(|| {
                        Error::InvalidResource("Descriptor set layout was not created by the Vulkan device".to_string())
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut push_constants = desc.push_constants.clone();
        push_constants.sort_by_key(|range| range.offset);

        let ranges: Vec<vk::PushConstantRange> = push_constants
            .iter()
            .map(|range| vk::PushConstantRange {
                stage_flags: shader_stages_to_vk(range.stages),
                offset: range.offset,
                size: range.size,
            })
            .collect();

        let create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&ranges);

        let layout = unsafe { ctx.device.create_pipeline_layout(&create_info, None) }
            .map_err(|e| vk_error(e, "Failed to create pipeline layout"))?;

        Ok(Self { ctx, layout, push_constants })
    }
}

impl PipelineLayout for VulkanPipelineLayout {
    fn push_constants(&self) -> &[PushConstantRange] {
        &self.push_constants
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanPipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

// ============================================================================
// Graphics pipeline
// ============================================================================

/// Shader module alive for the duration of one pipeline compilation
struct ShaderModule<'a> {
    device: &'a ash::Device,
    module: vk::ShaderModule,
    entry_point: CString,
}

impl<'a> ShaderModule<'a> {
    fn new(device: &'a ash::Device, code: &ShaderCode) -> Result<Self> {
        if code.spirv.is_empty() {
            engine_bail!(SOURCE, "Shader '{}' has no SPIR-V code", code.entry_point);
        }
        let entry_point = CString::new(code.entry_point.as_str())
            .map_err(|e| engine_err!(SOURCE, "Invalid shader entry point '{}': {}", code.entry_point, e))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code.spirv);
        let module = unsafe { device.create_shader_module(&create_info, None) }
            .map_err(|e| vk_error(e, "Failed to create shader module"))?;

        Ok(Self { device, module, entry_point })
    }

    fn stage(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(stage)
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for ShaderModule<'_> {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Compiled graphics pipeline
pub struct VulkanPipeline {
    ctx: Arc<DeviceContext>,
    pub(crate) pipeline: vk::Pipeline,
    layout: Arc<dyn PipelineLayout>,
}

impl VulkanPipeline {
    pub(crate) fn new(ctx: Arc<DeviceContext>, desc: &GraphicsPipelineDesc) -> Result<Self> {
        let layout = desc
            .layout
            .as_any()
            .downcast_ref::<VulkanPipelineLayout>()
            .ok_or_else(|| Error::InvalidResource("Pipeline layout was not created by the Vulkan device".to_string()))?;
        let render_pass = desc
            .render_pass
            .as_any()
            .downcast_ref::<VulkanRenderPass>()
            .ok_or_else(|| Error::InvalidResource("Render pass was not created by the Vulkan device".to_string()))?;
        if desc.subpass >= desc.render_pass.subpass_count() {
            engine_bail!(
                SOURCE,
                "Pipeline targets subpass {} of a render pass with {} subpasses",
                desc.subpass,
                desc.render_pass.subpass_count()
            );
        }

        let vertex = ShaderModule::new(&ctx.device, &desc.vertex_shader)?;
        let fragment = desc
            .fragment_shader
            .as_ref()
            .map(|code| ShaderModule::new(&ctx.device, code))
            .transpose()?;

        let mut shader_stages = vec![vertex.stage(vk::ShaderStageFlags::VERTEX)];
        if let Some(fragment) = fragment.as_ref() {
            shader_stages.push(fragment.stage(vk::ShaderStageFlags::FRAGMENT));
        }

        // Vertex input state
        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc
            .vertex_layout
            .bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: input_rate_to_vk(binding.input_rate),
            })
            .collect();
        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
            .vertex_layout
            .attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.topology))
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic, only the counts matter here
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(polygon_mode_to_vk(desc.polygon_mode))
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(desc.cull_mode))
            .front_face(front_face_to_vk(desc.front_face))
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(sample_count_to_vk(desc.samples));

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth_test)
            .depth_write_enable(desc.depth_test && desc.depth_write)
            .depth_compare_op(compare_op_to_vk(desc.depth_compare))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let blend_attachments = vec![blend_to_vk(desc.blend); desc.color_attachment_count as usize];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let mut create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout.layout)
            .render_pass(render_pass.render_pass)
            .subpass(desc.subpass);
        if desc.depth_test {
            create_info = create_info.depth_stencil_state(&depth_stencil_state);
        }

        let pipelines = unsafe {
            ctx.device
                .create_graphics_pipelines(ctx.pipeline_cache, std::slice::from_ref(&create_info), None)
        }
        .map_err(|(_, e)| vk_error(e, "Failed to create graphics pipeline"))?;
        let pipeline = pipelines
            .first()
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Driver returned no graphics pipeline"))?;

        // Shader modules are released here, the pipeline keeps its own copy
        drop(shader_stages);
        drop(fragment);
        drop(vertex);

        Ok(Self { ctx, pipeline, layout: Arc::clone(&desc.layout) })
    }
}

impl Pipeline for VulkanPipeline {
    fn layout(&self) -> &Arc<dyn PipelineLayout> {
        &self.layout
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
        }
    }
}
