/// DescriptorSetLayout - Vulkan implementation of the DescriptorSetLayout trait

use ash::vk;
use rustc_hash::FxHashSet;
use std::any::Any;
use std::sync::Arc;
use fusion_engine::fusion::Result;
use fusion_engine::fusion::device::{DescriptorSetLayout, DescriptorSetLayoutBinding, DescriptorSetLayoutDesc};
use fusion_engine::engine_bail;

use crate::vulkan_context::{vk_error, DeviceContext, SOURCE};
use crate::vulkan_format::{descriptor_type_to_vk, set_layout_flags_to_vk, shader_stages_to_vk};

pub struct VulkanDescriptorSetLayout {
    ctx: Arc<DeviceContext>,
    pub(crate) layout: vk::DescriptorSetLayout,
    /// Sorted by binding index
    bindings: Vec<DescriptorSetLayoutBinding>,
}

impl VulkanDescriptorSetLayout {
    pub(crate) fn new(ctx: Arc<DeviceContext>, desc: &DescriptorSetLayoutDesc) -> Result<Self> {
        let mut seen = FxHashSet::default();
        for binding in &desc.bindings {
            if !seen.insert(binding.binding) {
                engine_bail!(SOURCE, "Descriptor binding {} declared twice", binding.binding);
            }
        }

        let mut bindings = desc.bindings.clone();
        bindings.sort_by_key(|binding| binding.binding);

        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|binding| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(binding.binding)
                    .descriptor_type(descriptor_type_to_vk(binding.descriptor_type))
                    .descriptor_count(binding.count)
                    .stage_flags(shader_stages_to_vk(binding.stages))
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::default()
            .flags(set_layout_flags_to_vk(desc.flags))
            .bindings(&vk_bindings);

        let layout = unsafe { ctx.device.create_descriptor_set_layout(&create_info, None) }
            .map_err(|e| vk_error(e, "Failed to create descriptor set layout"))?;

        Ok(Self { ctx, layout, bindings })
    }
}

impl DescriptorSetLayout for VulkanDescriptorSetLayout {
    fn bindings(&self) -> &[DescriptorSetLayoutBinding] {
        &self.bindings
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanDescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}
