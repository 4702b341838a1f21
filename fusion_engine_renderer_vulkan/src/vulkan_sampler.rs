/// Sampler - Vulkan implementation of the Sampler trait
///
/// Deduplication happens in the core `SamplerCache`; every call here
/// creates a new VkSampler.

use ash::vk;
use std::any::Any;
use std::sync::Arc;
use fusion_engine::fusion::Result;
use fusion_engine::fusion::device::{Sampler, SamplerDesc};

use crate::vulkan_context::{vk_error, DeviceContext};
use crate::vulkan_format::{address_mode_to_vk, border_color_to_vk, compare_op_to_vk, filter_to_vk, mipmap_mode_to_vk};

pub struct VulkanSampler {
    ctx: Arc<DeviceContext>,
    pub(crate) sampler: vk::Sampler,
    desc: SamplerDesc,
}

impl VulkanSampler {
    pub(crate) fn new(ctx: Arc<DeviceContext>, desc: &SamplerDesc) -> Result<Self> {
        let mut create_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter_to_vk(desc.mag_filter))
            .min_filter(filter_to_vk(desc.min_filter))
            .mipmap_mode(mipmap_mode_to_vk(desc.mipmap_mode))
            .address_mode_u(address_mode_to_vk(desc.address_mode_u))
            .address_mode_v(address_mode_to_vk(desc.address_mode_v))
            .address_mode_w(address_mode_to_vk(desc.address_mode_w))
            .mip_lod_bias(desc.mip_lod_bias)
            .min_lod(desc.min_lod)
            .max_lod(desc.max_lod)
            .border_color(border_color_to_vk(desc.border_color))
            .unnormalized_coordinates(desc.unnormalized_coordinates);

        if let Some(max_anisotropy) = desc.max_anisotropy {
            create_info = create_info.anisotropy_enable(true).max_anisotropy(max_anisotropy);
        }
        if let Some(compare) = desc.compare {
            create_info = create_info.compare_enable(true).compare_op(compare_op_to_vk(compare));
        }

        let sampler = unsafe { ctx.device.create_sampler(&create_info, None) }
            .map_err(|e| vk_error(e, "Failed to create sampler"))?;

        Ok(Self { ctx, sampler, desc: *desc })
    }
}

impl Sampler for VulkanSampler {
    fn desc(&self) -> &SamplerDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSampler {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_sampler(self.sampler, None);
        }
    }
}
