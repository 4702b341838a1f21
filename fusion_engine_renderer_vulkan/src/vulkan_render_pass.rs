/// RenderPass - Vulkan implementation of the RenderPass trait

use ash::vk;
use std::any::Any;
use std::sync::Arc;
use fusion_engine::fusion::Result;
use fusion_engine::fusion::device::{AttachmentReference, LoadOp, RenderPass, RenderPassDesc, StoreOp};
use fusion_engine::engine_bail;

use crate::vulkan_context::{vk_error, DeviceContext, SOURCE};
use crate::vulkan_format::{
    access_to_vk, format_to_vk, image_layout_to_vk, load_op_to_vk, pipeline_stages_to_vk,
    sample_count_to_vk, store_op_to_vk, subpass_to_vk,
};

/// Vulkan render pass
pub struct VulkanRenderPass {
    ctx: Arc<DeviceContext>,
    pub(crate) render_pass: vk::RenderPass,
    subpass_count: u32,
}

fn reference_to_vk(reference: &AttachmentReference) -> vk::AttachmentReference {
    vk::AttachmentReference::default()
        .attachment(reference.attachment)
        .layout(image_layout_to_vk(reference.layout))
}

/// Attachment slots of one subpass, kept alive while the create info borrows them
struct SubpassRefs {
    colors: Vec<vk::AttachmentReference>,
    resolves: Vec<vk::AttachmentReference>,
    depth: Option<vk::AttachmentReference>,
}

impl VulkanRenderPass {
    pub(crate) fn new(ctx: Arc<DeviceContext>, desc: &RenderPassDesc) -> Result<Self> {
        if desc.subpasses.is_empty() {
            engine_bail!(SOURCE, "Render pass needs at least one subpass");
        }

        let attachments: Vec<vk::AttachmentDescription> = desc
            .attachments
            .iter()
            .map(|attachment| {
                // Stencil follows depth for combined formats
                let (stencil_load, stencil_store) = if attachment.format.has_stencil() {
                    (attachment.load_op, attachment.store_op)
                } else {
                    (LoadOp::DontCare, StoreOp::DontCare)
                };
                vk::AttachmentDescription::default()
                    .format(format_to_vk(attachment.format))
                    .samples(sample_count_to_vk(attachment.samples))
                    .load_op(load_op_to_vk(attachment.load_op))
                    .store_op(store_op_to_vk(attachment.store_op))
                    .stencil_load_op(load_op_to_vk(stencil_load))
                    .stencil_store_op(store_op_to_vk(stencil_store))
                    .initial_layout(image_layout_to_vk(attachment.initial_layout))
                    .final_layout(image_layout_to_vk(attachment.final_layout))
            })
            .collect();

        let refs: Vec<SubpassRefs> = desc
            .subpasses
            .iter()
            .map(|subpass| SubpassRefs {
                colors: subpass.color_attachments.iter().map(reference_to_vk).collect(),
                resolves: subpass
                    .resolve_attachments
                    .iter()
                    .map(|resolve| match resolve {
                        Some(reference) => reference_to_vk(reference),
                        None => vk::AttachmentReference::default()
                            .attachment(vk::ATTACHMENT_UNUSED)
                            .layout(vk::ImageLayout::UNDEFINED),
                    })
                    .collect(),
                depth: subpass.depth_attachment.as_ref().map(reference_to_vk),
            })
            .collect();

        for (index, subpass) in refs.iter().enumerate() {
            if !subpass.resolves.is_empty() && subpass.resolves.len() != subpass.colors.len() {
                engine_bail!(
                    SOURCE,
                    "Subpass {} has {} resolve attachments for {} color attachments",
                    index,
                    subpass.resolves.len(),
                    subpass.colors.len()
                );
            }
        }

        let subpasses: Vec<vk::SubpassDescription> = refs
            .iter()
            .map(|subpass| {
                let mut description = vk::SubpassDescription::default()
                    .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                    .color_attachments(&subpass.colors);
                if !subpass.resolves.is_empty() {
                    description = description.resolve_attachments(&subpass.resolves);
                }
                if let Some(depth) = subpass.depth.as_ref() {
                    description = description.depth_stencil_attachment(depth);
                }
                description
            })
            .collect();

        let dependencies: Vec<vk::SubpassDependency> = desc
            .dependencies
            .iter()
            .map(|dependency| {
                let flags = if dependency.by_region {
                    vk::DependencyFlags::BY_REGION
                } else {
                    vk::DependencyFlags::empty()
                };
                vk::SubpassDependency::default()
                    .src_subpass(subpass_to_vk(dependency.src_subpass))
                    .dst_subpass(subpass_to_vk(dependency.dst_subpass))
                    .src_stage_mask(pipeline_stages_to_vk(dependency.src_stage))
                    .dst_stage_mask(pipeline_stages_to_vk(dependency.dst_stage))
                    .src_access_mask(access_to_vk(dependency.src_access))
                    .dst_access_mask(access_to_vk(dependency.dst_access))
                    .dependency_flags(flags)
            })
            .collect();

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe { ctx.device.create_render_pass(&create_info, None) }
            .map_err(|e| vk_error(e, "Failed to create render pass"))?;

        Ok(Self { ctx, render_pass, subpass_count: desc.subpasses.len() as u32 })
    }
}

impl RenderPass for VulkanRenderPass {
    fn subpass_count(&self) -> u32 {
        self.subpass_count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
