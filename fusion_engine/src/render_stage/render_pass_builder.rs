/// Compilation of a render stage description into a `RenderPassDesc`
///
/// Pure functions: no device access, so the whole translation is unit
/// tested without a GPU. Attachments must be sorted with `binding == index`
/// (checked by `RenderStage::new`).

use crate::graphics_device::{
    AccessFlags, AttachmentDesc, AttachmentReference, ImageLayout, LoadOp, PipelineStageFlags,
    RenderPassDesc, SampleCount, StoreOp, SubpassDependency, SubpassDesc, SubpassRef, TextureFormat,
};
use crate::render_stage::{Attachment, AttachmentType, SubpassType};

/// Device and surface formats the description is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFormats {
    /// Swapchain format, inherited by `Undefined` image attachments
    pub surface: TextureFormat,
    /// Depth format (only read when the stage has a depth attachment)
    pub depth: TextureFormat,
    /// Sample count of multisampled attachments
    pub msaa: SampleCount,
}

/// Sample count an attachment is created with
///
/// The last binding of a stage is always single-sampled: it is the one that
/// multisampled attachments resolve into.
pub fn attachment_samples(attachment: &Attachment, last_binding: u32, msaa: SampleCount) -> SampleCount {
    if attachment.multisampled && attachment.binding != last_binding {
        msaa
    } else {
        SampleCount::S1
    }
}

/// Concrete pixel format of an attachment
pub fn attachment_format(attachment: &Attachment, formats: &ResolvedFormats) -> TextureFormat {
    match attachment.attachment_type {
        AttachmentType::Image if attachment.format == TextureFormat::Undefined => formats.surface,
        AttachmentType::Image => attachment.format,
        AttachmentType::Depth => formats.depth,
        AttachmentType::Swapchain => formats.surface,
    }
}

fn last_binding(attachments: &[Attachment]) -> u32 {
    attachments.last().map(|a| a.binding).unwrap_or(0)
}

/// Build the render pass description of a stage
pub fn build_render_pass_desc(
    attachments: &[Attachment],
    subpasses: &[SubpassType],
    formats: &ResolvedFormats,
) -> RenderPassDesc {
    let last = last_binding(attachments);
    let has_depth = attachments.iter().any(|a| a.attachment_type == AttachmentType::Depth);

    let attachment_descs = attachments
        .iter()
        .map(|attachment| AttachmentDesc {
            format: attachment_format(attachment, formats),
            samples: attachment_samples(attachment, last, formats.msaa),
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            initial_layout: ImageLayout::Undefined,
            final_layout: match attachment.attachment_type {
                AttachmentType::Image => attachment.layout,
                AttachmentType::Depth => ImageLayout::DepthStencilAttachment,
                AttachmentType::Swapchain => ImageLayout::PresentSrc,
            },
        })
        .collect();

    let subpass_descs = subpasses
        .iter()
        .map(|subpass| build_subpass(attachments, subpass, last, formats.msaa))
        .collect();

    RenderPassDesc {
        attachments: attachment_descs,
        subpasses: subpass_descs,
        dependencies: build_dependencies(subpasses.len() as u32, has_depth),
    }
}

fn build_subpass(attachments: &[Attachment], subpass: &SubpassType, last: u32, msaa: SampleCount) -> SubpassDesc {
    let mut desc = SubpassDesc::default();
    // (reference, flagged multisampled, effective samples)
    let mut colors: Vec<(AttachmentReference, bool, SampleCount)> = Vec::new();

    for &binding in &subpass.attachment_bindings {
        let Some(attachment) = attachments.get(binding as usize) else {
            continue;
        };
        if attachment.attachment_type == AttachmentType::Depth {
            desc.depth_attachment = Some(AttachmentReference {
                attachment: binding,
                layout: ImageLayout::DepthStencilAttachment,
            });
        } else {
            colors.push((
                AttachmentReference { attachment: binding, layout: ImageLayout::ColorAttachment },
                attachment.multisampled,
                attachment_samples(attachment, last, msaa),
            ));
        }
    }

    // A flagged but single-sampled last color attachment receives the
    // resolve of the first multisampled color attachment.
    let resolve = match colors.last() {
        Some(&(reference, true, SampleCount::S1)) if colors.len() > 1 => colors[..colors.len() - 1]
            .iter()
            .position(|&(_, _, samples)| samples != SampleCount::S1)
            .map(|source| (source, reference)),
        _ => None,
    };

    if let Some((source, target)) = resolve {
        colors.pop();
        desc.resolve_attachments = (0..colors.len())
            .map(|index| (index == source).then_some(target))
            .collect();
    }
    desc.color_attachments = colors.into_iter().map(|(reference, _, _)| reference).collect();
    desc
}

/// Dependencies chaining the subpasses in declaration order
///
/// External -> 0, i-1 -> i for every following subpass, and last -> External
/// so that the final writes are visible to whoever reads the attachments.
pub fn build_dependencies(subpass_count: u32, has_depth: bool) -> Vec<SubpassDependency> {
    if subpass_count == 0 {
        return Vec::new();
    }

    let (depth_stages, depth_access) = if has_depth {
        (
            PipelineStageFlags::EARLY_FRAGMENT_TESTS | PipelineStageFlags::LATE_FRAGMENT_TESTS,
            AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
    } else {
        (PipelineStageFlags::empty(), AccessFlags::empty())
    };
    let color_rw = AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE;

    let mut dependencies = Vec::with_capacity(subpass_count as usize + 1);
    dependencies.push(SubpassDependency {
        src_subpass: SubpassRef::External,
        dst_subpass: SubpassRef::Index(0),
        src_stage: PipelineStageFlags::BOTTOM_OF_PIPE,
        dst_stage: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | depth_stages,
        src_access: AccessFlags::MEMORY_READ,
        dst_access: color_rw | depth_access,
        by_region: true,
    });

    for index in 1..subpass_count {
        dependencies.push(SubpassDependency {
            src_subpass: SubpassRef::Index(index - 1),
            dst_subpass: SubpassRef::Index(index),
            src_stage: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            dst_stage: PipelineStageFlags::FRAGMENT_SHADER,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessFlags::SHADER_READ,
            by_region: true,
        });
    }

    dependencies.push(SubpassDependency {
        src_subpass: SubpassRef::Index(subpass_count - 1),
        dst_subpass: SubpassRef::External,
        src_stage: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_stage: PipelineStageFlags::BOTTOM_OF_PIPE,
        src_access: color_rw,
        dst_access: AccessFlags::MEMORY_READ,
        by_region: true,
    });

    dependencies
}

#[cfg(test)]
#[path = "render_pass_builder_tests.rs"]
mod tests;
