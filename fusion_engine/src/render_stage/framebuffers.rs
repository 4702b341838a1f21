/// Framebuffers of a render stage, one per swapchain image
///
/// Owns the color images of the stage's `Image` attachments. The depth image
/// and the swapchain images are shared by every framebuffer.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    AttachmentTextureDesc, Extent2D, Framebuffer, FramebufferAttachment, FramebufferDesc,
    GraphicsDevice, RenderPass, Swapchain, Texture, TextureUsage,
};
use crate::render_stage::render_pass_builder::{attachment_format, attachment_samples, ResolvedFormats};
use crate::render_stage::{Attachment, AttachmentType};

pub struct Framebuffers {
    /// Color images indexed by binding (`None` for depth/swapchain bindings)
    images: Vec<Option<Arc<dyn Texture>>>,
    framebuffers: Vec<Arc<dyn Framebuffer>>,
    extent: Extent2D,
}

impl Framebuffers {
    pub fn new(
        device: &dyn GraphicsDevice,
        render_pass: &Arc<dyn RenderPass>,
        attachments: &[Attachment],
        formats: &ResolvedFormats,
        swapchain: &dyn Swapchain,
        depth: Option<&Arc<dyn Texture>>,
        extent: Extent2D,
    ) -> Result<Self> {
        let last_binding = attachments.last().map(|a| a.binding).unwrap_or(0);

        let mut images = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let image = match attachment.attachment_type {
                AttachmentType::Image => Some(device.create_attachment_texture(&AttachmentTextureDesc {
                    name: attachment.name.clone(),
                    width: extent.width,
                    height: extent.height,
                    format: attachment_format(attachment, formats),
                    usage: TextureUsage::SampledAndRenderTarget,
                    samples: attachment_samples(attachment, last_binding, formats.msaa),
                })?),
                AttachmentType::Depth | AttachmentType::Swapchain => None,
            };
            images.push(image);
        }

        let mut framebuffers = Vec::with_capacity(swapchain.image_count() as usize);
        for image_index in 0..swapchain.image_count() {
            let mut views = Vec::with_capacity(attachments.len());
            for (attachment, image) in attachments.iter().zip(&images) {
                let view = match (attachment.attachment_type, image, depth) {
                    (AttachmentType::Image, Some(image), _) => FramebufferAttachment::Texture(image),
                    (AttachmentType::Depth, _, Some(depth)) => FramebufferAttachment::Texture(depth),
                    (AttachmentType::Swapchain, _, _) => FramebufferAttachment::SwapchainImage { swapchain, image_index },
                    _ => crate::engine_bail!(
                        "fusion::RenderStage",
                        "No image for attachment '{}' (binding {})",
                        attachment.name,
                        attachment.binding
                    ),
                };
                views.push(view);
            }

            framebuffers.push(device.create_framebuffer(&FramebufferDesc {
                render_pass,
                attachments: views,
                width: extent.width,
                height: extent.height,
            })?);
        }

        Ok(Self { images, framebuffers, extent })
    }

    /// Color image of an `Image` attachment
    pub fn image(&self, binding: u32) -> Option<&Arc<dyn Texture>> {
        self.images.get(binding as usize).and_then(Option::as_ref)
    }

    pub fn framebuffer(&self, image_index: u32) -> Option<&Arc<dyn Framebuffer>> {
        self.framebuffers.get(image_index as usize)
    }

    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}
