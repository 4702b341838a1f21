/// RenderStage - attachments grouped into subpasses, compiled on demand
///
/// A stage is described once (attachments, subpasses, viewport) and built
/// lazily against each surface it renders to. Per surface it keeps a render
/// area, an optional depth image, one framebuffer per swapchain image and the
/// named outputs published as descriptors. The render pass itself is shared
/// by every surface.

use std::sync::Arc;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::error::{Error, Result};
use crate::graphics::{GraphicsContext, SurfaceId};
use crate::graphics_device::{
    AttachmentTextureDesc, ClearValue, Framebuffer, RenderPass, Swapchain, Texture, TextureFormat,
    TextureUsage,
};
use crate::render_stage::render_pass_builder::{attachment_samples, build_render_pass_desc, ResolvedFormats};
use crate::render_stage::{Attachment, AttachmentType, Framebuffers, RenderArea, SubpassType, Viewport};
use crate::{engine_debug, engine_error};

/// Build state of a stage for one surface
#[derive(Default)]
struct StageTarget {
    render_area: RenderArea,
    out_of_date: bool,
    depth: Option<Arc<dyn Texture>>,
    framebuffers: Option<Framebuffers>,
    descriptors: FxHashMap<String, Arc<dyn Texture>>,
}

pub struct RenderStage {
    attachments: Vec<Attachment>,
    subpasses: Vec<SubpassType>,
    viewport: Viewport,

    names: FxHashMap<String, u32>,
    depth_binding: Option<u32>,
    swapchain_binding: Option<u32>,
    clear_values: Vec<ClearValue>,
    subpass_attachment_counts: Vec<u32>,
    subpass_multisampled: Vec<bool>,

    render_pass: Option<Arc<dyn RenderPass>>,
    render_pass_formats: Option<ResolvedFormats>,
    targets: FxHashMap<SurfaceId, StageTarget>,
    last_rebuilt: Option<SurfaceId>,
}

fn invalid(message: String) -> Error {
    engine_error!("fusion::RenderStage", "{}", message);
    Error::InvalidDescription(message)
}

impl RenderStage {
    /// Validate and store a stage description (no GPU work)
    ///
    /// Attachments and subpasses may be given in any order; their bindings
    /// must cover `0..n` without gaps. At most one `Depth` and one `Swapchain`
    /// attachment are allowed.
    pub fn new(
        mut attachments: Vec<Attachment>,
        mut subpasses: Vec<SubpassType>,
        viewport: Viewport,
    ) -> Result<Self> {
        if attachments.is_empty() {
            return Err(invalid("Render stage has no attachments".to_string()));
        }
        if subpasses.is_empty() {
            return Err(invalid("Render stage has no subpasses".to_string()));
        }

        attachments.sort_by_key(|a| a.binding);
        subpasses.sort_by_key(|s| s.binding);

        let mut names = FxHashMap::default();
        let mut depth_binding = None;
        let mut swapchain_binding = None;
        for (index, attachment) in attachments.iter().enumerate() {
            if attachment.binding != index as u32 {
                return Err(invalid(format!(
                    "Attachment '{}' has binding {}, expected {} (bindings must be unique and contiguous)",
                    attachment.name, attachment.binding, index
                )));
            }
            if names.insert(attachment.name.clone(), attachment.binding).is_some() {
                return Err(invalid(format!("Duplicate attachment name '{}'", attachment.name)));
            }
            match attachment.attachment_type {
                AttachmentType::Depth if depth_binding.is_some() => {
                    return Err(invalid(format!(
                        "Attachment '{}' is a second Depth attachment",
                        attachment.name
                    )));
                }
                AttachmentType::Depth => depth_binding = Some(attachment.binding),
                AttachmentType::Swapchain if swapchain_binding.is_some() => {
                    return Err(invalid(format!(
                        "Attachment '{}' is a second Swapchain attachment",
                        attachment.name
                    )));
                }
                AttachmentType::Swapchain => swapchain_binding = Some(attachment.binding),
                AttachmentType::Image => {}
            }
        }

        let mut subpass_attachment_counts = Vec::with_capacity(subpasses.len());
        let mut subpass_multisampled = Vec::with_capacity(subpasses.len());
        for (index, subpass) in subpasses.iter().enumerate() {
            if subpass.binding != index as u32 {
                return Err(invalid(format!(
                    "Subpass binding {} found, expected {} (bindings must be unique and contiguous)",
                    subpass.binding, index
                )));
            }
            let mut seen = FxHashSet::default();
            let mut count = 0;
            let mut multisampled = false;
            for &binding in &subpass.attachment_bindings {
                let Some(attachment) = attachments.get(binding as usize) else {
                    return Err(invalid(format!(
                        "Subpass {} references unknown attachment binding {}",
                        subpass.binding, binding
                    )));
                };
                if !seen.insert(binding) {
                    return Err(invalid(format!(
                        "Subpass {} references attachment binding {} twice",
                        subpass.binding, binding
                    )));
                }
                if attachment.attachment_type == AttachmentType::Image {
                    count += 1;
                    multisampled |= attachment.multisampled;
                }
            }
            subpass_attachment_counts.push(count);
            subpass_multisampled.push(multisampled);
        }

        let clear_values = attachments
            .iter()
            .map(|attachment| match attachment.attachment_type {
                AttachmentType::Depth => ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
                AttachmentType::Image | AttachmentType::Swapchain => ClearValue::Color(attachment.clear_color),
            })
            .collect();

        Ok(Self {
            attachments,
            subpasses,
            viewport,
            names,
            depth_binding,
            swapchain_binding,
            clear_values,
            subpass_attachment_counts,
            subpass_multisampled,
            render_pass: None,
            render_pass_formats: None,
            targets: FxHashMap::default(),
            last_rebuilt: None,
        })
    }

    // ===== BUILD =====

    /// Recompute the render area for a surface
    ///
    /// Marks the stage out of date for that surface when the area changed or
    /// nothing was built yet. The flag is only cleared by `rebuild`.
    pub fn update(&mut self, surface: SurfaceId, swapchain: &dyn Swapchain) {
        let area = self.viewport.resolve(swapchain.extent());
        let has_render_pass = self.render_pass.is_some();
        let target = self.targets.entry(surface).or_default();
        target.out_of_date |= !has_render_pass || target.framebuffers.is_none() || area != target.render_area;
        target.render_area = area;
    }

    /// (Re)build the depth image, render pass and framebuffers for a surface
    ///
    /// The render pass is compiled once and reused while the surface and
    /// depth formats stay the same. Any failure is returned as is; the stage
    /// stays out of date.
    pub fn rebuild(&mut self, ctx: &GraphicsContext, surface: SurfaceId, swapchain: &dyn Swapchain) -> Result<()> {
        self.update(surface, swapchain);
        let device = ctx.device();
        let render_area = self.targets.get(&surface).map(|t| t.render_area).unwrap_or_default();
        let extent = render_area.framebuffer_extent();

        let formats = ResolvedFormats {
            surface: swapchain.format(),
            depth: match self.depth_binding {
                Some(_) => device.depth_format()?,
                None => TextureFormat::Undefined,
            },
            msaa: ctx.msaa_samples(),
        };
        let last_binding = self.attachments.len() as u32 - 1;

        let depth = match self.depth_binding {
            Some(binding) => {
                let attachment = &self.attachments[binding as usize];
                Some(device.create_attachment_texture(&AttachmentTextureDesc {
                    name: attachment.name.clone(),
                    width: extent.width,
                    height: extent.height,
                    format: formats.depth,
                    usage: TextureUsage::DepthStencil,
                    samples: attachment_samples(attachment, last_binding, formats.msaa),
                })?)
            }
            None => None,
        };

        let render_pass = match (&self.render_pass, self.render_pass_formats) {
            (Some(render_pass), Some(built_with)) if built_with == formats => Arc::clone(render_pass),
            _ => {
                let desc = build_render_pass_desc(&self.attachments, &self.subpasses, &formats);
                let render_pass = device.create_render_pass(&desc).map_err(|e| {
                    engine_error!("fusion::RenderStage", "Render pass compilation failed: {}", e);
                    e
                })?;
                // Framebuffers of other surfaces refer to the previous pass
                let recompiled = self.render_pass.is_some();
                for (id, target) in self.targets.iter_mut() {
                    if recompiled && *id != surface {
                        target.out_of_date = true;
                    }
                }
                self.render_pass = Some(Arc::clone(&render_pass));
                self.render_pass_formats = Some(formats);
                render_pass
            }
        };

        let framebuffers = Framebuffers::new(
            &**device,
            &render_pass,
            &self.attachments,
            &formats,
            swapchain,
            depth.as_ref(),
            extent,
        )?;

        let mut descriptors = FxHashMap::default();
        for attachment in &self.attachments {
            let texture = match attachment.attachment_type {
                AttachmentType::Image => framebuffers.image(attachment.binding).cloned(),
                AttachmentType::Depth => depth.clone(),
                AttachmentType::Swapchain => None,
            };
            if let Some(texture) = texture {
                descriptors.insert(attachment.name.clone(), texture);
            }
        }

        engine_debug!(
            "fusion::RenderStage",
            "Rebuilt {} framebuffers at {}x{}",
            framebuffers.len(),
            extent.width,
            extent.height
        );

        let target = self.targets.entry(surface).or_default();
        target.depth = depth;
        target.framebuffers = Some(framebuffers);
        target.descriptors = descriptors;
        target.out_of_date = false;
        self.last_rebuilt = Some(surface);
        Ok(())
    }

    /// Drop everything built for a surface
    ///
    /// Named outputs then come from another surface that is still built.
    pub fn remove_surface(&mut self, surface: SurfaceId) {
        self.targets.remove(&surface);
        if self.last_rebuilt == Some(surface) {
            self.last_rebuilt = self
                .targets
                .iter()
                .find(|(_, target)| target.framebuffers.is_some())
                .map(|(id, _)| *id);
        }
    }

    // ===== VIEWPORT =====

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Change the viewport policy, returns whether it actually changed
    ///
    /// The new area is picked up by the next `update`.
    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        if self.viewport == viewport {
            return false;
        }
        self.viewport = viewport;
        true
    }

    /// Whether `surface` needs a rebuild (unknown surfaces always do)
    pub fn is_out_of_date(&self, surface: SurfaceId) -> bool {
        self.targets.get(&surface).map_or(true, |t| t.out_of_date)
    }

    pub fn render_area(&self, surface: SurfaceId) -> Option<RenderArea> {
        self.targets.get(&surface).map(|t| t.render_area)
    }

    // ===== OUTPUTS =====

    pub fn render_pass(&self) -> Option<&Arc<dyn RenderPass>> {
        self.render_pass.as_ref()
    }

    pub fn framebuffer(&self, surface: SurfaceId, image_index: u32) -> Option<&Arc<dyn Framebuffer>> {
        self.targets
            .get(&surface)
            .and_then(|t| t.framebuffers.as_ref())
            .and_then(|f| f.framebuffer(image_index))
    }

    /// Depth image built for a surface
    pub fn depth(&self, surface: SurfaceId) -> Option<&Arc<dyn Texture>> {
        self.targets.get(&surface).and_then(|t| t.depth.as_ref())
    }

    /// Named output of the most recently rebuilt surface
    pub fn descriptor(&self, name: &str) -> Option<Arc<dyn Texture>> {
        self.last_rebuilt.and_then(|surface| self.descriptor_for(surface, name))
    }

    /// Named output built for a given surface
    pub fn descriptor_for(&self, surface: SurfaceId, name: &str) -> Option<Arc<dyn Texture>> {
        self.targets.get(&surface).and_then(|t| t.descriptors.get(name).cloned())
    }

    /// Names of every published output of the most recently rebuilt surface
    pub fn descriptor_names(&self) -> Vec<String> {
        self.last_rebuilt
            .and_then(|surface| self.targets.get(&surface))
            .map(|t| t.descriptors.keys().cloned().collect())
            .unwrap_or_default()
    }

    // ===== DESCRIPTION =====

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn subpasses(&self) -> &[SubpassType] {
        &self.subpasses
    }

    pub fn subpass_count(&self) -> u32 {
        self.subpasses.len() as u32
    }

    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        self.names.get(name).map(|&binding| &self.attachments[binding as usize])
    }

    pub fn attachment_by_binding(&self, binding: u32) -> Option<&Attachment> {
        self.attachments.get(binding as usize)
    }

    pub fn has_depth(&self) -> bool {
        self.depth_binding.is_some()
    }

    pub fn has_swapchain(&self) -> bool {
        self.swapchain_binding.is_some()
    }

    /// Number of color image attachments written by a subpass
    pub fn attachment_count(&self, subpass: u32) -> u32 {
        self.subpass_attachment_counts.get(subpass as usize).copied().unwrap_or(0)
    }

    /// Whether a subpass writes a multisampled color image
    pub fn is_multisampled(&self, subpass: u32) -> bool {
        self.subpass_multisampled.get(subpass as usize).copied().unwrap_or(false)
    }

    /// One clear value per attachment, in binding order
    pub fn clear_values(&self) -> &[ClearValue] {
        &self.clear_values
    }
}

#[cfg(test)]
#[path = "render_stage_tests.rs"]
mod tests;
