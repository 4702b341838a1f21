/// Viewport policy and resolved render area of a render stage

use glam::{IVec2, UVec2, Vec2};
use crate::graphics_device::{Extent2D, Rect2D};

/// How a render stage sizes itself relative to the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Factor applied to the base size
    pub scale: Vec2,
    /// Fixed base size, `None` follows the surface size
    pub size: Option<UVec2>,
    /// Top-left corner of the rendered area
    pub offset: IVec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { scale: Vec2::ONE, size: None, offset: IVec2::ZERO }
    }
}

impl Viewport {
    /// Full surface, no offset
    pub fn surface() -> Self {
        Self::default()
    }

    /// Fixed size, independent of the surface
    pub fn fixed(width: u32, height: u32) -> Self {
        Self { size: Some(UVec2::new(width, height)), ..Self::default() }
    }

    /// Surface size multiplied by `scale`
    pub fn scaled(scale: Vec2) -> Self {
        Self { scale, ..Self::default() }
    }

    pub fn with_offset(mut self, offset: IVec2) -> Self {
        self.offset = offset;
        self
    }

    /// Resolve the policy against the current surface size
    pub fn resolve(&self, surface: Extent2D) -> RenderArea {
        let base = self.size.unwrap_or(UVec2::new(surface.width, surface.height));
        let extent = (self.scale * base.as_vec2()).max(Vec2::ZERO).as_uvec2();
        RenderArea::new(extent, self.offset)
    }
}

/// Region of the framebuffer a stage renders to
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderArea {
    extent: UVec2,
    offset: IVec2,
    aspect_ratio: f32,
}

impl RenderArea {
    pub fn new(extent: UVec2, offset: IVec2) -> Self {
        let aspect_ratio = if extent.y == 0 { 0.0 } else { extent.x as f32 / extent.y as f32 };
        Self { extent, offset, aspect_ratio }
    }

    pub fn extent(&self) -> UVec2 {
        self.extent
    }

    pub fn offset(&self) -> IVec2 {
        self.offset
    }

    /// Width over height, 0 for an empty area
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn is_empty(&self) -> bool {
        self.extent.x == 0 || self.extent.y == 0
    }

    /// Size the attachments need to contain the offset area (at least 1x1)
    pub fn framebuffer_extent(&self) -> Extent2D {
        let end = (self.extent.as_ivec2() + self.offset).max(IVec2::ONE).as_uvec2();
        Extent2D::new(end.x, end.y)
    }

    /// The area as a rectangle for scissor and render pass begin
    pub fn rect(&self) -> Rect2D {
        Rect2D {
            x: self.offset.x,
            y: self.offset.y,
            width: self.extent.x,
            height: self.extent.y,
        }
    }
}
