/*!
# Fusion Engine

Render core of the Fusion engine: render stages compiled into render passes,
content-addressed object caches, the per-frame controller and the subrenders
that record into each subpass.

The core only talks to the GPU through the `GraphicsDevice` trait family.
The Vulkan implementation lives in `fusion_engine_renderer_vulkan`.

## Architecture

- **RenderStage**: attachments + subpasses + viewport, compiled on demand
- **Object caches**: samplers, descriptor set layouts, pipeline layouts and
  pipelines, deduplicated by description
- **Graphics**: acquire / record / submit / present for every surface
- **Renderer**: ordered stages plus subrenders bound to (stage, subpass)
- **SyncObject**: semaphores and fences of the in-flight frame slots
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod render_stage;
pub mod cache;
pub mod sync;
pub mod subrender;
pub mod graphics;
pub mod descriptor;

// Main fusion namespace module
pub mod fusion {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine (logger registry)
    pub use crate::engine::Engine;

    // Frame controller
    pub use crate::graphics::Graphics;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend abstraction
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Render core: stages, subrenders, frame controller, sync
    pub mod render {
        pub use crate::render_stage::{
            Attachment, AttachmentType, Framebuffers, RenderArea, RenderStage, ResolvedFormats,
            SubpassType, Viewport,
        };
        pub use crate::subrender::{
            PipelineStage, RenderContext, Renderer, RendererHooks, Subrender, SubrenderHolder,
            SubrenderId,
        };
        pub use crate::graphics::{CommandBuffer, CommandPools, FrameState, GraphicsContext, SurfaceId};
        pub use crate::sync::{create_frame_sync, ImagesInFlight, SyncObject, MAX_FRAMES_IN_FLIGHT};
    }

    // Object caches
    pub mod cache {
        pub use crate::cache::*;
    }

    // Uniform and descriptor staging
    pub mod descriptor {
        pub use crate::descriptor::*;
    }
}

// Re-export math library at crate root
pub use glam;
