/*!
# Sponza Upscale

Frame-graph orchestration for a deferred renderer that draws one scene at a
reduced internal resolution and reconstructs the full-resolution frame with a
selectable upscaler, optionally driven by variable-rate shading.

The crate is platform-agnostic: every GPU object is created through the
`GraphicsDevice` function table, which the bootstrap backend
(`sponza_upscale_vulkan`) implements.

## Architecture

- **Attachment Manager** / **Pass Graph**: offscreen targets and render passes for both resolution tiers
- **Pipeline Builder**: G-buffer, lighting and composite pipelines plus their binding groups
- **Upscale Backends**: sharpen (EASU + RCAS) and vendor spatial upscale
- **VRS Stage**: per-tier adaptive shading-rate dispatch
- **Command Recorder**: per swapchain image command lists for the selected path
- **Frame Driver**: lazy rebuild on mode change, acquire / submit / present, resize
- **Render Thread** / **Surface Registry**: one cancellable render loop per surface
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod config;
pub mod asset;
pub mod scene;
pub mod uniforms;
pub mod camera;
pub mod frame_graph;
pub mod pipeline_builder;
pub mod upscale;
pub mod vrs;
pub mod command_recorder;
pub mod frame_driver;
pub mod render_thread;
pub mod registry;

#[cfg(test)]
mod test_fixtures;

// Main sponza namespace module
pub mod sponza {
    // Error types
    pub use crate::error::{Error, Result};

    // Logger routing
    pub use crate::engine::Engine;

    // Device function table
    pub use crate::graphics_device::GraphicsDevice;

    // Top-level driver and host surface
    pub use crate::config::{RenderConfig, UpscaleMethod, SHADING_RATE_TEXEL_SIZE};
    pub use crate::frame_driver::{FrameDriver, FrameOutcome, ModeControl};
    pub use crate::registry::{SurfaceRegistry, SurfaceContext};
    pub use crate::render_thread::{CancellationToken, RenderThread, LoopControl};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device-level rendering types
    pub mod render {
        pub use crate::graphics_device::*;
    }

    // Frame graph (attachments, tiers, present targets)
    pub mod frame_graph {
        pub use crate::frame_graph::*;
    }

    // Pipelines, upscalers, VRS and recording
    pub mod pipeline {
        pub use crate::pipeline_builder::*;
        pub use crate::upscale::*;
        pub use crate::vrs::*;
        pub use crate::command_recorder::*;
    }

    // Camera and uniform blocks
    pub mod scene {
        pub use crate::camera::*;
        pub use crate::uniforms::*;
        pub use crate::scene::*;
        pub use crate::asset::*;
    }
}

// Re-export math library at crate root
pub use glam;
