/// Vendor GPU kernels (spatial upscale, adaptive VRS)
///
/// Both kernels are opaque: the core configures them once and records one
/// call per frame with a fixed input/output contract.

use std::sync::Arc;
use glam::Mat4;
use crate::error::Result;
use crate::graphics_device::{CommandList, Texture, TextureFormat, Extent2D, Rect2D};

// ============================================================================
// Spatial upscale
// ============================================================================

/// Creation parameters of the vendor spatial upscaler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialUpscaleDesc {
    pub format: TextureFormat,
    pub sharpness: f32,
    pub input_size: Extent2D,
    pub input_region: Rect2D,
    pub output_size: Extent2D,
    pub output_region: Rect2D,
}

/// Vendor spatial upscale kernel
pub trait SpatialUpscaler: Send + Sync {
    /// Record the upscale of `input` into `output`
    ///
    /// # Arguments
    ///
    /// * `cmd` - Command list in recording state, outside any render pass
    /// * `input` - Low-resolution color image (shader-read layout)
    /// * `output` - High-resolution color image
    fn record(
        &self,
        cmd: &mut dyn CommandList,
        input: &Arc<dyn Texture>,
        output: &Arc<dyn Texture>,
    ) -> Result<()>;
}

// ============================================================================
// Adaptive VRS
// ============================================================================

/// Creation parameters of one adaptive VRS dispatcher
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VrsDispatcherDesc {
    pub input_size: Extent2D,
    pub input_region: Rect2D,
    /// Pixels per shading-rate texel
    pub tile_size: u32,
    pub error_sensitivity: f32,
    pub flip: bool,
}

/// Inputs of one VRS dispatch
pub struct VrsDispatchDesc<'a> {
    /// Lighting color of the tier
    pub color: &'a Arc<dyn Texture>,
    /// G-buffer depth of the tier
    pub depth: &'a Arc<dyn Texture>,
    /// Shading-rate image written by the kernel
    pub shading_rate: &'a Arc<dyn Texture>,
    /// `previous_vp * inverse(current_vp)`, zero when the camera is not
    /// initialized, `None` when reprojection is disabled
    pub reprojection: Option<Mat4>,
}

/// Vendor adaptive VRS kernel
pub trait VrsDispatcher: Send + Sync {
    /// Record the shading-rate computation
    fn dispatch(&self, cmd: &mut dyn CommandList, desc: &VrsDispatchDesc<'_>) -> Result<()>;
}
