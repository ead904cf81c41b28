/// Render configuration and upscale method selection

use crate::error::{Error, Result};

/// Pixels covered by one shading-rate texel, in both directions
///
/// The VRS image is always `ceil(width / 8) x ceil(height / 8)` and the
/// vendor kernel tiles with the same size.
pub const SHADING_RATE_TEXEL_SIZE: u32 = 8;

// ============================================================================
// UpscaleMethod
// ============================================================================

/// Path used to produce the output frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpscaleMethod {
    /// Render the high tier and composite it directly
    Native,
    /// Render the low tier and run the vendor spatial upscale kernel
    VendorSpatialUpscale,
    /// Render the low tier and run the two-pass sharpen upscale
    SharpenUpscale,
}

impl UpscaleMethod {
    /// Map the host's integer method index
    ///
    /// # Errors
    ///
    /// `InvalidResource` for any index other than 0, 1 or 2.
    pub fn from_index(index: i32) -> Result<Self> {
        match index {
            0 => Ok(UpscaleMethod::Native),
            1 => Ok(UpscaleMethod::VendorSpatialUpscale),
            2 => Ok(UpscaleMethod::SharpenUpscale),
            other => Err(Error::InvalidResource(format!("unknown upscale method index {}", other))),
        }
    }

    /// Host integer index of this method
    pub fn index(&self) -> i32 {
        match self {
            UpscaleMethod::Native => 0,
            UpscaleMethod::VendorSpatialUpscale => 1,
            UpscaleMethod::SharpenUpscale => 2,
        }
    }

    /// Whether the frame is rendered at the low tier and upscaled
    pub fn is_upscale(&self) -> bool {
        !matches!(self, UpscaleMethod::Native)
    }
}

// ============================================================================
// RenderConfig
// ============================================================================

/// Static configuration of the frame driver
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Initial surface width; tiers scale from the real swapchain size
    pub screen_width: u32,
    /// Initial surface height
    pub screen_height: u32,
    /// Low tier scale factor (upscale source)
    pub use_upscale: f32,
    /// High tier scale factor (native path and upscale target)
    pub no_upscale: f32,
    /// Sharpness of the contrast-adaptive sharpen pass
    pub sharpen_sharpness: f32,
    /// Sharpness handed to the vendor spatial upscaler
    pub spatial_sharpness: f32,
    /// Error sensitivity of the adaptive VRS kernel
    pub vrs_error_sensitivity: f32,
    /// Hand the reprojection matrix to the VRS kernel
    pub use_reprojection: bool,
    pub fov_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Clear color of the lighting and composite passes
    pub clear_color: [f32; 4],
    pub initial_method: UpscaleMethod,
    pub initial_vrs: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            screen_width: 1280,
            screen_height: 720,
            use_upscale: 0.4,
            no_upscale: 0.6,
            sharpen_sharpness: 0.4,
            spatial_sharpness: 0.2,
            vrs_error_sensitivity: 0.4,
            use_reprojection: true,
            fov_degrees: 60.0,
            z_near: 0.1,
            z_far: 64.0,
            clear_color: [0.025, 0.025, 0.025, 1.0],
            initial_method: UpscaleMethod::Native,
            initial_vrs: false,
        }
    }
}

impl RenderConfig {
    /// Check the configuration before any GPU object is created
    ///
    /// # Errors
    ///
    /// `InitializationFailed` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(Error::InitializationFailed(format!(
                "output size {}x{} is empty",
                self.screen_width, self.screen_height
            )));
        }
        for (name, factor) in [("use_upscale", self.use_upscale), ("no_upscale", self.no_upscale)] {
            if !(factor > 0.0 && factor <= 1.0) {
                return Err(Error::InitializationFailed(format!(
                    "{} must be in (0, 1], got {}",
                    name, factor
                )));
            }
        }
        for (name, sharpness) in [
            ("sharpen_sharpness", self.sharpen_sharpness),
            ("spatial_sharpness", self.spatial_sharpness),
        ] {
            if sharpness < 0.0 || sharpness.is_nan() {
                return Err(Error::InitializationFailed(format!(
                    "{} must not be negative, got {}",
                    name, sharpness
                )));
            }
        }
        if !(self.z_near > 0.0 && self.z_far > self.z_near) {
            return Err(Error::InitializationFailed(format!(
                "invalid depth range [{}, {}]",
                self.z_near, self.z_far
            )));
        }
        Ok(())
    }

    /// Output aspect ratio
    pub fn aspect_ratio(&self) -> f32 {
        self.screen_width as f32 / self.screen_height as f32
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
