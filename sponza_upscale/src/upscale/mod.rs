//! Upscale Backends
//!
//! Two interchangeable post-processors that read the low tier lighting
//! output and write the low tier's high-resolution upscale output. The
//! recorder picks one per rebuild from the `UpscaleMethod`.

mod sharpen;
mod spatial;

use std::sync::Arc;

pub use sharpen::{SharpenUpscale, SHARPEN_PASS_LABEL, EASU_INTERMEDIATE_LABEL};
pub use spatial::VendorSpatialUpscale;

use crate::asset::AssetResolver;
use crate::config::{RenderConfig, UpscaleMethod};
use crate::error::{Error, Result};
use crate::frame_graph::{PassGraph, TierKind};
use crate::graphics_device::{CommandList, GraphicsDevice, Rect2D, Texture};

/// A post-process stage producing the high-resolution image
pub trait UpscaleBackend: Send + Sync {
    /// Method this backend implements
    fn method(&self) -> UpscaleMethod;

    /// Image the composite pass samples afterwards
    fn output(&self) -> &Arc<dyn Texture>;

    /// Record the stage between the lighting and composite passes
    fn record(&self, cmd: &mut dyn CommandList) -> Result<()>;

    /// Full-screen draws recorded by one `record` call
    fn draw_count(&self) -> usize;
}

/// Input and output of both backends
pub(crate) struct UpscaleTargets {
    pub input: Arc<dyn Texture>,
    pub output: Arc<dyn Texture>,
    pub input_region: Rect2D,
    pub output_region: Rect2D,
}

impl UpscaleTargets {
    pub fn from_passes(passes: &PassGraph) -> Result<Self> {
        let low = passes.tier(TierKind::Low);
        let high = passes.tier(TierKind::High);
        let output = low.upscale_output.as_ref().ok_or_else(|| {
            Error::InvalidResource("low tier upscale output missing".to_string())
        })?;
        Ok(Self {
            input: low.light_color.texture()?.clone(),
            output: output.texture()?.clone(),
            input_region: Rect2D::full(low.extent),
            output_region: Rect2D::full(high.extent),
        })
    }
}

/// Both backends, built once at prepare time
pub struct UpscaleBackends {
    spatial: VendorSpatialUpscale,
    sharpen: SharpenUpscale,
}

impl UpscaleBackends {
    pub fn build(
        device: &mut dyn GraphicsDevice,
        assets: &dyn AssetResolver,
        passes: &PassGraph,
        config: &RenderConfig,
    ) -> Result<Self> {
        let spatial = VendorSpatialUpscale::build(device, UpscaleTargets::from_passes(passes)?, config)?;
        let sharpen = SharpenUpscale::build(device, assets, UpscaleTargets::from_passes(passes)?, config)?;
        Ok(Self { spatial, sharpen })
    }

    /// Backend for `method`, `None` on the native path
    pub fn get(&self, method: UpscaleMethod) -> Option<&dyn UpscaleBackend> {
        match method {
            UpscaleMethod::Native => None,
            UpscaleMethod::VendorSpatialUpscale => Some(&self.spatial),
            UpscaleMethod::SharpenUpscale => Some(&self.sharpen),
        }
    }
}

#[cfg(test)]
#[path = "upscale_tests.rs"]
mod tests;
