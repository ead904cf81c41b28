use std::sync::Arc;

use crate::config::{RenderConfig, UpscaleMethod};
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, CommandList, SpatialUpscaler, SpatialUpscaleDesc, Texture, TextureFormat,
    ImageBarrier, PipelineStages, AccessFlags, ImageLayout,
};
use crate::upscale::{UpscaleBackend, UpscaleTargets};
use crate::engine_debug;

/// Vendor spatial upscale kernel with fixed regions
pub struct VendorSpatialUpscale {
    upscaler: Box<dyn SpatialUpscaler>,
    input: Arc<dyn Texture>,
    output: Arc<dyn Texture>,
}

impl VendorSpatialUpscale {
    pub(crate) fn build(
        device: &mut dyn GraphicsDevice,
        targets: UpscaleTargets,
        config: &RenderConfig,
    ) -> Result<Self> {
        let desc = SpatialUpscaleDesc {
            format: TextureFormat::R8G8B8A8_UNORM,
            sharpness: config.spatial_sharpness,
            input_size: targets.input_region.extent(),
            input_region: targets.input_region,
            output_size: targets.output_region.extent(),
            output_region: targets.output_region,
        };
        let upscaler = device.create_spatial_upscaler(&desc)?;
        engine_debug!(
            "sponza::SpatialUpscale",
            "Spatial upscaler {}x{} -> {}x{}, sharpness {}",
            desc.input_size.width, desc.input_size.height,
            desc.output_size.width, desc.output_size.height,
            desc.sharpness
        );
        Ok(Self {
            upscaler,
            input: targets.input,
            output: targets.output,
        })
    }
}

impl UpscaleBackend for VendorSpatialUpscale {
    fn method(&self) -> UpscaleMethod {
        UpscaleMethod::VendorSpatialUpscale
    }

    fn output(&self) -> &Arc<dyn Texture> {
        &self.output
    }

    fn record(&self, cmd: &mut dyn CommandList) -> Result<()> {
        self.upscaler.record(cmd, &self.input, &self.output)?;
        // Kernel writes are storage writes; the composite pass samples.
        // The kernel transitions its output itself and leaves it in General,
        // so that is the old layout here.
        cmd.image_barrier(&ImageBarrier {
            texture: self.output.clone(),
            src_stages: PipelineStages::COMPUTE_SHADER,
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            src_access: AccessFlags::SHADER_WRITE,
            dst_access: AccessFlags::SHADER_READ,
            old_layout: ImageLayout::General,
            new_layout: ImageLayout::ShaderReadOnly,
        })
    }

    fn draw_count(&self) -> usize {
        0
    }
}
