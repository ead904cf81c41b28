/// VRS Stage
///
/// One vendor adaptive-VRS dispatcher per tier. A dispatch reads the tier's
/// lighting output and depth and writes its shading-rate image, which the
/// lighting pass then consumes as its shading-rate attachment.

use glam::Mat4;

use crate::camera::Camera;
use crate::config::{RenderConfig, SHADING_RATE_TEXEL_SIZE};
use crate::error::Result;
use crate::frame_graph::{PassGraph, Tier, TierKind};
use crate::graphics_device::{
    GraphicsDevice, CommandList, VrsDispatcher, VrsDispatcherDesc, VrsDispatchDesc, ImageBarrier,
    PipelineStages, AccessFlags, ImageLayout, Rect2D,
};
use crate::engine_debug;

pub struct VrsStage {
    low: Box<dyn VrsDispatcher>,
    high: Box<dyn VrsDispatcher>,
    use_reprojection: bool,
    dispatch_count: usize,
}

impl VrsStage {
    /// Dispatcher configuration for one tier
    pub fn dispatcher_desc(tier: &Tier, config: &RenderConfig) -> VrsDispatcherDesc {
        VrsDispatcherDesc {
            input_size: tier.extent,
            input_region: Rect2D::full(tier.extent),
            tile_size: SHADING_RATE_TEXEL_SIZE,
            error_sensitivity: config.vrs_error_sensitivity,
            flip: false,
        }
    }

    pub fn build(device: &mut dyn GraphicsDevice, passes: &PassGraph, config: &RenderConfig) -> Result<Self> {
        let high = device.create_vrs_dispatcher(&Self::dispatcher_desc(passes.tier(TierKind::High), config))?;
        let low = device.create_vrs_dispatcher(&Self::dispatcher_desc(passes.tier(TierKind::Low), config))?;
        engine_debug!(
            "sponza::VrsStage",
            "VRS dispatchers ready (tile {}, sensitivity {}, reprojection {})",
            SHADING_RATE_TEXEL_SIZE, config.vrs_error_sensitivity, config.use_reprojection
        );
        Ok(Self {
            low,
            high,
            use_reprojection: config.use_reprojection,
            dispatch_count: 0,
        })
    }

    /// Matrix handed to the kernel
    ///
    /// `None` when reprojection is disabled. While either snapshot is still
    /// zero the result is the zero matrix, never identity: the kernel reads
    /// zero as "skip temporal blending".
    pub fn reprojection_matrix(use_reprojection: bool, camera: &Camera) -> Option<Mat4> {
        if !use_reprojection {
            return None;
        }
        let current = camera.current();
        let previous = camera.previous();
        if current.is_zero() || previous.is_zero() {
            return Some(Mat4::ZERO);
        }
        Some(previous.combined() * current.combined().inverse())
    }

    /// Record the shading-rate dispatch for `tier`
    pub fn dispatch(&mut self, cmd: &mut dyn CommandList, tier: &Tier, camera: &Camera) -> Result<()> {
        let dispatcher = match tier.kind {
            TierKind::Low => &self.low,
            TierKind::High => &self.high,
        };
        dispatcher.dispatch(cmd, &VrsDispatchDesc {
            color: tier.light_color.texture()?,
            depth: tier.depth.texture()?,
            shading_rate: tier.shading_rate.texture()?,
            reprojection: Self::reprojection_matrix(self.use_reprojection, camera),
        })?;
        self.dispatch_count += 1;
        Ok(())
    }

    /// Barrier making the shading-rate image usable by the lighting pass
    ///
    /// After a dispatch the kernel's storage writes are made visible; without
    /// one the image only moves to `General`, its contents are ignored by the
    /// `Keep` combiner.
    pub fn attachment_barrier(cmd: &mut dyn CommandList, tier: &Tier, dispatched: bool) -> Result<()> {
        let barrier = if dispatched {
            ImageBarrier {
                texture: tier.shading_rate.texture()?.clone(),
                src_stages: PipelineStages::COMPUTE_SHADER,
                dst_stages: PipelineStages::FRAGMENT_SHADING_RATE_ATTACHMENT,
                src_access: AccessFlags::SHADER_WRITE,
                dst_access: AccessFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_READ,
                old_layout: ImageLayout::General,
                new_layout: ImageLayout::General,
            }
        } else {
            ImageBarrier {
                texture: tier.shading_rate.texture()?.clone(),
                src_stages: PipelineStages::TOP_OF_PIPE,
                dst_stages: PipelineStages::FRAGMENT_SHADING_RATE_ATTACHMENT,
                src_access: AccessFlags::empty(),
                dst_access: AccessFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_READ,
                old_layout: ImageLayout::Undefined,
                new_layout: ImageLayout::General,
            }
        };
        cmd.image_barrier(&barrier)
    }

    /// Dispatches recorded since the stage was built
    pub fn dispatch_count(&self) -> usize {
        self.dispatch_count
    }

    pub fn uses_reprojection(&self) -> bool {
        self.use_reprojection
    }
}

#[cfg(test)]
#[path = "vrs_tests.rs"]
mod tests;
