/// Pass Graph
///
/// Owns the G-buffer and lighting render passes (shared by both tiers) and
/// the two tiers themselves. Any creation failure aborts the build.

use std::sync::Arc;

use crate::config::{RenderConfig, SHADING_RATE_TEXEL_SIZE};
use crate::error::Result;
use crate::frame_graph::{Tier, TierKind, TierExtent};
use crate::graphics_device::{
    GraphicsDevice, RenderPass, RenderPassDesc, AttachmentDesc, ShadingRateAttachmentDesc,
    SubpassDependency, SubpassRef, PipelineStages, AccessFlags, ImageLayout, LoadOp, StoreOp,
    TextureFormat, Extent2D,
};
use crate::engine_info;

pub const GBUFFER_PASS_LABEL: &str = "gbuffer";
pub const LIGHTING_PASS_LABEL: &str = "lighting";

pub struct PassGraph {
    gbuffer_pass: Arc<dyn RenderPass>,
    lighting_pass: Arc<dyn RenderPass>,
    extents: TierExtent,
    low: Tier,
    high: Tier,
}

impl PassGraph {
    /// G-buffer pass: four sampled color targets plus depth
    pub fn gbuffer_pass_desc(depth_format: TextureFormat) -> RenderPassDesc {
        let color = |format| AttachmentDesc::cleared(format, ImageLayout::ShaderReadOnly);
        RenderPassDesc {
            label: GBUFFER_PASS_LABEL.to_string(),
            color_attachments: vec![
                color(TextureFormat::R32G32B32A32_SFLOAT),
                color(TextureFormat::R8G8B8A8_UNORM),
                color(TextureFormat::R8G8B8A8_UNORM),
                color(TextureFormat::R8G8B8A8_UNORM),
            ],
            depth_attachment: Some(AttachmentDesc::cleared(depth_format, ImageLayout::DepthStencilReadOnly)),
            shading_rate_attachment: None,
            dependencies: vec![
                SubpassDependency {
                    src_subpass: SubpassRef::External,
                    dst_subpass: SubpassRef::Index(0),
                    src_stages: PipelineStages::FRAGMENT_SHADER,
                    dst_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                    src_access: AccessFlags::SHADER_READ,
                    dst_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
                    by_region: true,
                },
                SubpassDependency {
                    src_subpass: SubpassRef::Index(0),
                    dst_subpass: SubpassRef::External,
                    src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                    dst_stages: PipelineStages::FRAGMENT_SHADER,
                    src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
                    dst_access: AccessFlags::SHADER_READ,
                    by_region: true,
                },
            ],
        }
    }

    /// Lighting pass: one color target plus the 8x8 shading-rate attachment
    ///
    /// The shading-rate image is loaded (never cleared) so a VRS dispatch
    /// recorded before the pass is what the rasterizer sees.
    pub fn lighting_pass_desc() -> RenderPassDesc {
        let attachment_stages = PipelineStages::COLOR_ATTACHMENT_OUTPUT
            | PipelineStages::EARLY_FRAGMENT_TESTS
            | PipelineStages::LATE_FRAGMENT_TESTS;
        let attachment_access = AccessFlags::COLOR_ATTACHMENT_READ
            | AccessFlags::COLOR_ATTACHMENT_WRITE
            | AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
            | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;

        RenderPassDesc {
            label: LIGHTING_PASS_LABEL.to_string(),
            color_attachments: vec![AttachmentDesc::cleared(
                TextureFormat::R8G8B8A8_UNORM,
                ImageLayout::ShaderReadOnly,
            )],
            depth_attachment: None,
            shading_rate_attachment: Some(ShadingRateAttachmentDesc {
                attachment: AttachmentDesc {
                    format: TextureFormat::R8_UINT,
                    samples: 1,
                    load_op: LoadOp::Load,
                    store_op: StoreOp::DontCare,
                    initial_layout: ImageLayout::General,
                    final_layout: ImageLayout::ShadingRateAttachment,
                },
                texel_width: SHADING_RATE_TEXEL_SIZE,
                texel_height: SHADING_RATE_TEXEL_SIZE,
            }),
            dependencies: vec![
                SubpassDependency {
                    src_subpass: SubpassRef::External,
                    dst_subpass: SubpassRef::Index(0),
                    src_stages: PipelineStages::BOTTOM_OF_PIPE,
                    dst_stages: attachment_stages,
                    src_access: AccessFlags::MEMORY_READ,
                    dst_access: attachment_access,
                    by_region: true,
                },
                SubpassDependency {
                    src_subpass: SubpassRef::Index(0),
                    dst_subpass: SubpassRef::External,
                    src_stages: attachment_stages,
                    dst_stages: PipelineStages::BOTTOM_OF_PIPE,
                    src_access: attachment_access,
                    dst_access: AccessFlags::MEMORY_READ,
                    by_region: true,
                },
            ],
        }
    }

    /// Create both shared passes and both tiers for an output size
    ///
    /// `output` is the presented surface size; both tiers scale from it.
    pub fn build(device: &mut dyn GraphicsDevice, config: &RenderConfig, output: Extent2D) -> Result<Self> {
        let extents = TierExtent::for_output(config, output.width, output.height);

        let gbuffer_pass = device.create_render_pass(&Self::gbuffer_pass_desc(device.depth_format()))?;
        let lighting_pass = device.create_render_pass(&Self::lighting_pass_desc())?;

        let low = Tier::build(device, TierKind::Low, &extents, &gbuffer_pass, &lighting_pass)?;
        let high = Tier::build(device, TierKind::High, &extents, &gbuffer_pass, &lighting_pass)?;

        engine_info!(
            "sponza::PassGraph",
            "Pass graph ready: low {}x{}, high {}x{}",
            extents.low.width, extents.low.height,
            extents.high.width, extents.high.height
        );

        Ok(Self {
            gbuffer_pass,
            lighting_pass,
            extents,
            low,
            high,
        })
    }

    pub fn tier(&self, kind: TierKind) -> &Tier {
        match kind {
            TierKind::Low => &self.low,
            TierKind::High => &self.high,
        }
    }

    pub fn extents(&self) -> &TierExtent {
        &self.extents
    }

    pub fn gbuffer_pass(&self) -> &Arc<dyn RenderPass> {
        &self.gbuffer_pass
    }

    pub fn lighting_pass(&self) -> &Arc<dyn RenderPass> {
        &self.lighting_pass
    }
}

impl Drop for PassGraph {
    fn drop(&mut self) {
        self.low.destroy();
        self.high.destroy();
    }
}

#[cfg(test)]
#[path = "pass_graph_tests.rs"]
mod tests;
