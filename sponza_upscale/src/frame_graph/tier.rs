/// Resolution tiers
///
/// Both tiers are allocated at prepare time so the recorder can switch
/// between the native and upscale paths without reallocating anything.

use std::sync::Arc;

use crate::config::RenderConfig;
use crate::error::Result;
use crate::frame_graph::Attachment;
use crate::graphics_device::{
    GraphicsDevice, RenderPass, Framebuffer, FramebufferDesc, TextureFormat, Extent2D,
};
use crate::engine_debug;

/// Which of the two parallel resolution configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierKind {
    /// Upscale source (`use_upscale` factor)
    Low,
    /// Native path and upscale target (`no_upscale` factor)
    High,
}

impl TierKind {
    pub fn label(&self) -> &'static str {
        match self {
            TierKind::Low => "low",
            TierKind::High => "high",
        }
    }
}

/// Sizes of both tiers for one output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierExtent {
    pub low: Extent2D,
    pub high: Extent2D,
}

impl TierExtent {
    /// `floor(output * factor)` per tier, never below one pixel
    pub fn for_output(config: &RenderConfig, width: u32, height: u32) -> Self {
        let scale = |factor: f32| {
            Extent2D::new(
                ((width as f32 * factor) as u32).max(1),
                ((height as f32 * factor) as u32).max(1),
            )
        };
        Self {
            low: scale(config.use_upscale),
            high: scale(config.no_upscale),
        }
    }

    pub fn get(&self, kind: TierKind) -> Extent2D {
        match kind {
            TierKind::Low => self.low,
            TierKind::High => self.high,
        }
    }
}

/// Every offscreen target of one tier plus the framebuffers binding them
pub struct Tier {
    pub kind: TierKind,
    pub extent: Extent2D,
    pub position: Attachment,
    pub normal: Attachment,
    pub albedo: Attachment,
    pub view_normal: Attachment,
    pub depth: Attachment,
    /// Lighting pass output
    pub light_color: Attachment,
    pub shading_rate: Attachment,
    /// High-tier sized upscale target, low tier only
    pub upscale_output: Option<Attachment>,
    pub gbuffer_framebuffer: Arc<dyn Framebuffer>,
    pub lighting_framebuffer: Arc<dyn Framebuffer>,
}

impl Tier {
    /// Allocate the tier's targets and bind them to the shared passes
    ///
    /// # Arguments
    ///
    /// * `kind` - Tier being built
    /// * `extents` - Sizes of both tiers (the low tier's upscale output is high-tier sized)
    /// * `gbuffer_pass` / `lighting_pass` - Render passes shared by both tiers
    pub fn build(
        device: &mut dyn GraphicsDevice,
        kind: TierKind,
        extents: &TierExtent,
        gbuffer_pass: &Arc<dyn RenderPass>,
        lighting_pass: &Arc<dyn RenderPass>,
    ) -> Result<Self> {
        let extent = extents.get(kind);
        let name = |target: &str| format!("{}_{}", kind.label(), target);

        let position = Attachment::color(device, &name("position"), TextureFormat::R32G32B32A32_SFLOAT, extent)?;
        let normal = Attachment::color(device, &name("normal"), TextureFormat::R8G8B8A8_UNORM, extent)?;
        let albedo = Attachment::color(device, &name("albedo"), TextureFormat::R8G8B8A8_UNORM, extent)?;
        let view_normal = Attachment::color(device, &name("view_normal"), TextureFormat::R8G8B8A8_UNORM, extent)?;
        let depth = Attachment::depth(device, &name("depth"), extent)?;
        let light_color = Attachment::color(device, &name("light_color"), TextureFormat::R8G8B8A8_UNORM, extent)?;
        let shading_rate = Attachment::shading_rate(device, &name("shading_rate"), extent)?;

        let upscale_output = match kind {
            TierKind::Low => Some(Attachment::color(
                device,
                &name("upscale_output"),
                TextureFormat::R8G8B8A8_UNORM,
                extents.high,
            )?),
            TierKind::High => None,
        };

        let gbuffer_framebuffer = device.create_framebuffer(&FramebufferDesc {
            render_pass: gbuffer_pass,
            color_attachments: vec![
                position.texture()?.clone(),
                normal.texture()?.clone(),
                albedo.texture()?.clone(),
                view_normal.texture()?.clone(),
            ],
            depth_attachment: Some(depth.texture()?.clone()),
            shading_rate_attachment: None,
            width: extent.width,
            height: extent.height,
        })?;

        let lighting_framebuffer = device.create_framebuffer(&FramebufferDesc {
            render_pass: lighting_pass,
            color_attachments: vec![light_color.texture()?.clone()],
            depth_attachment: None,
            shading_rate_attachment: Some(shading_rate.texture()?.clone()),
            width: extent.width,
            height: extent.height,
        })?;

        engine_debug!(
            "sponza::PassGraph",
            "Built {} tier {}x{} (shading rate {}x{})",
            kind.label(), extent.width, extent.height,
            shading_rate.width, shading_rate.height
        );

        Ok(Self {
            kind,
            extent,
            position,
            normal,
            albedo,
            view_normal,
            depth,
            light_color,
            shading_rate,
            upscale_output,
            gbuffer_framebuffer,
            lighting_framebuffer,
        })
    }

    /// Release every attachment the tier owns
    pub fn destroy(&mut self) {
        for attachment in [
            &mut self.position,
            &mut self.normal,
            &mut self.albedo,
            &mut self.view_normal,
            &mut self.depth,
            &mut self.light_color,
            &mut self.shading_rate,
        ] {
            attachment.destroy();
        }
        if let Some(output) = self.upscale_output.as_mut() {
            output.destroy();
        }
    }
}
