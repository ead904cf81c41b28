/// Present targets: the composite pass over the swapchain images
///
/// Only this part of the frame graph follows the window size; it is rebuilt
/// on every resize while the offscreen tiers keep their configured size.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::frame_graph::Attachment;
use crate::graphics_device::{
    GraphicsDevice, Swapchain, RenderPass, RenderPassDesc, AttachmentDesc, Framebuffer,
    FramebufferDesc, SubpassDependency, SubpassRef, PipelineStages, AccessFlags, ImageLayout,
    LoadOp, StoreOp, TextureFormat, Extent2D,
};
use crate::engine_debug;

pub const COMPOSITE_PASS_LABEL: &str = "composite";
pub const PRESENT_DEPTH_LABEL: &str = "present_depth";

pub struct PresentTargets {
    render_pass: Arc<dyn RenderPass>,
    depth: Attachment,
    framebuffers: Vec<Arc<dyn Framebuffer>>,
    extent: Extent2D,
}

impl PresentTargets {
    /// Composite pass: swapchain color presented directly, plus depth
    pub fn composite_pass_desc(color_format: TextureFormat, depth_format: TextureFormat) -> RenderPassDesc {
        let fragment_tests = PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS;
        RenderPassDesc {
            label: COMPOSITE_PASS_LABEL.to_string(),
            color_attachments: vec![AttachmentDesc::cleared(color_format, ImageLayout::PresentSrc)],
            depth_attachment: Some(AttachmentDesc {
                format: depth_format,
                samples: 1,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::DepthStencilAttachment,
            }),
            shading_rate_attachment: None,
            dependencies: vec![
                SubpassDependency {
                    src_subpass: SubpassRef::External,
                    dst_subpass: SubpassRef::Index(0),
                    src_stages: fragment_tests,
                    dst_stages: fragment_tests,
                    src_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                    dst_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
                        | AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
                    by_region: false,
                },
                SubpassDependency {
                    src_subpass: SubpassRef::External,
                    dst_subpass: SubpassRef::Index(0),
                    src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                    dst_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                    src_access: AccessFlags::empty(),
                    dst_access: AccessFlags::COLOR_ATTACHMENT_WRITE | AccessFlags::COLOR_ATTACHMENT_READ,
                    by_region: false,
                },
            ],
        }
    }

    pub fn build(device: &mut dyn GraphicsDevice, swapchain: &dyn Swapchain) -> Result<Self> {
        let desc = Self::composite_pass_desc(swapchain.format(), device.depth_format());
        let render_pass = device.create_render_pass(&desc)?;
        let (depth, framebuffers) = Self::create_targets(device, swapchain, &render_pass)?;
        Ok(Self {
            render_pass,
            depth,
            framebuffers,
            extent: Extent2D::new(swapchain.width(), swapchain.height()),
        })
    }

    /// Replace the depth attachment and framebuffers after a swapchain recreate
    ///
    /// The render pass is kept; the swapchain format does not change.
    pub fn recreate(&mut self, device: &mut dyn GraphicsDevice, swapchain: &dyn Swapchain) -> Result<()> {
        self.framebuffers.clear();
        self.depth.destroy();
        let (depth, framebuffers) = Self::create_targets(device, swapchain, &self.render_pass)?;
        self.depth = depth;
        self.framebuffers = framebuffers;
        self.extent = Extent2D::new(swapchain.width(), swapchain.height());
        Ok(())
    }

    fn create_targets(
        device: &mut dyn GraphicsDevice,
        swapchain: &dyn Swapchain,
        render_pass: &Arc<dyn RenderPass>,
    ) -> Result<(Attachment, Vec<Arc<dyn Framebuffer>>)> {
        let extent = Extent2D::new(swapchain.width(), swapchain.height());
        let depth = Attachment::depth(device, PRESENT_DEPTH_LABEL, extent)?;

        let mut framebuffers = Vec::with_capacity(swapchain.image_count());
        for index in 0..swapchain.image_count() {
            let image = swapchain.image(index).ok_or_else(|| {
                Error::InvalidResource(format!("swapchain image {} unavailable", index))
            })?;
            framebuffers.push(device.create_framebuffer(&FramebufferDesc {
                render_pass,
                color_attachments: vec![image],
                depth_attachment: Some(depth.texture()?.clone()),
                shading_rate_attachment: None,
                width: extent.width,
                height: extent.height,
            })?);
        }

        engine_debug!(
            "sponza::PresentTargets",
            "Created {} present framebuffers at {}x{}",
            framebuffers.len(), extent.width, extent.height
        );
        Ok((depth, framebuffers))
    }

    /// Framebuffer of one swapchain image
    pub fn framebuffer(&self, index: usize) -> Result<&Arc<dyn Framebuffer>> {
        self.framebuffers.get(index).ok_or_else(|| {
            Error::InvalidResource(format!("no present framebuffer for image {}", index))
        })
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}

#[cfg(test)]
#[path = "present_tests.rs"]
mod tests;
