/// Framebuffer - Vulkan implementation of the Framebuffer trait
///
/// Wraps a VkFramebuffer and keeps its attachment textures alive.
/// Recreated whenever the attachments are reallocated.

use sponza_upscale::sponza::{
    Error, Result,
    render::{Framebuffer as RendererFramebuffer, FramebufferDesc, Texture as RendererTexture},
};
use sponza_upscale::engine_err;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_texture::Texture;

/// Vulkan framebuffer implementation
pub struct Framebuffer {
    ctx: Arc<GpuContext>,
    /// Vulkan framebuffer handle
    pub(crate) framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
    /// Attachments in render-pass order
    attachments: Vec<Arc<dyn RendererTexture>>,
}

impl Framebuffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &FramebufferDesc<'_>) -> Result<Self> {
        let render_pass = RenderPass::cast(desc.render_pass.as_ref())?;
        let attachments = desc.ordered_attachments();

        let expected = desc.render_pass.desc().attachment_count();
        if attachments.len() != expected {
            return Err(Error::InvalidResource(format!(
                "Framebuffer for '{}' has {} attachment(s), the render pass declares {}",
                desc.render_pass.desc().label,
                attachments.len(),
                expected
            )));
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource(format!(
                "Framebuffer for '{}' has a zero extent",
                desc.render_pass.desc().label
            )));
        }

        let views = attachments
            .iter()
            .map(|texture| Texture::cast(texture.as_ref()).map(|texture| texture.view))
            .collect::<Result<Vec<vk::ImageView>>>()?;

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.render_pass)
            .attachments(&views)
            .width(desc.width)
            .height(desc.height)
            .layers(1);

        let framebuffer = unsafe { ctx.device.create_framebuffer(&create_info, None) }
            .map_err(|e| engine_err!("sponza::vulkan",
                "Failed to create framebuffer for '{}': {:?}", desc.render_pass.desc().label, e))?;

        Ok(Self {
            ctx,
            framebuffer,
            width: desc.width,
            height: desc.height,
            attachments,
        })
    }

    /// Downcast a framebuffer created by this backend
    pub(crate) fn cast(framebuffer: &dyn RendererFramebuffer) -> Result<&Self> {
        framebuffer.as_any().downcast_ref::<Self>().ok_or_else(|| {
            Error::InvalidResource("Framebuffer was not created by the Vulkan device".to_string())
        })
    }
}

impl RendererFramebuffer for Framebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn attachments(&self) -> &[Arc<dyn RendererTexture>] {
        &self.attachments
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
