/// Framebuffer trait - binds attachment images to a render pass
///
/// Created once per tier (or per swapchain image) and recreated only when the
/// attachments change (e.g., window resize).

use std::any::Any;
use std::sync::Arc;
use crate::graphics_device::{RenderPass, Texture};

/// Framebuffer resource
///
/// Holds strong references to its attachments so the images outlive every
/// command list that references the framebuffer.
pub trait Framebuffer: Send + Sync {
    /// Get the width in pixels
    fn width(&self) -> u32;

    /// Get the height in pixels
    fn height(&self) -> u32;

    /// Attachments in render-pass order (colors, depth, shading rate)
    fn attachments(&self) -> &[Arc<dyn Texture>];

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}

/// Descriptor for creating a framebuffer
pub struct FramebufferDesc<'a> {
    /// The render pass this framebuffer is compatible with
    pub render_pass: &'a Arc<dyn RenderPass>,
    /// Color attachments
    pub color_attachments: Vec<Arc<dyn Texture>>,
    /// Optional depth/stencil attachment
    pub depth_attachment: Option<Arc<dyn Texture>>,
    /// Optional shading-rate attachment
    pub shading_rate_attachment: Option<Arc<dyn Texture>>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FramebufferDesc<'_> {
    /// Attachments flattened in render-pass order
    pub fn ordered_attachments(&self) -> Vec<Arc<dyn Texture>> {
        self.color_attachments
            .iter()
            .chain(self.depth_attachment.iter())
            .chain(self.shading_rate_attachment.iter())
            .cloned()
            .collect()
    }
}
