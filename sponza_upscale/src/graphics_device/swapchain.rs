/// Swapchain trait - for window presentation

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Texture, TextureFormat};

/// Outcome of an acquire or present call
///
/// Out-of-date and suboptimal surfaces are per-frame conditions, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapchainStatus {
    /// Surface matches the swapchain
    Optimal,
    /// Presentation still works but the surface properties changed
    Suboptimal,
    /// The swapchain must be recreated before it can be used again
    OutOfDate,
}

/// Swapchain for presenting rendered images to a window
pub trait Swapchain: Send + Sync {
    /// Acquire the next available swapchain image
    ///
    /// # Returns
    ///
    /// The image index and the surface status. On `OutOfDate` the index is
    /// meaningless and must not be submitted.
    fn acquire_next_image(&mut self) -> Result<(u32, SwapchainStatus)>;

    /// Present the image rendered into `image_index`
    ///
    /// # Arguments
    ///
    /// * `image_index` - Index returned by `acquire_next_image`
    fn present(&mut self, image_index: u32) -> Result<SwapchainStatus>;

    /// Recreate the swapchain (e.g., after window resize)
    ///
    /// # Arguments
    ///
    /// * `width` - New width in pixels
    /// * `height` - New height in pixels
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    /// Number of images in the swapchain
    fn image_count(&self) -> usize;

    /// Width of the swapchain images in pixels
    fn width(&self) -> u32;

    /// Height of the swapchain images in pixels
    fn height(&self) -> u32;

    /// Pixel format of the swapchain images
    fn format(&self) -> TextureFormat;

    /// Swapchain image as a texture (for framebuffer creation)
    fn image(&self, index: usize) -> Option<Arc<dyn Texture>>;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}
