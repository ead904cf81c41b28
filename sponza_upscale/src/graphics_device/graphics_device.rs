/// GraphicsDevice trait - the device function table
///
/// The bootstrap layer (instance, physical device selection, function
/// loading) populates an implementation of this trait. The core only calls
/// through it and never resolves symbols itself.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Texture, TextureDesc, TextureFormat, Buffer, BufferDesc, Shader, ShaderDesc,
    RenderPass, RenderPassDesc, Framebuffer, FramebufferDesc, Pipeline, PipelineDesc,
    BindingGroup, BindingResource, CommandList, Swapchain,
    SpatialUpscaler, SpatialUpscaleDesc, VrsDispatcher, VrsDispatcherDesc,
};

// ============================================================================
// Extension names
// ============================================================================

/// Vendor spatial upscale extension
pub const XEG_SPATIAL_UPSCALE_EXTENSION_NAME: &str = "XEG_spatial_upscale";

/// Vendor adaptive VRS extension
pub const XEG_ADAPTIVE_VRS_EXTENSION_NAME: &str = "XEG_adaptive_vrs";

/// Device extensions the render passes and pipelines rely on
pub const REQUIRED_DEVICE_EXTENSIONS: [&str; 2] = [
    "VK_KHR_create_renderpass2",
    "VK_KHR_fragment_shading_rate",
];

/// Vendor extensions checked before any GPU object is created
pub const REQUIRED_VENDOR_EXTENSIONS: [&str; 2] = [
    XEG_SPATIAL_UPSCALE_EXTENSION_NAME,
    XEG_ADAPTIVE_VRS_EXTENSION_NAME,
];

// ============================================================================
// Capabilities
// ============================================================================

/// Format features queried for optimal tiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatFeature {
    ColorAttachment,
    DepthStencilAttachment,
    SampledImage,
    FragmentShadingRateAttachment,
}

/// What the selected physical device exposes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceCapabilities {
    /// Device and vendor extension names
    pub extensions: Vec<String>,
    pub renderpass2: bool,
    pub pipeline_fragment_shading_rate: bool,
    pub attachment_fragment_shading_rate: bool,
    pub primitive_fragment_shading_rate: bool,
}

impl DeviceCapabilities {
    /// Whether `name` is among the exposed extensions
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| ext == name)
    }

    /// Names of every missing requirement, empty when the device is usable
    ///
    /// Primitive shading rate is not required.
    pub fn missing_requirements(&self) -> Vec<String> {
        let mut missing: Vec<String> = REQUIRED_VENDOR_EXTENSIONS
            .iter()
            .filter(|name| !self.has_extension(name))
            .map(|name| name.to_string())
            .collect();

        if !self.renderpass2 {
            missing.push("renderpass2".to_string());
        }
        if !self.pipeline_fragment_shading_rate {
            missing.push("pipelineFragmentShadingRate".to_string());
        }
        if !self.attachment_fragment_shading_rate {
            missing.push("attachmentFragmentShadingRate".to_string());
        }
        missing
    }
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Graphics device trait
///
/// Factory for every GPU object the pipeline uses, plus submission.
/// Object creation is synchronous; failures are returned, never retried.
pub trait GraphicsDevice: Send + Sync {
    /// Capabilities of the selected physical device
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Whether `format` supports `feature` with optimal tiling
    fn supports_format_feature(&self, format: TextureFormat, feature: FormatFeature) -> bool;

    /// Depth format chosen for depth attachments
    fn depth_format(&self) -> TextureFormat;

    /// Create a device-local 2-D texture with a matching view
    ///
    /// # Arguments
    ///
    /// * `desc` - Texture descriptor
    ///
    /// # Errors
    ///
    /// `OutOfMemory` or `BackendError` on creation failure.
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a buffer (uniform buffers are host-visible and persistently mapped)
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Load a SPIR-V shader module from an absolute path
    ///
    /// # Errors
    ///
    /// `InvalidResource` when the file is missing or empty.
    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>>;

    /// Create a single-subpass render pass
    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    /// Create a framebuffer compatible with `desc.render_pass`
    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    /// Create a graphics pipeline and its layouts
    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Create a binding group for `set_index` of `pipeline`'s layout
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline owning the layout
    /// * `set_index` - Set index within the layout
    /// * `resources` - Resources in binding order
    fn create_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>>;

    /// Allocate `count` primary command lists
    fn create_command_lists(&mut self, count: usize) -> Result<Vec<Box<dyn CommandList>>>;

    /// Create the vendor spatial upscaler
    fn create_spatial_upscaler(&mut self, desc: &SpatialUpscaleDesc) -> Result<Box<dyn SpatialUpscaler>>;

    /// Create one vendor adaptive VRS dispatcher
    fn create_vrs_dispatcher(&mut self, desc: &VrsDispatcherDesc) -> Result<Box<dyn VrsDispatcher>>;

    /// Submit a recorded command list for the acquired swapchain image
    ///
    /// Waits on the swapchain's acquire semaphore and signals its
    /// render-finished semaphore.
    fn submit(
        &mut self,
        command_list: &dyn CommandList,
        swapchain: &dyn Swapchain,
        image_index: u32,
    ) -> Result<()>;

    /// Wait for the graphics queue to drain
    fn queue_wait_idle(&self) -> Result<()>;

    /// Wait for the whole device to be idle
    fn wait_idle(&self) -> Result<()>;
}

#[cfg(test)]
#[path = "graphics_device_tests.rs"]
mod tests;
