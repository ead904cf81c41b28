/// Render pass descriptor types and the RenderPass trait

use std::any::Any;
use bitflags::bitflags;
use crate::graphics_device::TextureFormat;

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// Load existing content
    Load,
    /// Clear the content
    Clear,
    /// Don't care about existing content
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Store the rendered content
    Store,
    /// Don't care about storing the content
    DontCare,
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    /// Undefined layout (contents discarded)
    Undefined,
    /// General layout (storage writes from compute kernels)
    General,
    /// Layout for color attachment
    ColorAttachment,
    /// Layout for depth/stencil attachment
    DepthStencilAttachment,
    /// Depth/stencil readable by shaders and kernels
    DepthStencilReadOnly,
    /// Layout for shader read-only access
    ShaderReadOnly,
    /// Layout for fragment shading rate attachment
    ShadingRateAttachment,
    /// Layout for transfer source
    TransferSrc,
    /// Layout for transfer destination
    TransferDst,
    /// Layout for presenting to swapchain
    PresentSrc,
}

bitflags! {
    /// Pipeline stages referenced by dependencies and barriers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_SHADER = 1 << 1;
        const FRAGMENT_SHADER = 1 << 2;
        const EARLY_FRAGMENT_TESTS = 1 << 3;
        const LATE_FRAGMENT_TESTS = 1 << 4;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 5;
        const COMPUTE_SHADER = 1 << 6;
        const TRANSFER = 1 << 7;
        const BOTTOM_OF_PIPE = 1 << 8;
        const FRAGMENT_SHADING_RATE_ATTACHMENT = 1 << 9;
    }
}

bitflags! {
    /// Memory access types referenced by dependencies and barriers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const SHADER_READ = 1 << 0;
        const SHADER_WRITE = 1 << 1;
        const COLOR_ATTACHMENT_READ = 1 << 2;
        const COLOR_ATTACHMENT_WRITE = 1 << 3;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 5;
        const MEMORY_READ = 1 << 6;
        const MEMORY_WRITE = 1 << 7;
        const FRAGMENT_SHADING_RATE_ATTACHMENT_READ = 1 << 8;
    }
}

/// Descriptor for a single attachment in a render pass
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentDesc {
    /// Pixel format
    pub format: TextureFormat,
    /// Number of samples (1 = no MSAA)
    pub samples: u32,
    /// Load operation
    pub load_op: LoadOp,
    /// Store operation
    pub store_op: StoreOp,
    /// Layout when the pass begins
    pub initial_layout: ImageLayout,
    /// Layout when the pass ends
    pub final_layout: ImageLayout,
}

impl AttachmentDesc {
    /// Cleared, stored, single-sample attachment
    pub fn cleared(format: TextureFormat, final_layout: ImageLayout) -> Self {
        Self {
            format,
            samples: 1,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            initial_layout: ImageLayout::Undefined,
            final_layout,
        }
    }
}

/// Shading-rate attachment of a subpass (renderpass-2 path only)
#[derive(Debug, Clone, PartialEq)]
pub struct ShadingRateAttachmentDesc {
    pub attachment: AttachmentDesc,
    /// Pixels covered by one shading-rate texel
    pub texel_width: u32,
    pub texel_height: u32,
}

/// Subpass reference in a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubpassRef {
    /// Commands outside the render pass
    External,
    /// Subpass index within the pass
    Index(u32),
}

/// Execution and memory dependency between subpasses
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubpassDependency {
    pub src_subpass: SubpassRef,
    pub dst_subpass: SubpassRef,
    pub src_stages: PipelineStages,
    pub dst_stages: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    /// Framebuffer-local dependency
    pub by_region: bool,
}

/// Descriptor for creating a single-subpass render pass
///
/// Attachment indices follow declaration order: color attachments, then
/// depth, then the shading-rate attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDesc {
    /// Debug label (also used by the mock device to identify passes)
    pub label: String,
    /// Color attachments
    pub color_attachments: Vec<AttachmentDesc>,
    /// Optional depth attachment
    pub depth_attachment: Option<AttachmentDesc>,
    /// Optional fragment shading rate attachment
    pub shading_rate_attachment: Option<ShadingRateAttachmentDesc>,
    /// External dependencies
    pub dependencies: Vec<SubpassDependency>,
}

impl RenderPassDesc {
    /// Total number of attachments (framebuffers must match it)
    pub fn attachment_count(&self) -> usize {
        self.color_attachments.len()
            + self.depth_attachment.is_some() as usize
            + self.shading_rate_attachment.is_some() as usize
    }

    /// Whether this pass needs the renderpass-2 creation path
    pub fn requires_renderpass2(&self) -> bool {
        self.shading_rate_attachment.is_some()
    }
}

/// Render pass resource
pub trait RenderPass: Send + Sync {
    /// Descriptor the pass was created from
    fn desc(&self) -> &RenderPassDesc;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}
