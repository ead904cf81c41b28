/// CommandList trait - for recording rendering commands

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    RenderPass, Framebuffer, Pipeline, Buffer, Texture, BindingGroup,
    IndexType, ShaderStage, FragmentSize, CombinerOp,
    AccessFlags, PipelineStages, ImageLayout,
};

/// Command list for recording rendering commands
///
/// One list exists per swapchain image. Lists are recorded once per rebuild
/// and resubmitted every frame via `GraphicsDevice::submit()`.
pub trait CommandList: Send + Sync {
    /// Begin recording commands (resets previous contents)
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Begin a render pass covering the whole framebuffer
    ///
    /// # Arguments
    ///
    /// * `render_pass` - The render pass to begin
    /// * `framebuffer` - Attachments for this pass instance
    /// * `clear_values` - One clear value per attachment with `LoadOp::Clear`
    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind a binding group to a pipeline slot
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline whose layout the group is bound against
    /// * `set_index` - Set index
    /// * `binding_group` - The binding group to bind
    fn bind_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()>;

    /// Push constants to the currently bound pipeline layout
    ///
    /// # Arguments
    ///
    /// * `stages` - Shader stages that read the constants
    /// * `offset` - Offset in bytes into the push constant range
    /// * `data` - Bytes to push
    fn push_constants(&mut self, stages: &[ShaderStage], offset: u32, data: &[u8]) -> Result<()>;

    /// Bind a vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    /// Draw non-indexed vertices (one instance)
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Draw indexed vertices (one instance)
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;

    /// Set the dynamic fragment shading rate and combiner operations
    ///
    /// # Arguments
    ///
    /// * `fragment_size` - Pipeline shading rate
    /// * `combiner_ops` - `[pipeline/primitive, result/attachment]` combiners
    fn set_fragment_shading_rate(
        &mut self,
        fragment_size: FragmentSize,
        combiner_ops: [CombinerOp; 2],
    ) -> Result<()>;

    /// Record an image memory barrier (outside any render pass)
    fn image_barrier(&mut self, barrier: &ImageBarrier) -> Result<()>;

    /// Downcast support for backends and kernels
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support for backends and kernels
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// 2-D extent in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-extent viewport with depth range [0, 1]
    pub fn full(extent: Extent2D) -> Self {
        Self::from_rect(Rect2D::full(extent))
    }

    /// Viewport covering a sub-region, depth range [0, 1]
    pub fn from_rect(rect: Rect2D) -> Self {
        Self {
            x: rect.x as f32,
            y: rect.y as f32,
            width: rect.width as f32,
            height: rect.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    /// Rectangle at the origin covering `extent`
    pub fn full(extent: Extent2D) -> Self {
        Self { x: 0, y: 0, width: extent.width, height: extent.height }
    }

    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// Single-image memory barrier with layout transition
#[derive(Clone)]
pub struct ImageBarrier {
    pub texture: Arc<dyn Texture>,
    pub src_stages: PipelineStages,
    pub dst_stages: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
}
