/// Pipeline trait and pipeline descriptor

use std::any::Any;
use std::sync::Arc;
use crate::graphics_device::{
    Shader, ShaderStage, BufferFormat, RenderPass, BindingGroupLayoutDesc,
};

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit indices
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInputRate {
    Vertex,
    Instance,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Binding index
    pub binding: u32,
    /// Format of the attribute
    pub format: BufferFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Vertex binding description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexBinding {
    pub binding: u32,
    /// Stride in bytes between consecutive elements
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex input layout (empty for full-screen triangle passes)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// True when the pipeline pulls no vertex data
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.attributes.is_empty()
    }
}

/// Push constant range descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct PushConstantRange {
    /// Shader stages that can access these push constants
    pub stages: Vec<ShaderStage>,
    /// Offset in bytes
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}

// ===== FIXED-FUNCTION STATE =====

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Front face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Comparison operator for depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Rasterization fixed-function state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
        }
    }
}

/// Depth testing state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilState {
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: CompareOp,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: CompareOp::LessOrEqual,
        }
    }
}

/// Per-attachment color blend state (blending disabled, all channels written)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorBlendAttachment {
    pub blend_enable: bool,
}

/// State the pipeline leaves to command-record time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicState {
    Viewport,
    Scissor,
    FragmentShadingRate,
}

// ===== FRAGMENT SHADING RATE =====

/// Fragment size in pixels (1x1 = full rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentSize {
    pub width: u32,
    pub height: u32,
}

impl FragmentSize {
    /// Full-rate shading
    pub const FULL: Self = Self { width: 1, height: 1 };
}

/// Rule merging two shading-rate sources
///
/// Index 0 combines pipeline and primitive rates, index 1 combines that
/// result with the attachment rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinerOp {
    /// Keep the first operand
    Keep,
    /// Replace with the second operand
    Replace,
    Min,
    Max,
    Mul,
}

/// Per-pipeline default shading rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentShadingRateState {
    pub fragment_size: FragmentSize,
    pub combiner_ops: [CombinerOp; 2],
}

// ===== PIPELINE DESCRIPTOR =====

/// Descriptor for creating a graphics pipeline
#[derive(Clone)]
pub struct PipelineDesc {
    /// Debug label
    pub label: String,
    /// Vertex shader
    pub vertex_shader: Arc<dyn Shader>,
    /// Fragment shader
    pub fragment_shader: Arc<dyn Shader>,
    /// Vertex input layout
    pub vertex_layout: VertexLayout,
    /// Primitive topology
    pub topology: PrimitiveTopology,
    /// Push constant ranges
    pub push_constant_ranges: Vec<PushConstantRange>,
    /// Binding group layouts, index = set number
    pub binding_group_layouts: Vec<BindingGroupLayoutDesc>,
    /// Rasterization state
    pub rasterization: RasterizationState,
    /// Depth testing state
    pub depth_stencil: DepthStencilState,
    /// One entry per color attachment of the render pass
    pub color_blend_attachments: Vec<ColorBlendAttachment>,
    /// Dynamic states
    pub dynamic_states: Vec<DynamicState>,
    /// Default shading rate (None = pipeline does not use VRS)
    pub fragment_shading_rate: Option<FragmentShadingRateState>,
    /// Render pass the pipeline is compatible with
    pub render_pass: Arc<dyn RenderPass>,
}

/// Pipeline resource trait
///
/// The pipeline and its layouts are destroyed when dropped.
pub trait Pipeline: Send + Sync {
    /// Debug label
    fn label(&self) -> &str;

    /// Number of binding group layouts (descriptor set layouts)
    fn binding_group_layout_count(&self) -> u32;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
