/// Conversions from device-table types to Vulkan enums and flags
///
/// Pure functions, no device access.

use ash::vk;
use sponza_upscale::sponza::render::{
    TextureFormat, TextureUsage, BufferFormat, BufferUsage, ShaderStage, ShaderStageFlags,
    BindingType, IndexType, PrimitiveTopology, VertexInputRate, CullMode, FrontFace, CompareOp,
    LoadOp, StoreOp, ImageLayout, PipelineStages, AccessFlags, SubpassRef, CombinerOp, FragmentSize,
    DynamicState, FormatFeature, ClearValue, Rect2D, Viewport,
};

// ===== FORMATS =====

pub(crate) fn texture_format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        TextureFormat::R8_UINT => vk::Format::R8_UINT,
        TextureFormat::D16_UNORM => vk::Format::D16_UNORM,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        TextureFormat::D32_FLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// Map a surface format back to a texture format (None for formats the renderer never uses)
pub(crate) fn vk_format_to_texture_format(format: vk::Format) -> Option<TextureFormat> {
    match format {
        vk::Format::R8G8B8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        vk::Format::R8G8B8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        _ => None,
    }
}

pub(crate) fn buffer_format_to_vk(format: BufferFormat) -> vk::Format {
    match format {
        BufferFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        BufferFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        BufferFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        BufferFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
    }
}

pub(crate) fn format_feature_to_vk(feature: FormatFeature) -> vk::FormatFeatureFlags {
    match feature {
        FormatFeature::ColorAttachment => vk::FormatFeatureFlags::COLOR_ATTACHMENT,
        FormatFeature::DepthStencilAttachment => vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        FormatFeature::SampledImage => vk::FormatFeatureFlags::SAMPLED_IMAGE,
        FormatFeature::FragmentShadingRateAttachment => {
            vk::FormatFeatureFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR
        }
    }
}

/// Aspect of the whole image (depth only for depth/stencil formats, sampling reads depth)
pub(crate) fn aspect_mask(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

// ===== USAGE =====

pub(crate) fn texture_usage_to_vk(usage: TextureUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(TextureUsage::SAMPLED) { flags |= vk::ImageUsageFlags::SAMPLED; }
    if usage.contains(TextureUsage::COLOR_ATTACHMENT) { flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT; }
    if usage.contains(TextureUsage::DEPTH_STENCIL_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(TextureUsage::SHADING_RATE_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR;
    }
    if usage.contains(TextureUsage::TRANSFER_SRC) { flags |= vk::ImageUsageFlags::TRANSFER_SRC; }
    if usage.contains(TextureUsage::TRANSFER_DST) { flags |= vk::ImageUsageFlags::TRANSFER_DST; }
    if usage.contains(TextureUsage::STORAGE) { flags |= vk::ImageUsageFlags::STORAGE; }
    flags
}

pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    match usage {
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        BufferUsage::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
    }
}

// ===== SHADER STAGES AND BINDINGS =====

pub(crate) fn shader_stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
    }
}

pub(crate) fn shader_stages_to_vk(stages: &[ShaderStage]) -> vk::ShaderStageFlags {
    stages
        .iter()
        .fold(vk::ShaderStageFlags::empty(), |flags, stage| flags | shader_stage_to_vk(*stage))
}

pub(crate) fn stage_flags_to_vk(flags: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut vk_flags = vk::ShaderStageFlags::empty();
    if flags.contains(ShaderStageFlags::VERTEX) { vk_flags |= vk::ShaderStageFlags::VERTEX; }
    if flags.contains(ShaderStageFlags::FRAGMENT) { vk_flags |= vk::ShaderStageFlags::FRAGMENT; }
    if flags.contains(ShaderStageFlags::COMPUTE) { vk_flags |= vk::ShaderStageFlags::COMPUTE; }
    vk_flags
}

pub(crate) fn binding_type_to_vk(binding_type: BindingType) -> vk::DescriptorType {
    match binding_type {
        BindingType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        BindingType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    }
}

pub(crate) fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

// ===== PIPELINE STATE =====

pub(crate) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
    }
}

pub(crate) fn input_rate_to_vk(rate: VertexInputRate) -> vk::VertexInputRate {
    match rate {
        VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
        VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub(crate) fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub(crate) fn dynamic_state_to_vk(state: DynamicState) -> vk::DynamicState {
    match state {
        DynamicState::Viewport => vk::DynamicState::VIEWPORT,
        DynamicState::Scissor => vk::DynamicState::SCISSOR,
        DynamicState::FragmentShadingRate => vk::DynamicState::FRAGMENT_SHADING_RATE_KHR,
    }
}

pub(crate) fn combiner_op_to_vk(op: CombinerOp) -> vk::FragmentShadingRateCombinerOpKHR {
    match op {
        CombinerOp::Keep => vk::FragmentShadingRateCombinerOpKHR::KEEP,
        CombinerOp::Replace => vk::FragmentShadingRateCombinerOpKHR::REPLACE,
        CombinerOp::Min => vk::FragmentShadingRateCombinerOpKHR::MIN,
        CombinerOp::Max => vk::FragmentShadingRateCombinerOpKHR::MAX,
        CombinerOp::Mul => vk::FragmentShadingRateCombinerOpKHR::MUL,
    }
}

/// Arguments of `vkCmdSetFragmentShadingRateKHR`
pub(crate) fn fragment_shading_rate_to_vk(
    fragment_size: FragmentSize,
    combiner_ops: [CombinerOp; 2],
) -> (vk::Extent2D, [vk::FragmentShadingRateCombinerOpKHR; 2]) {
    (
        vk::Extent2D { width: fragment_size.width, height: fragment_size.height },
        [combiner_op_to_vk(combiner_ops[0]), combiner_op_to_vk(combiner_ops[1])],
    )
}

pub(crate) fn sample_count_to_vk(samples: u32) -> vk::SampleCountFlags {
    match samples {
        2 => vk::SampleCountFlags::TYPE_2,
        4 => vk::SampleCountFlags::TYPE_4,
        8 => vk::SampleCountFlags::TYPE_8,
        _ => vk::SampleCountFlags::TYPE_1,
    }
}

// ===== RENDER PASS STATE =====

pub(crate) fn load_op_to_vk(load_op: LoadOp) -> vk::AttachmentLoadOp {
    match load_op {
        LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
        LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub(crate) fn store_op_to_vk(store_op: StoreOp) -> vk::AttachmentStoreOp {
    match store_op {
        StoreOp::Store => vk::AttachmentStoreOp::STORE,
        StoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
    }
}

pub(crate) fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::General => vk::ImageLayout::GENERAL,
        ImageLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilReadOnly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ImageLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::ShadingRateAttachment => {
            vk::ImageLayout::FRAGMENT_SHADING_RATE_ATTACHMENT_OPTIMAL_KHR
        }
        ImageLayout::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

pub(crate) fn subpass_ref_to_vk(subpass: SubpassRef) -> u32 {
    match subpass {
        SubpassRef::External => vk::SUBPASS_EXTERNAL,
        SubpassRef::Index(index) => index,
    }
}

pub(crate) fn pipeline_stages_to_vk(stages: PipelineStages) -> vk::PipelineStageFlags {
    const MAPPING: [(PipelineStages, vk::PipelineStageFlags); 10] = [
        (PipelineStages::TOP_OF_PIPE, vk::PipelineStageFlags::TOP_OF_PIPE),
        (PipelineStages::VERTEX_SHADER, vk::PipelineStageFlags::VERTEX_SHADER),
        (PipelineStages::FRAGMENT_SHADER, vk::PipelineStageFlags::FRAGMENT_SHADER),
        (PipelineStages::EARLY_FRAGMENT_TESTS, vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS),
        (PipelineStages::LATE_FRAGMENT_TESTS, vk::PipelineStageFlags::LATE_FRAGMENT_TESTS),
        (PipelineStages::COLOR_ATTACHMENT_OUTPUT, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT),
        (PipelineStages::COMPUTE_SHADER, vk::PipelineStageFlags::COMPUTE_SHADER),
        (PipelineStages::TRANSFER, vk::PipelineStageFlags::TRANSFER),
        (PipelineStages::BOTTOM_OF_PIPE, vk::PipelineStageFlags::BOTTOM_OF_PIPE),
        (
            PipelineStages::FRAGMENT_SHADING_RATE_ATTACHMENT,
            vk::PipelineStageFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR,
        ),
    ];
    MAPPING
        .iter()
        .filter(|(stage, _)| stages.contains(*stage))
        .fold(vk::PipelineStageFlags::empty(), |flags, (_, vk_stage)| flags | *vk_stage)
}

pub(crate) fn access_flags_to_vk(access: AccessFlags) -> vk::AccessFlags {
    const MAPPING: [(AccessFlags, vk::AccessFlags); 9] = [
        (AccessFlags::SHADER_READ, vk::AccessFlags::SHADER_READ),
        (AccessFlags::SHADER_WRITE, vk::AccessFlags::SHADER_WRITE),
        (AccessFlags::COLOR_ATTACHMENT_READ, vk::AccessFlags::COLOR_ATTACHMENT_READ),
        (AccessFlags::COLOR_ATTACHMENT_WRITE, vk::AccessFlags::COLOR_ATTACHMENT_WRITE),
        (AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ, vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ),
        (AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE, vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE),
        (AccessFlags::MEMORY_READ, vk::AccessFlags::MEMORY_READ),
        (AccessFlags::MEMORY_WRITE, vk::AccessFlags::MEMORY_WRITE),
        (
            AccessFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_READ,
            vk::AccessFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_READ_KHR,
        ),
    ];
    MAPPING
        .iter()
        .filter(|(flag, _)| access.contains(*flag))
        .fold(vk::AccessFlags::empty(), |flags, (_, vk_flag)| flags | *vk_flag)
}

// ===== COMMAND VALUES =====

pub(crate) fn clear_value_to_vk(value: &ClearValue) -> vk::ClearValue {
    match value {
        ClearValue::Color(color) => vk::ClearValue {
            color: vk::ClearColorValue { float32: *color },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth: *depth, stencil: *stencil },
        },
    }
}

pub(crate) fn rect_to_vk(rect: Rect2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: rect.x, y: rect.y },
        extent: vk::Extent2D { width: rect.width, height: rect.height },
    }
}

pub(crate) fn viewport_to_vk(viewport: Viewport) -> vk::Viewport {
    vk::Viewport::default()
        .x(viewport.x)
        .y(viewport.y)
        .width(viewport.width)
        .height(viewport.height)
        .min_depth(viewport.min_depth)
        .max_depth(viewport.max_depth)
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
