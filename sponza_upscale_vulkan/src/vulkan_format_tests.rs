//! Unit tests for Vulkan conversion functions
//!
//! Pure mappings, no GPU required.

use super::*;

// ============================================================================
// FORMAT CONVERSION TESTS
// ============================================================================

#[test]
fn test_texture_format_to_vk_color_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(texture_format_to_vk(TextureFormat::B8G8R8A8_SRGB), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(
        texture_format_to_vk(TextureFormat::R32G32B32A32_SFLOAT),
        vk::Format::R32G32B32A32_SFLOAT
    );
    assert_eq!(texture_format_to_vk(TextureFormat::R8_UINT), vk::Format::R8_UINT);
}

#[test]
fn test_texture_format_to_vk_depth_formats() {
    // D32_FLOAT -> D32_SFLOAT
    assert_eq!(texture_format_to_vk(TextureFormat::D32_FLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(
        texture_format_to_vk(TextureFormat::D32_FLOAT_S8_UINT),
        vk::Format::D32_SFLOAT_S8_UINT
    );
    assert_eq!(texture_format_to_vk(TextureFormat::D24_UNORM_S8_UINT), vk::Format::D24_UNORM_S8_UINT);
}

#[test]
fn test_surface_format_round_trip() {
    for format in [
        TextureFormat::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM,
    ] {
        assert_eq!(vk_format_to_texture_format(texture_format_to_vk(format)), Some(format));
    }
}

#[test]
fn test_unsupported_surface_format_is_none() {
    assert_eq!(vk_format_to_texture_format(vk::Format::A2B10G10R10_UNORM_PACK32), None);
    assert_eq!(vk_format_to_texture_format(vk::Format::R16G16B16A16_SFLOAT), None);
}

#[test]
fn test_vertex_attribute_formats() {
    assert_eq!(buffer_format_to_vk(BufferFormat::R32G32_SFLOAT), vk::Format::R32G32_SFLOAT);
    assert_eq!(buffer_format_to_vk(BufferFormat::R32G32B32_SFLOAT), vk::Format::R32G32B32_SFLOAT);
}

#[test]
fn test_aspect_mask_depth_vs_color() {
    assert_eq!(aspect_mask(TextureFormat::D32_FLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(aspect_mask(TextureFormat::D24_UNORM_S8_UINT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(aspect_mask(TextureFormat::R8_UINT), vk::ImageAspectFlags::COLOR);
}

#[test]
fn test_shading_rate_format_feature() {
    assert_eq!(
        format_feature_to_vk(FormatFeature::FragmentShadingRateAttachment),
        vk::FormatFeatureFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR
    );
}

// ============================================================================
// USAGE TESTS
// ============================================================================

#[test]
fn test_shading_rate_image_usage() {
    let usage = TextureUsage::SHADING_RATE_ATTACHMENT
        | TextureUsage::TRANSFER_DST
        | TextureUsage::SAMPLED
        | TextureUsage::STORAGE;

    assert_eq!(
        texture_usage_to_vk(usage),
        vk::ImageUsageFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR
            | vk::ImageUsageFlags::TRANSFER_DST
            | vk::ImageUsageFlags::SAMPLED
            | vk::ImageUsageFlags::STORAGE
    );
}

#[test]
fn test_attachment_usage() {
    assert_eq!(
        texture_usage_to_vk(TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED),
        vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED
    );
    assert_eq!(
        texture_usage_to_vk(TextureUsage::DEPTH_STENCIL_ATTACHMENT),
        vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
    );
    assert_eq!(texture_usage_to_vk(TextureUsage::empty()), vk::ImageUsageFlags::empty());
}

#[test]
fn test_buffer_usage() {
    assert_eq!(buffer_usage_to_vk(BufferUsage::Uniform), vk::BufferUsageFlags::UNIFORM_BUFFER);
    assert_eq!(buffer_usage_to_vk(BufferUsage::Index), vk::BufferUsageFlags::INDEX_BUFFER);
}

#[test]
fn test_shader_stage_sets() {
    assert_eq!(
        shader_stages_to_vk(&[ShaderStage::Vertex, ShaderStage::Fragment]),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(shader_stages_to_vk(&[]), vk::ShaderStageFlags::empty());
    assert_eq!(
        stage_flags_to_vk(ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
}

// ============================================================================
// LAYOUT, STAGE AND ACCESS TESTS
// ============================================================================

#[test]
fn test_image_layouts() {
    assert_eq!(image_layout_to_vk(ImageLayout::General), vk::ImageLayout::GENERAL);
    assert_eq!(
        image_layout_to_vk(ImageLayout::ShadingRateAttachment),
        vk::ImageLayout::FRAGMENT_SHADING_RATE_ATTACHMENT_OPTIMAL_KHR
    );
    assert_eq!(
        image_layout_to_vk(ImageLayout::DepthStencilReadOnly),
        vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
    );
    assert_eq!(image_layout_to_vk(ImageLayout::PresentSrc), vk::ImageLayout::PRESENT_SRC_KHR);
}

#[test]
fn test_vrs_barrier_stages() {
    assert_eq!(
        pipeline_stages_to_vk(PipelineStages::COMPUTE_SHADER),
        vk::PipelineStageFlags::COMPUTE_SHADER
    );
    assert_eq!(
        pipeline_stages_to_vk(PipelineStages::FRAGMENT_SHADING_RATE_ATTACHMENT),
        vk::PipelineStageFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR
    );
    assert_eq!(
        access_flags_to_vk(AccessFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_READ),
        vk::AccessFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_READ_KHR
    );
}

#[test]
fn test_combined_stage_and_access_masks() {
    assert_eq!(
        pipeline_stages_to_vk(
            PipelineStages::COLOR_ATTACHMENT_OUTPUT | PipelineStages::EARLY_FRAGMENT_TESTS
        ),
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
    );
    assert_eq!(
        access_flags_to_vk(AccessFlags::COLOR_ATTACHMENT_WRITE | AccessFlags::SHADER_READ),
        vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::SHADER_READ
    );
    assert_eq!(pipeline_stages_to_vk(PipelineStages::empty()), vk::PipelineStageFlags::empty());
}

#[test]
fn test_subpass_refs() {
    assert_eq!(subpass_ref_to_vk(SubpassRef::External), vk::SUBPASS_EXTERNAL);
    assert_eq!(subpass_ref_to_vk(SubpassRef::Index(0)), 0);
}

#[test]
fn test_load_store_ops() {
    assert_eq!(load_op_to_vk(LoadOp::Load), vk::AttachmentLoadOp::LOAD);
    assert_eq!(load_op_to_vk(LoadOp::Clear), vk::AttachmentLoadOp::CLEAR);
    assert_eq!(store_op_to_vk(StoreOp::DontCare), vk::AttachmentStoreOp::DONT_CARE);
}

// ============================================================================
// PIPELINE STATE TESTS
// ============================================================================

#[test]
fn test_combiner_ops() {
    assert_eq!(combiner_op_to_vk(CombinerOp::Keep), vk::FragmentShadingRateCombinerOpKHR::KEEP);
    assert_eq!(
        combiner_op_to_vk(CombinerOp::Replace),
        vk::FragmentShadingRateCombinerOpKHR::REPLACE
    );
    assert_eq!(combiner_op_to_vk(CombinerOp::Mul), vk::FragmentShadingRateCombinerOpKHR::MUL);
}

#[test]
fn test_fragment_shading_rate_arguments() {
    let (extent, ops) = fragment_shading_rate_to_vk(FragmentSize::FULL, [CombinerOp::Keep, CombinerOp::Replace]);
    assert_eq!((extent.width, extent.height), (1, 1));
    assert_eq!(
        ops,
        [vk::FragmentShadingRateCombinerOpKHR::KEEP, vk::FragmentShadingRateCombinerOpKHR::REPLACE]
    );

    let (_, ops) = fragment_shading_rate_to_vk(FragmentSize::FULL, [CombinerOp::Keep, CombinerOp::Keep]);
    assert_eq!(ops, [vk::FragmentShadingRateCombinerOpKHR::KEEP; 2]);
}

#[test]
fn test_dynamic_states() {
    assert_eq!(
        dynamic_state_to_vk(DynamicState::FragmentShadingRate),
        vk::DynamicState::FRAGMENT_SHADING_RATE_KHR
    );
    assert_eq!(dynamic_state_to_vk(DynamicState::Scissor), vk::DynamicState::SCISSOR);
}

#[test]
fn test_sample_count_fallback() {
    assert_eq!(sample_count_to_vk(1), vk::SampleCountFlags::TYPE_1);
    assert_eq!(sample_count_to_vk(4), vk::SampleCountFlags::TYPE_4);
    assert_eq!(sample_count_to_vk(3), vk::SampleCountFlags::TYPE_1);
}

#[test]
fn test_fixed_function_state() {
    assert_eq!(cull_mode_to_vk(CullMode::Back), vk::CullModeFlags::BACK);
    assert_eq!(front_face_to_vk(FrontFace::CounterClockwise), vk::FrontFace::COUNTER_CLOCKWISE);
    assert_eq!(compare_op_to_vk(CompareOp::LessOrEqual), vk::CompareOp::LESS_OR_EQUAL);
    assert_eq!(topology_to_vk(PrimitiveTopology::TriangleList), vk::PrimitiveTopology::TRIANGLE_LIST);
    assert_eq!(index_type_to_vk(IndexType::U32), vk::IndexType::UINT32);
    assert_eq!(input_rate_to_vk(VertexInputRate::Vertex), vk::VertexInputRate::VERTEX);
    assert_eq!(
        binding_type_to_vk(BindingType::CombinedImageSampler),
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER
    );
}

// ============================================================================
// COMMAND VALUE TESTS
// ============================================================================

#[test]
fn test_clear_values() {
    let color = clear_value_to_vk(&ClearValue::Color([0.025, 0.025, 0.025, 1.0]));
    let depth = clear_value_to_vk(&ClearValue::DepthStencil { depth: 1.0, stencil: 0 });

    unsafe {
        assert_eq!(color.color.float32, [0.025, 0.025, 0.025, 1.0]);
        assert_eq!(depth.depth_stencil.depth, 1.0);
        assert_eq!(depth.depth_stencil.stencil, 0);
    }
}

#[test]
fn test_rect_and_viewport() {
    let rect = rect_to_vk(Rect2D { x: 0, y: 0, width: 512, height: 288 });
    assert_eq!(rect.extent.width, 512);
    assert_eq!(rect.extent.height, 288);

    let viewport = viewport_to_vk(Viewport {
        x: 0.0,
        y: 0.0,
        width: 1280.0,
        height: 720.0,
        min_depth: 0.0,
        max_depth: 1.0,
    });
    assert_eq!(viewport.width, 1280.0);
    assert_eq!(viewport.max_depth, 1.0);
}
