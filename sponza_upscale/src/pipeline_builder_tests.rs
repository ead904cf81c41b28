use crate::camera::Camera;
use crate::config::UpscaleMethod;
use crate::frame_graph::TierKind;
use crate::graphics_device::mock_graphics_device::{MockBindingGroup, MockPipeline};
use crate::graphics_device::*;
use crate::pipeline_builder::*;
use crate::test_fixtures::GraphFixture;
use crate::uniforms::{LightUniforms, SceneUniforms};

fn mock_pipeline(pipeline: &std::sync::Arc<dyn Pipeline>) -> &MockPipeline {
    pipeline.as_any().downcast_ref::<MockPipeline>().unwrap()
}

fn group_textures(group: &std::sync::Arc<dyn BindingGroup>) -> Vec<String> {
    group
        .as_any()
        .downcast_ref::<MockBindingGroup>()
        .unwrap()
        .resources
        .iter()
        .filter_map(|r| r.texture())
        .map(|t| t.info().label.clone())
        .collect()
}

#[test]
fn test_composite_source_follows_method() {
    assert_eq!(CompositeSource::for_method(UpscaleMethod::Native), CompositeSource::Native);
    assert_eq!(CompositeSource::for_method(UpscaleMethod::VendorSpatialUpscale), CompositeSource::Upscale);
    assert_eq!(CompositeSource::for_method(UpscaleMethod::SharpenUpscale), CompositeSource::Upscale);
}

#[test]
fn test_builds_six_pipelines_and_retains_shaders() {
    let mut fixture = GraphFixture::new();
    let builder = fixture.pipelines();
    let log = fixture.log.lock().unwrap();

    let mut labels = log.pipelines.clone();
    labels.sort();
    assert_eq!(
        labels,
        vec!["composite_native", "composite_upscale", "gbuffer_high", "gbuffer_low", "lighting_high", "lighting_low"]
    );
    assert_eq!(builder.shader_count(), 5);
    assert!(log
        .shaders
        .iter()
        .all(|s| s.path.starts_with("/data/storage/sponza/shader")));
}

#[test]
fn test_gbuffer_pipeline_state() {
    let mut fixture = GraphFixture::new();
    let builder = fixture.pipelines();
    let desc = &mock_pipeline(&builder.tier(TierKind::Low).gbuffer.pipeline).desc;

    assert_eq!(desc.vertex_layout.bindings[0].stride, 56);
    assert_eq!(desc.color_blend_attachments.len(), 4);
    assert_eq!(desc.rasterization.cull_mode, CullMode::Back);
    assert_eq!(desc.depth_stencil.depth_compare_op, CompareOp::LessOrEqual);
    assert_eq!(desc.binding_group_layouts.len(), 2);
    assert_eq!(
        desc.binding_group_layouts[0].entries[0].stage_flags,
        ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT
    );
    assert_eq!(desc.render_pass.desc().label, "gbuffer");
}

#[test]
fn test_lighting_pipeline_declares_shading_rate_state() {
    let mut fixture = GraphFixture::new();
    let builder = fixture.pipelines();
    let desc = &mock_pipeline(&builder.tier(TierKind::High).lighting.pipeline).desc;

    assert!(desc.vertex_layout.is_empty());
    assert_eq!(desc.rasterization.cull_mode, CullMode::Front);
    assert!(desc.dynamic_states.contains(&DynamicState::FragmentShadingRate));
    assert_eq!(
        desc.fragment_shading_rate,
        Some(FragmentShadingRateState {
            fragment_size: FragmentSize::FULL,
            combiner_ops: [CombinerOp::Keep, CombinerOp::Replace],
        })
    );
    assert_eq!(desc.binding_group_layouts[0].entries.len(), 4);
    assert_eq!(desc.render_pass.desc().label, "lighting");
}

#[test]
fn test_lighting_group_samples_own_tier() {
    let mut fixture = GraphFixture::new();
    let builder = fixture.pipelines();
    assert_eq!(
        group_textures(&builder.tier(TierKind::Low).lighting.binding_group),
        vec!["low_position", "low_normal", "low_albedo"]
    );
    assert_eq!(
        group_textures(&builder.tier(TierKind::High).lighting.binding_group),
        vec!["high_position", "high_normal", "high_albedo"]
    );
}

#[test]
fn test_composite_groups_sample_expected_source() {
    let mut fixture = GraphFixture::new();
    let builder = fixture.pipelines();
    assert_eq!(
        group_textures(&builder.composite(CompositeSource::Native).binding_group),
        vec!["high_light_color"]
    );
    assert_eq!(
        group_textures(&builder.composite(CompositeSource::Upscale).binding_group),
        vec!["low_upscale_output"]
    );
    let desc = &mock_pipeline(&builder.composite(CompositeSource::Native).pipeline).desc;
    assert_eq!(desc.render_pass.desc().label, "composite");
    assert!(desc.fragment_shading_rate.is_none());
}

#[test]
fn test_scene_prepared_for_each_gbuffer_pipeline() {
    let mut fixture = GraphFixture::new();
    let _builder = fixture.pipelines();
    // 2 tiers x (gbuffer + lighting) + 2 composite + 1 textured mesh per tier
    assert_eq!(fixture.log.lock().unwrap().binding_groups, 8);
}

#[test]
fn test_update_uniforms_writes_camera_state() {
    let mut fixture = GraphFixture::new();
    let builder = fixture.pipelines();
    let mut camera = Camera::new();
    camera.set_perspective(60.0, 16.0 / 9.0, 0.1, 64.0);
    builder.update_uniforms(&camera).unwrap();

    let log = fixture.log.lock().unwrap();
    let scene = log.buffer(SCENE_UNIFORMS_LABEL).unwrap().contents();
    let expected = SceneUniforms::from_camera(&camera);
    assert_eq!(scene.as_slice(), bytemuck::bytes_of(&expected));
    let light = log.buffer(LIGHT_UNIFORMS_LABEL).unwrap().contents();
    assert_eq!(light.len(), std::mem::size_of::<LightUniforms>());
}

#[test]
fn test_missing_shader_aborts_build() {
    let mut fixture = GraphFixture::new();
    fixture.device.fail_labels.push(crate::asset::shaders::LIGHT_FRAG.to_string());
    let result = PipelineBuilder::build(
        &mut fixture.device,
        &crate::test_fixtures::assets(),
        &fixture.passes,
        &fixture.present,
        &mut fixture.scene,
    );
    assert!(result.is_err());
}
