/// Pipeline Builder
///
/// Compiles every graphics pipeline of the fixed topology once at prepare
/// time: one G-buffer and one lighting pipeline per tier, plus one composite
/// pipeline per source image. Binding groups and uniform buffers are created
/// alongside and stay valid until the builder is dropped.

use std::sync::Arc;

use crate::asset::{AssetResolver, shaders};
use crate::camera::Camera;
use crate::config::UpscaleMethod;
use crate::error::{Error, Result};
use crate::frame_graph::{Attachment, PassGraph, PresentTargets, Tier, TierKind};
use crate::graphics_device::{
    GraphicsDevice, Pipeline, PipelineDesc, BindingGroup, BindingGroupLayoutDesc, BindingSlotDesc,
    BindingResource, SamplerType, ShaderStageFlags, Shader, ShaderDesc, ShaderStage, Buffer,
    BufferDesc, BufferUsage, RenderPass, VertexLayout, PrimitiveTopology, RasterizationState,
    CullMode, FrontFace, DepthStencilState, ColorBlendAttachment, DynamicState,
    FragmentShadingRateState, FragmentSize, CombinerOp, PushConstantRange,
};
use crate::scene::{SceneDrawer, SceneVertex};
use crate::uniforms::{SceneUniforms, LightUniforms};
use crate::{engine_debug, engine_error};

pub const SCENE_UNIFORMS_LABEL: &str = "scene_uniforms";
pub const LIGHT_UNIFORMS_LABEL: &str = "light_uniforms";

/// Image sampled by the composite pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeSource {
    /// High tier lighting output
    Native,
    /// Low tier upscale output
    Upscale,
}

impl CompositeSource {
    pub fn for_method(method: UpscaleMethod) -> Self {
        if method.is_upscale() {
            CompositeSource::Upscale
        } else {
            CompositeSource::Native
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompositeSource::Native => "native",
            CompositeSource::Upscale => "upscale",
        }
    }
}

/// A pipeline with its set 0 binding group
#[derive(Clone)]
pub struct PassPipeline {
    pub pipeline: Arc<dyn Pipeline>,
    pub binding_group: Arc<dyn BindingGroup>,
}

pub struct TierPipelines {
    pub gbuffer: PassPipeline,
    pub lighting: PassPipeline,
}

// ===== SHARED HELPERS =====

/// Resolve `relative` through the asset collaborator and load it as SPIR-V
pub fn load_shader(
    device: &mut dyn GraphicsDevice,
    assets: &dyn AssetResolver,
    relative: &str,
    stage: ShaderStage,
) -> Result<Arc<dyn Shader>> {
    let path = assets.resolve(relative)?;
    device.create_shader(ShaderDesc {
        label: relative.to_string(),
        path,
        stage,
        entry_point: "main".to_string(),
    })
}

/// Full-screen triangle pipeline: no vertex input, front faces culled
#[allow(clippy::too_many_arguments)]
pub fn fullscreen_pipeline_desc(
    label: String,
    vertex_shader: Arc<dyn Shader>,
    fragment_shader: Arc<dyn Shader>,
    render_pass: Arc<dyn RenderPass>,
    binding_group_layouts: Vec<BindingGroupLayoutDesc>,
    push_constant_ranges: Vec<PushConstantRange>,
) -> PipelineDesc {
    let color_count = render_pass.desc().color_attachments.len();
    PipelineDesc {
        label,
        vertex_shader,
        fragment_shader,
        vertex_layout: VertexLayout::default(),
        topology: PrimitiveTopology::TriangleList,
        push_constant_ranges,
        binding_group_layouts,
        rasterization: RasterizationState {
            cull_mode: CullMode::Front,
            front_face: FrontFace::CounterClockwise,
        },
        depth_stencil: DepthStencilState::default(),
        color_blend_attachments: vec![ColorBlendAttachment::default(); color_count],
        dynamic_states: vec![DynamicState::Viewport, DynamicState::Scissor],
        fragment_shading_rate: None,
        render_pass,
    }
}

fn sampled(attachment: &Attachment, sampler: SamplerType) -> Result<BindingResource> {
    Ok(BindingResource::SampledTexture(attachment.texture()?.clone(), sampler))
}

// ===== PIPELINE BUILDER =====

pub struct PipelineBuilder {
    /// Retained for the lifetime of the pipelines
    shaders: Vec<Arc<dyn Shader>>,
    scene_uniforms: Arc<dyn Buffer>,
    light_uniforms: Arc<dyn Buffer>,
    low: TierPipelines,
    high: TierPipelines,
    composite_native: PassPipeline,
    composite_upscale: PassPipeline,
}

impl PipelineBuilder {
    /// Build every pipeline and binding group
    ///
    /// `scene.prepare` runs once per G-buffer pipeline so the scene can
    /// create its per-material groups against that pipeline's layout.
    pub fn build(
        device: &mut dyn GraphicsDevice,
        assets: &dyn AssetResolver,
        passes: &PassGraph,
        present: &PresentTargets,
        scene: &mut dyn SceneDrawer,
    ) -> Result<Self> {
        // ========== SHADERS ==========
        let fullscreen_vs = load_shader(device, assets, shaders::FULLSCREEN_VERT, ShaderStage::Vertex)?;
        let swapchain_fs = load_shader(device, assets, shaders::SWAPCHAIN_FRAG, ShaderStage::Fragment)?;
        let light_fs = load_shader(device, assets, shaders::LIGHT_FRAG, ShaderStage::Fragment)?;
        let gbuffer_vs = load_shader(device, assets, shaders::GBUFFER_VERT, ShaderStage::Vertex)?;
        let gbuffer_fs = load_shader(device, assets, shaders::GBUFFER_FRAG, ShaderStage::Fragment)?;

        // ========== UNIFORM BUFFERS ==========
        let scene_uniforms = device.create_buffer(BufferDesc {
            label: SCENE_UNIFORMS_LABEL.to_string(),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: BufferUsage::Uniform,
        })?;
        let light_uniforms = device.create_buffer(BufferDesc {
            label: LIGHT_UNIFORMS_LABEL.to_string(),
            size: std::mem::size_of::<LightUniforms>() as u64,
            usage: BufferUsage::Uniform,
        })?;

        // ========== PER TIER ==========
        let stages = TierStages {
            gbuffer_vs: &gbuffer_vs,
            gbuffer_fs: &gbuffer_fs,
            fullscreen_vs: &fullscreen_vs,
            light_fs: &light_fs,
            scene_uniforms: &scene_uniforms,
            light_uniforms: &light_uniforms,
        };
        let low = Self::build_tier(device, passes, passes.tier(TierKind::Low), &stages, scene)?;
        let high = Self::build_tier(device, passes, passes.tier(TierKind::High), &stages, scene)?;

        // ========== COMPOSITE ==========
        let upscale_output = passes.tier(TierKind::Low).upscale_output.as_ref().ok_or_else(|| {
            engine_error!("sponza::PipelineBuilder", "Low tier has no upscale output");
            Error::InvalidResource("low tier upscale output missing".to_string())
        })?;
        let composite_native = Self::build_composite(
            device, present, CompositeSource::Native, &passes.tier(TierKind::High).light_color,
            &fullscreen_vs, &swapchain_fs,
        )?;
        let composite_upscale = Self::build_composite(
            device, present, CompositeSource::Upscale, upscale_output,
            &fullscreen_vs, &swapchain_fs,
        )?;

        let shaders = vec![fullscreen_vs, swapchain_fs, light_fs, gbuffer_vs, gbuffer_fs];
        engine_debug!(
            "sponza::PipelineBuilder",
            "Built 6 pipelines from {} shaders", shaders.len()
        );

        Ok(Self {
            shaders,
            scene_uniforms,
            light_uniforms,
            low,
            high,
            composite_native,
            composite_upscale,
        })
    }

    fn build_tier(
        device: &mut dyn GraphicsDevice,
        passes: &PassGraph,
        tier: &Tier,
        stages: &TierStages<'_>,
        scene: &mut dyn SceneDrawer,
    ) -> Result<TierPipelines> {
        let suffix = tier.kind.label();

        // G-buffer: set 0 = scene UBO, set 1 = material textures
        let gbuffer_pipeline = device.create_pipeline(PipelineDesc {
            label: format!("gbuffer_{}", suffix),
            vertex_shader: stages.gbuffer_vs.clone(),
            fragment_shader: stages.gbuffer_fs.clone(),
            vertex_layout: SceneVertex::layout(),
            topology: PrimitiveTopology::TriangleList,
            push_constant_ranges: Vec::new(),
            binding_group_layouts: vec![
                BindingGroupLayoutDesc {
                    entries: vec![BindingSlotDesc::uniform(
                        0,
                        ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT,
                    )],
                },
                scene.material_layout(),
            ],
            rasterization: RasterizationState::default(),
            depth_stencil: DepthStencilState::default(),
            color_blend_attachments: vec![ColorBlendAttachment::default(); 4],
            dynamic_states: vec![DynamicState::Viewport, DynamicState::Scissor],
            fragment_shading_rate: None,
            render_pass: passes.gbuffer_pass().clone(),
        })?;
        let gbuffer_group = device.create_binding_group(
            &gbuffer_pipeline,
            0,
            &[BindingResource::UniformBuffer(stages.scene_uniforms.clone())],
        )?;
        scene.prepare(device, &gbuffer_pipeline)?;

        // Lighting: the attachment combiner decides whether VRS applies
        let mut lighting_desc = fullscreen_pipeline_desc(
            format!("lighting_{}", suffix),
            stages.fullscreen_vs.clone(),
            stages.light_fs.clone(),
            passes.lighting_pass().clone(),
            vec![BindingGroupLayoutDesc {
                entries: vec![
                    BindingSlotDesc::fragment_sampler(0),
                    BindingSlotDesc::fragment_sampler(1),
                    BindingSlotDesc::fragment_sampler(2),
                    BindingSlotDesc::uniform(3, ShaderStageFlags::FRAGMENT),
                ],
            }],
            Vec::new(),
        );
        lighting_desc.dynamic_states.push(DynamicState::FragmentShadingRate);
        lighting_desc.fragment_shading_rate = Some(FragmentShadingRateState {
            fragment_size: FragmentSize::FULL,
            combiner_ops: [CombinerOp::Keep, CombinerOp::Replace],
        });
        let lighting_pipeline = device.create_pipeline(lighting_desc)?;
        let lighting_group = device.create_binding_group(
            &lighting_pipeline,
            0,
            &[
                sampled(&tier.position, SamplerType::NearestClamp)?,
                sampled(&tier.normal, SamplerType::NearestClamp)?,
                sampled(&tier.albedo, SamplerType::NearestClamp)?,
                BindingResource::UniformBuffer(stages.light_uniforms.clone()),
            ],
        )?;

        Ok(TierPipelines {
            gbuffer: PassPipeline { pipeline: gbuffer_pipeline, binding_group: gbuffer_group },
            lighting: PassPipeline { pipeline: lighting_pipeline, binding_group: lighting_group },
        })
    }

    fn build_composite(
        device: &mut dyn GraphicsDevice,
        present: &PresentTargets,
        source: CompositeSource,
        image: &Attachment,
        vertex_shader: &Arc<dyn Shader>,
        fragment_shader: &Arc<dyn Shader>,
    ) -> Result<PassPipeline> {
        let pipeline = device.create_pipeline(fullscreen_pipeline_desc(
            format!("composite_{}", source.label()),
            vertex_shader.clone(),
            fragment_shader.clone(),
            present.render_pass().clone(),
            vec![BindingGroupLayoutDesc {
                entries: vec![BindingSlotDesc::fragment_sampler(0)],
            }],
            Vec::new(),
        ))?;
        let binding_group = device.create_binding_group(
            &pipeline,
            0,
            &[sampled(image, SamplerType::NearestClamp)?],
        )?;
        Ok(PassPipeline { pipeline, binding_group })
    }

    /// Write both uniform blocks from the camera
    pub fn update_uniforms(&self, camera: &Camera) -> Result<()> {
        let scene = SceneUniforms::from_camera(camera);
        self.scene_uniforms.update(0, bytemuck::bytes_of(&scene))?;
        let light = LightUniforms::from_camera(camera);
        self.light_uniforms.update(0, bytemuck::bytes_of(&light))
    }

    pub fn tier(&self, kind: TierKind) -> &TierPipelines {
        match kind {
            TierKind::Low => &self.low,
            TierKind::High => &self.high,
        }
    }

    pub fn composite(&self, source: CompositeSource) -> &PassPipeline {
        match source {
            CompositeSource::Native => &self.composite_native,
            CompositeSource::Upscale => &self.composite_upscale,
        }
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn scene_uniforms(&self) -> &Arc<dyn Buffer> {
        &self.scene_uniforms
    }

    pub fn light_uniforms(&self) -> &Arc<dyn Buffer> {
        &self.light_uniforms
    }
}

struct TierStages<'a> {
    gbuffer_vs: &'a Arc<dyn Shader>,
    gbuffer_fs: &'a Arc<dyn Shader>,
    fullscreen_vs: &'a Arc<dyn Shader>,
    light_fs: &'a Arc<dyn Shader>,
    scene_uniforms: &'a Arc<dyn Buffer>,
    light_uniforms: &'a Arc<dyn Buffer>,
}

#[cfg(test)]
#[path = "pipeline_builder_tests.rs"]
mod tests;
