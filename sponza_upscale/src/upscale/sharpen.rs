/// Two-pass sharpen upscale
///
/// EASU (edge-adaptive spatial upsample) writes a full-size intermediate from
/// the low tier lighting output; RCAS (contrast-adaptive sharpen) reads the
/// intermediate and writes the upscale output. Both are full-screen
/// triangles in one shared render pass.

use std::sync::Arc;

use crate::asset::{AssetResolver, shaders};
use crate::config::{RenderConfig, UpscaleMethod};
use crate::error::Result;
use crate::frame_graph::Attachment;
use crate::graphics_device::{
    GraphicsDevice, CommandList, RenderPass, RenderPassDesc, AttachmentDesc, Framebuffer,
    FramebufferDesc, Pipeline, BindingGroup, BindingGroupLayoutDesc, BindingSlotDesc,
    BindingResource, SamplerType, ShaderStage, ShaderStageFlags, Shader, Buffer, BufferDesc,
    BufferUsage, PushConstantRange, SubpassDependency, SubpassRef, PipelineStages, AccessFlags,
    ImageLayout, ImageBarrier, ClearValue, Viewport, Rect2D, Extent2D, Texture, TextureFormat,
};
use crate::pipeline_builder::{load_shader, fullscreen_pipeline_desc};
use crate::uniforms::{SharpenUniforms, EasuPushConstants};
use crate::upscale::{UpscaleBackend, UpscaleTargets};
use crate::engine_debug;

pub const SHARPEN_PASS_LABEL: &str = "sharpen";
pub const EASU_INTERMEDIATE_LABEL: &str = "easu_intermediate";

const SHARPEN_CLEAR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

pub struct SharpenUpscale {
    render_pass: Arc<dyn RenderPass>,
    intermediate: Attachment,
    easu_framebuffer: Arc<dyn Framebuffer>,
    rcas_framebuffer: Arc<dyn Framebuffer>,
    easu_pipeline: Arc<dyn Pipeline>,
    easu_group: Arc<dyn BindingGroup>,
    rcas_pipeline: Arc<dyn Pipeline>,
    rcas_group: Arc<dyn BindingGroup>,
    _uniforms: Arc<dyn Buffer>,
    _shaders: Vec<Arc<dyn Shader>>,
    output: Arc<dyn Texture>,
    output_size: Extent2D,
    output_region: Rect2D,
    push_constants: EasuPushConstants,
}

impl SharpenUpscale {
    /// Single color target left readable by the composite pass
    pub fn render_pass_desc() -> RenderPassDesc {
        let attachment_access = AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE;
        RenderPassDesc {
            label: SHARPEN_PASS_LABEL.to_string(),
            color_attachments: vec![AttachmentDesc::cleared(
                TextureFormat::R8G8B8A8_UNORM,
                ImageLayout::ShaderReadOnly,
            )],
            depth_attachment: None,
            shading_rate_attachment: None,
            dependencies: vec![
                SubpassDependency {
                    src_subpass: SubpassRef::External,
                    dst_subpass: SubpassRef::Index(0),
                    src_stages: PipelineStages::BOTTOM_OF_PIPE,
                    dst_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                    src_access: AccessFlags::MEMORY_READ,
                    dst_access: attachment_access,
                    by_region: true,
                },
                SubpassDependency {
                    src_subpass: SubpassRef::Index(0),
                    dst_subpass: SubpassRef::External,
                    src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                    dst_stages: PipelineStages::BOTTOM_OF_PIPE,
                    src_access: attachment_access,
                    dst_access: AccessFlags::MEMORY_READ,
                    by_region: true,
                },
            ],
        }
    }

    pub(crate) fn build(
        device: &mut dyn GraphicsDevice,
        assets: &dyn AssetResolver,
        targets: UpscaleTargets,
        config: &RenderConfig,
    ) -> Result<Self> {
        let output_size = targets.output_region.extent();

        // ========== TARGETS ==========
        let intermediate = Attachment::color(
            device,
            EASU_INTERMEDIATE_LABEL,
            TextureFormat::R8G8B8A8_UNORM,
            output_size,
        )?;
        let render_pass = device.create_render_pass(&Self::render_pass_desc())?;
        let easu_framebuffer = Self::framebuffer(device, &render_pass, intermediate.texture()?, output_size)?;
        let rcas_framebuffer = Self::framebuffer(device, &render_pass, &targets.output, output_size)?;

        // ========== UNIFORMS ==========
        let uniforms = device.create_buffer(BufferDesc {
            label: "sharpen_uniforms".to_string(),
            size: std::mem::size_of::<SharpenUniforms>() as u64,
            usage: BufferUsage::Uniform,
        })?;
        uniforms.update(0, bytemuck::bytes_of(&SharpenUniforms::new(config.sharpen_sharpness)))?;

        // ========== PIPELINES ==========
        let vertex = load_shader(device, assets, shaders::SHARPEN_VERT, ShaderStage::Vertex)?;
        let easu_fs = load_shader(device, assets, shaders::EASU_FRAG, ShaderStage::Fragment)?;
        let rcas_fs = load_shader(device, assets, shaders::RCAS_FRAG, ShaderStage::Fragment)?;

        let easu_pipeline = device.create_pipeline(fullscreen_pipeline_desc(
            "easu".to_string(),
            vertex.clone(),
            easu_fs.clone(),
            render_pass.clone(),
            vec![BindingGroupLayoutDesc {
                entries: vec![BindingSlotDesc::fragment_sampler(0)],
            }],
            vec![PushConstantRange {
                stages: vec![ShaderStage::Fragment],
                offset: 0,
                size: std::mem::size_of::<EasuPushConstants>() as u32,
            }],
        ))?;
        let easu_group = device.create_binding_group(
            &easu_pipeline,
            0,
            &[BindingResource::SampledTexture(targets.input.clone(), SamplerType::NearestClampSingleLod)],
        )?;

        let rcas_pipeline = device.create_pipeline(fullscreen_pipeline_desc(
            "rcas".to_string(),
            vertex.clone(),
            rcas_fs.clone(),
            render_pass.clone(),
            vec![BindingGroupLayoutDesc {
                entries: vec![
                    BindingSlotDesc::uniform(0, ShaderStageFlags::FRAGMENT),
                    BindingSlotDesc::fragment_sampler(1),
                ],
            }],
            Vec::new(),
        ))?;
        let rcas_group = device.create_binding_group(
            &rcas_pipeline,
            0,
            &[
                BindingResource::UniformBuffer(uniforms.clone()),
                BindingResource::SampledTexture(
                    intermediate.texture()?.clone(),
                    SamplerType::NearestClampSingleLod,
                ),
            ],
        )?;

        let push_constants = EasuPushConstants {
            width: targets.input_region.width,
            height: targets.input_region.height,
            offset_x: targets.input_region.x.max(0) as u32,
            offset_y: targets.input_region.y.max(0) as u32,
        };
        engine_debug!(
            "sponza::SharpenUpscale",
            "EASU {}x{} -> {}x{}, RCAS sharpness {}",
            push_constants.width, push_constants.height,
            output_size.width, output_size.height,
            config.sharpen_sharpness
        );

        Ok(Self {
            render_pass,
            intermediate,
            easu_framebuffer,
            rcas_framebuffer,
            easu_pipeline,
            easu_group,
            rcas_pipeline,
            rcas_group,
            _uniforms: uniforms,
            _shaders: vec![vertex, easu_fs, rcas_fs],
            output: targets.output,
            output_size,
            output_region: targets.output_region,
            push_constants,
        })
    }

    fn framebuffer(
        device: &mut dyn GraphicsDevice,
        render_pass: &Arc<dyn RenderPass>,
        target: &Arc<dyn Texture>,
        size: Extent2D,
    ) -> Result<Arc<dyn Framebuffer>> {
        device.create_framebuffer(&FramebufferDesc {
            render_pass,
            color_attachments: vec![target.clone()],
            depth_attachment: None,
            shading_rate_attachment: None,
            width: size.width,
            height: size.height,
        })
    }

    pub fn intermediate(&self) -> &Attachment {
        &self.intermediate
    }
}

impl UpscaleBackend for SharpenUpscale {
    fn method(&self) -> UpscaleMethod {
        UpscaleMethod::SharpenUpscale
    }

    fn output(&self) -> &Arc<dyn Texture> {
        &self.output
    }

    fn record(&self, cmd: &mut dyn CommandList) -> Result<()> {
        let clear = [ClearValue::Color(SHARPEN_CLEAR)];

        // EASU into the intermediate
        cmd.begin_render_pass(&self.render_pass, &self.easu_framebuffer, &clear)?;
        cmd.set_viewport(Viewport::full(self.output_size))?;
        cmd.set_scissor(Rect2D::full(self.output_size))?;
        cmd.bind_binding_group(&self.easu_pipeline, 0, &self.easu_group)?;
        cmd.bind_pipeline(&self.easu_pipeline)?;
        cmd.push_constants(&[ShaderStage::Fragment], 0, bytemuck::bytes_of(&self.push_constants))?;
        cmd.draw(3, 0)?;
        cmd.end_render_pass()?;

        cmd.image_barrier(&ImageBarrier {
            texture: self.intermediate.texture()?.clone(),
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessFlags::SHADER_READ,
            // EASU render pass final layout; the contents must survive
            old_layout: ImageLayout::ShaderReadOnly,
            new_layout: ImageLayout::ShaderReadOnly,
        })?;

        // RCAS into the upscale output, viewport limited to the output region
        cmd.begin_render_pass(&self.render_pass, &self.rcas_framebuffer, &clear)?;
        cmd.set_viewport(Viewport::from_rect(self.output_region))?;
        cmd.set_scissor(Rect2D::full(self.output_size))?;
        cmd.bind_binding_group(&self.rcas_pipeline, 0, &self.rcas_group)?;
        cmd.bind_pipeline(&self.rcas_pipeline)?;
        cmd.draw(3, 0)?;
        cmd.end_render_pass()
    }

    fn draw_count(&self) -> usize {
        2
    }
}
