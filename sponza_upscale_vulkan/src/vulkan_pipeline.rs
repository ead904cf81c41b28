/// Pipeline - Vulkan implementation of the Pipeline trait
///
/// A pipeline owns its pipeline layout and the descriptor set layouts of
/// every binding group declared in its descriptor.

use sponza_upscale::sponza::{
    Error, Result,
    render::{
        Pipeline as RendererPipeline, PipelineDesc, BindingGroupLayoutDesc, DynamicState,
        ColorBlendAttachment,
    },
};
use sponza_upscale::{engine_err, engine_warn};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    binding_type_to_vk, stage_flags_to_vk, shader_stages_to_vk, buffer_format_to_vk,
    input_rate_to_vk, topology_to_vk, cull_mode_to_vk, front_face_to_vk, compare_op_to_vk,
    dynamic_state_to_vk, combiner_op_to_vk,
};
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_shader::Shader;

/// Vulkan pipeline implementation
pub struct Pipeline {
    ctx: Arc<GpuContext>,
    /// Vulkan graphics pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Pipeline layout (used for binding groups and push constants)
    pub(crate) pipeline_layout: vk::PipelineLayout,
    /// Descriptor set layouts, index = set number
    pub(crate) set_layouts: Vec<vk::DescriptorSetLayout>,
    /// Layout descriptions the sets were created from
    pub(crate) layout_descs: Vec<BindingGroupLayoutDesc>,
    label: String,
}

impl Pipeline {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &PipelineDesc) -> Result<Self> {
        let render_pass = RenderPass::cast(desc.render_pass.as_ref())?;
        let vertex_shader = Shader::cast(desc.vertex_shader.as_ref())?;
        let fragment_shader = Shader::cast(desc.fragment_shader.as_ref())?;

        if desc.color_blend_attachments.len() != desc.render_pass.desc().color_attachments.len() {
            return Err(Error::InvalidResource(format!(
                "Pipeline '{}' declares {} blend attachment(s) for {} color attachment(s)",
                desc.label,
                desc.color_blend_attachments.len(),
                desc.render_pass.desc().color_attachments.len()
            )));
        }
        if desc.fragment_shading_rate.is_some() && ctx.fragment_shading_rate.is_none() {
            return Err(Error::MissingExtension("VK_KHR_fragment_shading_rate".to_string()));
        }
        for dynamic in [DynamicState::Viewport, DynamicState::Scissor] {
            if !desc.dynamic_states.contains(&dynamic) {
                engine_warn!("sponza::vulkan",
                    "Pipeline '{}' has static {:?} state, the default extent is empty",
                    desc.label, dynamic);
            }
        }

        check_reflected_bindings(desc, vertex_shader);
        check_reflected_bindings(desc, fragment_shader);

        // ===== LAYOUTS =====

        let mut set_layouts = Vec::with_capacity(desc.binding_group_layouts.len());
        for layout_desc in &desc.binding_group_layouts {
            match create_set_layout(&ctx, layout_desc) {
                Ok(layout) => set_layouts.push(layout),
                Err(e) => {
                    destroy_set_layouts(&ctx, &set_layouts);
                    return Err(engine_err!("sponza::vulkan",
                        "Failed to create descriptor set layout for '{}': {:?}", desc.label, e));
                }
            }
        }

        let push_constant_ranges: Vec<vk::PushConstantRange> = desc
            .push_constant_ranges
            .iter()
            .map(|range| vk::PushConstantRange {
                stage_flags: shader_stages_to_vk(&range.stages),
                offset: range.offset,
                size: range.size,
            })
            .collect();

        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);

        let pipeline_layout = match unsafe { ctx.device.create_pipeline_layout(&layout_info, None) } {
            Ok(layout) => layout,
            Err(e) => {
                destroy_set_layouts(&ctx, &set_layouts);
                return Err(engine_err!("sponza::vulkan",
                    "Failed to create pipeline layout for '{}': {:?}", desc.label, e));
            }
        };

        // ===== FIXED-FUNCTION STATE =====

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_shader.module)
                .name(&vertex_shader.entry_point),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_shader.module)
                .name(&fragment_shader.entry_point),
        ];

        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc.vertex_layout.bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: input_rate_to_vk(binding.input_rate),
            })
            .collect();

        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc.vertex_layout.attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: buffer_format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.topology))
            .primitive_restart_enable(false);

        // Viewport state (dynamic)
        let viewports = [vk::Viewport::default()];
        let scissors = [vk::Rect2D::default()];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(desc.rasterization.cull_mode))
            .front_face(front_face_to_vk(desc.rasterization.front_face))
            .depth_bias_enable(false);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth_stencil.depth_test_enable)
            .depth_write_enable(desc.depth_stencil.depth_write_enable)
            .depth_compare_op(compare_op_to_vk(desc.depth_stencil.depth_compare_op))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> =
            desc.color_blend_attachments.iter().map(blend_attachment).collect();
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let dynamic_states: Vec<vk::DynamicState> =
            desc.dynamic_states.iter().copied().map(dynamic_state_to_vk).collect();
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let mut shading_rate_state = desc.fragment_shading_rate.map(|state| {
            vk::PipelineFragmentShadingRateStateCreateInfoKHR::default()
                .fragment_size(vk::Extent2D {
                    width: state.fragment_size.width,
                    height: state.fragment_size.height,
                })
                .combiner_ops([
                    combiner_op_to_vk(state.combiner_ops[0]),
                    combiner_op_to_vk(state.combiner_ops[1]),
                ])
        });

        let mut pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(pipeline_layout)
            .render_pass(render_pass.render_pass)
            .subpass(0);
        if let Some(shading_rate_state) = shading_rate_state.as_mut() {
            pipeline_info = pipeline_info.push_next(shading_rate_state);
        }

        let pipelines = unsafe {
            ctx.device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe { ctx.device.destroy_pipeline_layout(pipeline_layout, None); }
                destroy_set_layouts(&ctx, &set_layouts);
                return Err(engine_err!("sponza::vulkan",
                    "Failed to create graphics pipeline '{}': {:?}", desc.label, e));
            }
        };

        Ok(Self {
            ctx,
            pipeline,
            pipeline_layout,
            set_layouts,
            layout_descs: desc.binding_group_layouts.clone(),
            label: desc.label.clone(),
        })
    }

    /// Downcast a pipeline created by this backend
    pub(crate) fn cast(pipeline: &dyn RendererPipeline) -> Result<&Self> {
        pipeline.as_any().downcast_ref::<Self>().ok_or_else(|| {
            Error::InvalidResource(format!(
                "Pipeline '{}' was not created by the Vulkan device",
                pipeline.label()
            ))
        })
    }
}

fn create_set_layout(
    ctx: &GpuContext,
    layout_desc: &BindingGroupLayoutDesc,
) -> std::result::Result<vk::DescriptorSetLayout, vk::Result> {
    let bindings: Vec<vk::DescriptorSetLayoutBinding> = layout_desc.entries
        .iter()
        .map(|entry| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(entry.binding)
                .descriptor_type(binding_type_to_vk(entry.binding_type))
                .descriptor_count(entry.count)
                .stage_flags(stage_flags_to_vk(entry.stage_flags))
        })
        .collect();

    let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
    unsafe { ctx.device.create_descriptor_set_layout(&create_info, None) }
}

fn destroy_set_layouts(ctx: &GpuContext, layouts: &[vk::DescriptorSetLayout]) {
    for layout in layouts {
        unsafe { ctx.device.destroy_descriptor_set_layout(*layout, None); }
    }
}

fn blend_attachment(attachment: &ColorBlendAttachment) -> vk::PipelineColorBlendAttachmentState {
    let state = vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(attachment.blend_enable);
    if !attachment.blend_enable {
        return state;
    }
    state
        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .color_blend_op(vk::BlendOp::ADD)
        .src_alpha_blend_factor(vk::BlendFactor::ONE)
        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
        .alpha_blend_op(vk::BlendOp::ADD)
}

/// Warn about shader bindings the declared layouts do not provide
fn check_reflected_bindings(desc: &PipelineDesc, shader: &Shader) {
    for reflected in &shader.bindings {
        let declared = desc.binding_group_layouts
            .get(reflected.set as usize)
            .and_then(|layout| layout.entries.iter().find(|entry| entry.binding == reflected.binding));

        match (declared, reflected.binding_type) {
            (None, _) => engine_warn!("sponza::vulkan",
                "Pipeline '{}': shader uses set {} binding {} which no layout declares",
                desc.label, reflected.set, reflected.binding),
            (Some(entry), Some(binding_type)) if entry.binding_type != binding_type => {
                engine_warn!("sponza::vulkan",
                    "Pipeline '{}': set {} binding {} is {:?} in the shader, {:?} in the layout",
                    desc.label, reflected.set, reflected.binding, binding_type, entry.binding_type)
            }
            _ => {}
        }
    }
}

impl RendererPipeline for Pipeline {
    fn label(&self) -> &str {
        &self.label
    }

    fn binding_group_layout_count(&self) -> u32 {
        self.set_layouts.len() as u32
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
        destroy_set_layouts(&self.ctx, &self.set_layouts);
    }
}
