/// Mock graphics device for unit tests (no GPU required)
///
/// Every created object is tracked in a shared `MockDeviceLog` and every
/// recorded command is kept as a typed `RecordedCommand`, so tests can assert
/// on pass order, bound resources and object lifetimes.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use glam::Mat4;

use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, DeviceCapabilities, FormatFeature,
    XEG_SPATIAL_UPSCALE_EXTENSION_NAME, XEG_ADAPTIVE_VRS_EXTENSION_NAME,
    Texture, TextureDesc, TextureInfo, TextureFormat, Buffer, BufferDesc,
    Shader, ShaderDesc, ShaderStage, RenderPass, RenderPassDesc,
    Framebuffer, FramebufferDesc, Pipeline, PipelineDesc,
    BindingGroup, BindingResource, CommandList, Swapchain, SwapchainStatus,
    SpatialUpscaler, SpatialUpscaleDesc, VrsDispatcher, VrsDispatcherDesc, VrsDispatchDesc,
    Viewport, Rect2D, ClearValue, ImageBarrier, IndexType, FragmentSize, CombinerOp,
    ImageLayout, AccessFlags, PipelineStages, TextureUsage,
};
use crate::engine_bail;

// ============================================================================
// Mock Texture
// ============================================================================

pub struct MockTexture {
    pub info: TextureInfo,
}

impl MockTexture {
    pub fn new(desc: &TextureDesc) -> Self {
        Self { info: TextureInfo::from(desc) }
    }
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Buffer
// ============================================================================

pub struct MockBuffer {
    pub label: String,
    pub data: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(desc: &BufferDesc) -> Self {
        Self {
            label: desc.label.clone(),
            data: Mutex::new(vec![0; desc.size as usize]),
        }
    }

    /// Copy of the current contents
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl Buffer for MockBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut bytes = self
            .data
            .lock()
            .map_err(|_| Error::BackendError("mock buffer poisoned".to_string()))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > bytes.len() {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} exceeds buffer '{}' ({} bytes)",
                data.len(), offset, self.label, bytes.len()
            )));
        }
        bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.lock().map(|d| d.len() as u64).unwrap_or(0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Shader / RenderPass / Framebuffer / Pipeline / BindingGroup
// ============================================================================

pub struct MockShader {
    pub label: String,
    pub stage: ShaderStage,
}

impl Shader for MockShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockRenderPass {
    pub desc: RenderPassDesc,
}

impl RenderPass for MockRenderPass {
    fn desc(&self) -> &RenderPassDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockFramebuffer {
    pub render_pass_label: String,
    pub width: u32,
    pub height: u32,
    pub attachments: Vec<Arc<dyn Texture>>,
}

impl Framebuffer for MockFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn attachments(&self) -> &[Arc<dyn Texture>] {
        &self.attachments
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockPipeline {
    pub desc: PipelineDesc,
}

impl Pipeline for MockPipeline {
    fn label(&self) -> &str {
        &self.desc.label
    }

    fn binding_group_layout_count(&self) -> u32 {
        self.desc.binding_group_layouts.len() as u32
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockBindingGroup {
    pub pipeline_label: String,
    pub set_index: u32,
    pub resources: Vec<BindingResource>,
}

impl BindingGroup for MockBindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }

    fn resources(&self) -> &[BindingResource] {
        &self.resources
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

/// One recorded command
#[derive(Clone)]
pub enum RecordedCommand {
    Begin,
    End,
    BeginRenderPass {
        label: String,
        framebuffer: Arc<dyn Framebuffer>,
        clear_values: Vec<ClearValue>,
    },
    EndRenderPass,
    SetViewport(Viewport),
    SetScissor(Rect2D),
    BindPipeline(String),
    BindBindingGroup {
        set_index: u32,
        group: Arc<dyn BindingGroup>,
    },
    PushConstants {
        stages: Vec<ShaderStage>,
        offset: u32,
        data: Vec<u8>,
    },
    BindVertexBuffer,
    BindIndexBuffer(IndexType),
    Draw { vertex_count: u32 },
    DrawIndexed { index_count: u32 },
    SetFragmentShadingRate {
        fragment_size: FragmentSize,
        combiner_ops: [CombinerOp; 2],
    },
    ImageBarrier {
        texture: String,
        src_stages: PipelineStages,
        dst_stages: PipelineStages,
        src_access: AccessFlags,
        dst_access: AccessFlags,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    },
    SpatialUpscale {
        input: Arc<dyn Texture>,
        output: Arc<dyn Texture>,
    },
    VrsDispatch {
        input_width: u32,
        color: String,
        depth: String,
        shading_rate: String,
        reprojection: Option<Mat4>,
    },
}

/// Command list that validates nesting and keeps every command
pub struct MockCommandList {
    pub commands: Vec<RecordedCommand>,
    recording: bool,
    in_render_pass: bool,
    /// Number of times `begin` reset the list
    pub reset_count: usize,
}

impl MockCommandList {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            recording: false,
            in_render_pass: false,
            reset_count: 0,
        }
    }

    fn push(&mut self, command: RecordedCommand) -> Result<()> {
        if !self.recording {
            engine_bail!("sponza::Mock", "command recorded outside begin/end");
        }
        self.commands.push(command);
        Ok(())
    }

    fn push_in_pass(&mut self, command: RecordedCommand) -> Result<()> {
        if !self.in_render_pass {
            engine_bail!("sponza::Mock", "draw-state command recorded outside a render pass");
        }
        self.push(command)
    }

    /// Labels of the render passes, in begin order
    pub fn render_pass_labels(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::BeginRenderPass { label, .. } => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of render passes whose label is `label`
    pub fn render_pass_count(&self, label: &str) -> usize {
        self.render_pass_labels().iter().filter(|l| l.as_str() == label).count()
    }

    /// Commands recorded between the begin and end of each pass labelled `label`
    pub fn pass_bodies(&self, label: &str) -> Vec<Vec<RecordedCommand>> {
        let mut bodies = Vec::new();
        let mut current: Option<Vec<RecordedCommand>> = None;
        for command in &self.commands {
            match command {
                RecordedCommand::BeginRenderPass { label: l, .. } if l == label => {
                    current = Some(Vec::new());
                }
                RecordedCommand::EndRenderPass => {
                    if let Some(body) = current.take() {
                        bodies.push(body);
                    }
                }
                other => {
                    if let Some(body) = current.as_mut() {
                        body.push(other.clone());
                    }
                }
            }
        }
        bodies
    }

    /// Draw calls recorded inside passes labelled `label`
    pub fn draw_count_in(&self, label: &str) -> usize {
        self.pass_bodies(label)
            .iter()
            .flatten()
            .filter(|c| matches!(c, RecordedCommand::Draw { .. } | RecordedCommand::DrawIndexed { .. }))
            .count()
    }

    /// Number of VRS dispatches
    pub fn vrs_dispatch_count(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, RecordedCommand::VrsDispatch { .. })).count()
    }

    /// Number of vendor spatial upscale calls
    pub fn spatial_upscale_count(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, RecordedCommand::SpatialUpscale { .. })).count()
    }

    /// Every shading-rate combiner pair set in this list
    pub fn combiner_ops(&self) -> Vec<[CombinerOp; 2]> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::SetFragmentShadingRate { combiner_ops, .. } => Some(*combiner_ops),
                _ => None,
            })
            .collect()
    }

    /// Framebuffers referenced by render-pass begins
    pub fn framebuffers(&self) -> Vec<Arc<dyn Framebuffer>> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::BeginRenderPass { framebuffer, .. } => Some(framebuffer.clone()),
                _ => None,
            })
            .collect()
    }

    /// Binding groups bound inside passes labelled `label`
    pub fn binding_groups_in(&self, label: &str) -> Vec<Arc<dyn BindingGroup>> {
        self.pass_bodies(label)
            .into_iter()
            .flatten()
            .filter_map(|c| match c {
                RecordedCommand::BindBindingGroup { group, .. } => Some(group),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockCommandList {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail!("sponza::Mock", "begin called on a list already recording");
        }
        self.commands.clear();
        self.reset_count += 1;
        self.recording = true;
        self.commands.push(RecordedCommand::Begin);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if self.in_render_pass {
            engine_bail!("sponza::Mock", "end called inside a render pass");
        }
        self.push(RecordedCommand::End)?;
        self.recording = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        if self.in_render_pass {
            engine_bail!("sponza::Mock", "nested render pass '{}'", render_pass.desc().label);
        }
        let expected = render_pass.desc().attachment_count();
        if framebuffer.attachments().len() != expected {
            engine_bail!(
                "sponza::Mock",
                "framebuffer has {} attachments, pass '{}' expects {}",
                framebuffer.attachments().len(), render_pass.desc().label, expected
            );
        }
        self.push(RecordedCommand::BeginRenderPass {
            label: render_pass.desc().label.clone(),
            framebuffer: framebuffer.clone(),
            clear_values: clear_values.to_vec(),
        })?;
        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        if !self.in_render_pass {
            engine_bail!("sponza::Mock", "end_render_pass without begin");
        }
        self.in_render_pass = false;
        self.push(RecordedCommand::EndRenderPass)
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.push_in_pass(RecordedCommand::SetViewport(viewport))
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.push_in_pass(RecordedCommand::SetScissor(scissor))
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.push_in_pass(RecordedCommand::BindPipeline(pipeline.label().to_string()))
    }

    fn bind_binding_group(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        self.push_in_pass(RecordedCommand::BindBindingGroup {
            set_index,
            group: binding_group.clone(),
        })
    }

    fn push_constants(&mut self, stages: &[ShaderStage], offset: u32, data: &[u8]) -> Result<()> {
        self.push_in_pass(RecordedCommand::PushConstants {
            stages: stages.to_vec(),
            offset,
            data: data.to_vec(),
        })
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.push_in_pass(RecordedCommand::BindVertexBuffer)
    }

    fn bind_index_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64, index_type: IndexType) -> Result<()> {
        self.push_in_pass(RecordedCommand::BindIndexBuffer(index_type))
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) -> Result<()> {
        self.push_in_pass(RecordedCommand::Draw { vertex_count })
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) -> Result<()> {
        self.push_in_pass(RecordedCommand::DrawIndexed { index_count })
    }

    fn set_fragment_shading_rate(
        &mut self,
        fragment_size: FragmentSize,
        combiner_ops: [CombinerOp; 2],
    ) -> Result<()> {
        self.push_in_pass(RecordedCommand::SetFragmentShadingRate { fragment_size, combiner_ops })
    }

    fn image_barrier(&mut self, barrier: &ImageBarrier) -> Result<()> {
        if self.in_render_pass {
            engine_bail!("sponza::Mock", "image barrier inside a render pass");
        }
        self.push(RecordedCommand::ImageBarrier {
            texture: barrier.texture.info().label.clone(),
            src_stages: barrier.src_stages,
            dst_stages: barrier.dst_stages,
            src_access: barrier.src_access,
            dst_access: barrier.dst_access,
            old_layout: barrier.old_layout,
            new_layout: barrier.new_layout,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Downcast a command list recorded by the mock device
pub fn as_mock(cmd: &dyn CommandList) -> &MockCommandList {
    cmd.as_any()
        .downcast_ref::<MockCommandList>()
        .expect("command list is not a MockCommandList")
}

// ============================================================================
// Mock vendor kernels
// ============================================================================

pub struct MockSpatialUpscaler {
    pub desc: SpatialUpscaleDesc,
}

impl SpatialUpscaler for MockSpatialUpscaler {
    fn record(
        &self,
        cmd: &mut dyn CommandList,
        input: &Arc<dyn Texture>,
        output: &Arc<dyn Texture>,
    ) -> Result<()> {
        let Some(list) = cmd.as_any_mut().downcast_mut::<MockCommandList>() else {
            engine_bail!("sponza::Mock", "spatial upscale recorded into a foreign command list");
        };
        if list.in_render_pass {
            engine_bail!("sponza::Mock", "spatial upscale inside a render pass");
        }
        list.push(RecordedCommand::SpatialUpscale {
            input: input.clone(),
            output: output.clone(),
        })
    }
}

pub struct MockVrsDispatcher {
    pub desc: VrsDispatcherDesc,
}

impl VrsDispatcher for MockVrsDispatcher {
    fn dispatch(&self, cmd: &mut dyn CommandList, desc: &VrsDispatchDesc<'_>) -> Result<()> {
        let Some(list) = cmd.as_any_mut().downcast_mut::<MockCommandList>() else {
            engine_bail!("sponza::Mock", "VRS dispatch recorded into a foreign command list");
        };
        if list.in_render_pass {
            engine_bail!("sponza::Mock", "VRS dispatch inside a render pass");
        }
        list.push(RecordedCommand::VrsDispatch {
            input_width: self.desc.input_size.width,
            color: desc.color.info().label.clone(),
            depth: desc.depth.info().label.clone(),
            shading_rate: desc.shading_rate.info().label.clone(),
            reprojection: desc.reprojection,
        })
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

/// Scripted behavior and counters shared with the test
#[derive(Default)]
pub struct MockSwapchainState {
    /// Statuses returned by successive acquires (Optimal when empty)
    pub acquire_script: VecDeque<SwapchainStatus>,
    /// Statuses returned by successive presents (Optimal when empty)
    pub present_script: VecDeque<SwapchainStatus>,
    pub acquired: usize,
    pub presented: Vec<u32>,
    pub recreated: Vec<(u32, u32)>,
}

pub struct MockSwapchain {
    width: u32,
    height: u32,
    images: Vec<Arc<dyn Texture>>,
    next_image: u32,
    pub state: Arc<Mutex<MockSwapchainState>>,
}

impl MockSwapchain {
    pub fn new(width: u32, height: u32, image_count: usize) -> Self {
        Self {
            width,
            height,
            images: Self::make_images(width, height, image_count),
            next_image: 0,
            state: Arc::new(Mutex::new(MockSwapchainState::default())),
        }
    }

    fn make_images(width: u32, height: u32, count: usize) -> Vec<Arc<dyn Texture>> {
        (0..count)
            .map(|i| {
                Arc::new(MockTexture::new(&TextureDesc {
                    label: format!("swapchain_{}", i),
                    width,
                    height,
                    format: TextureFormat::B8G8R8A8_UNORM,
                    usage: TextureUsage::COLOR_ATTACHMENT,
                })) as Arc<dyn Texture>
            })
            .collect()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockSwapchainState>> {
        self.state
            .lock()
            .map_err(|_| Error::BackendError("mock swapchain poisoned".to_string()))
    }
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self) -> Result<(u32, SwapchainStatus)> {
        let count = self.images.len() as u32;
        let index = self.next_image;
        let status = {
            let mut state = self.lock()?;
            state.acquired += 1;
            state.acquire_script.pop_front().unwrap_or(SwapchainStatus::Optimal)
        };
        if status != SwapchainStatus::OutOfDate {
            self.next_image = (self.next_image + 1) % count;
        }
        Ok((index, status))
    }

    fn present(&mut self, image_index: u32) -> Result<SwapchainStatus> {
        let mut state = self.lock()?;
        state.presented.push(image_index);
        Ok(state.present_script.pop_front().unwrap_or(SwapchainStatus::Optimal))
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        self.images = Self::make_images(width, height, self.images.len());
        self.next_image = 0;
        self.lock()?.recreated.push((width, height));
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::B8G8R8A8_UNORM
    }

    fn image(&self, index: usize) -> Option<Arc<dyn Texture>> {
        self.images.get(index).cloned()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// Everything the mock device created, shared with the test
#[derive(Default)]
pub struct MockDeviceLog {
    pub textures: Vec<Weak<MockTexture>>,
    pub buffers: Vec<Arc<MockBuffer>>,
    pub shaders: Vec<ShaderDesc>,
    pub render_passes: Vec<RenderPassDesc>,
    pub framebuffers: usize,
    pub pipelines: Vec<String>,
    pub binding_groups: usize,
    pub command_lists: usize,
    pub spatial_upscalers: Vec<SpatialUpscaleDesc>,
    pub vrs_dispatchers: Vec<VrsDispatcherDesc>,
    pub submits: Vec<u32>,
    pub queue_wait_idle: usize,
    pub wait_idle: usize,
}

impl MockDeviceLog {
    /// Number of textures labelled `label` still alive
    pub fn live_textures(&self, label: &str) -> usize {
        self.textures
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|t| t.info.label == label)
            .count()
    }

    /// Live texture labelled `label`, if exactly one exists
    pub fn live_texture(&self, label: &str) -> Option<Arc<MockTexture>> {
        let mut live = self
            .textures
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|t| t.info.label == label);
        let first = live.next();
        if live.next().is_some() {
            return None;
        }
        first
    }

    /// Uniform buffer labelled `label`
    pub fn buffer(&self, label: &str) -> Option<Arc<MockBuffer>> {
        self.buffers.iter().find(|b| b.label == label).cloned()
    }
}

pub struct MockGraphicsDevice {
    pub capabilities: DeviceCapabilities,
    pub depth_format: TextureFormat,
    /// (format, feature) pairs reported as unsupported
    pub unsupported_features: Vec<(TextureFormat, FormatFeature)>,
    /// Object labels whose creation fails
    pub fail_labels: Vec<String>,
    pub log: Arc<Mutex<MockDeviceLog>>,
}

impl MockGraphicsDevice {
    /// Device exposing every required extension and feature
    pub fn new() -> Self {
        Self {
            capabilities: DeviceCapabilities {
                extensions: vec![
                    XEG_SPATIAL_UPSCALE_EXTENSION_NAME.to_string(),
                    XEG_ADAPTIVE_VRS_EXTENSION_NAME.to_string(),
                    "VK_KHR_create_renderpass2".to_string(),
                    "VK_KHR_fragment_shading_rate".to_string(),
                ],
                renderpass2: true,
                pipeline_fragment_shading_rate: true,
                attachment_fragment_shading_rate: true,
                primitive_fragment_shading_rate: false,
            },
            depth_format: TextureFormat::D32_FLOAT,
            unsupported_features: Vec::new(),
            fail_labels: Vec::new(),
            log: Arc::new(Mutex::new(MockDeviceLog::default())),
        }
    }

    /// Shared handle on the creation log
    pub fn log(&self) -> Arc<Mutex<MockDeviceLog>> {
        self.log.clone()
    }

    fn record<F: FnOnce(&mut MockDeviceLog)>(&self, f: F) -> Result<()> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| Error::BackendError("mock device log poisoned".to_string()))?;
        f(&mut log);
        Ok(())
    }

    fn check_label(&self, label: &str) -> Result<()> {
        if self.fail_labels.iter().any(|l| l == label) {
            engine_bail!("sponza::Mock", "scripted creation failure for '{}'", label);
        }
        Ok(())
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn supports_format_feature(&self, format: TextureFormat, feature: FormatFeature) -> bool {
        !self.unsupported_features.contains(&(format, feature))
    }

    fn depth_format(&self) -> TextureFormat {
        self.depth_format
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        self.check_label(&desc.label)?;
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource(format!("texture '{}' has zero size", desc.label)));
        }
        let texture = Arc::new(MockTexture::new(&desc));
        let weak = Arc::downgrade(&texture);
        self.record(|log| log.textures.push(weak))?;
        Ok(texture)
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        self.check_label(&desc.label)?;
        let buffer = Arc::new(MockBuffer::new(&desc));
        let tracked = buffer.clone();
        self.record(|log| log.buffers.push(tracked))?;
        Ok(buffer)
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        self.check_label(&desc.label)?;
        let shader = Arc::new(MockShader { label: desc.label.clone(), stage: desc.stage });
        self.record(|log| log.shaders.push(desc))?;
        Ok(shader)
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        self.check_label(&desc.label)?;
        if desc.requires_renderpass2() && !self.capabilities.renderpass2 {
            engine_bail!("sponza::Mock", "pass '{}' needs renderpass2", desc.label);
        }
        self.record(|log| log.render_passes.push(desc.clone()))?;
        Ok(Arc::new(MockRenderPass { desc: desc.clone() }))
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        let attachments = desc.ordered_attachments();
        let pass = desc.render_pass.desc();
        if attachments.len() != pass.attachment_count() {
            engine_bail!(
                "sponza::Mock",
                "framebuffer for '{}' has {} attachments, expected {}",
                pass.label, attachments.len(), pass.attachment_count()
            );
        }
        self.record(|log| log.framebuffers += 1)?;
        Ok(Arc::new(MockFramebuffer {
            render_pass_label: pass.label.clone(),
            width: desc.width,
            height: desc.height,
            attachments,
        }))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        self.check_label(&desc.label)?;
        let expected = desc.render_pass.desc().color_attachments.len();
        if desc.color_blend_attachments.len() != expected {
            engine_bail!(
                "sponza::Mock",
                "pipeline '{}' has {} blend attachments, pass has {} colors",
                desc.label, desc.color_blend_attachments.len(), expected
            );
        }
        let label = desc.label.clone();
        self.record(|log| log.pipelines.push(label))?;
        Ok(Arc::new(MockPipeline { desc }))
    }

    fn create_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        if set_index >= pipeline.binding_group_layout_count() {
            engine_bail!(
                "sponza::Mock",
                "set {} out of range for pipeline '{}'",
                set_index, pipeline.label()
            );
        }
        self.record(|log| log.binding_groups += 1)?;
        Ok(Arc::new(MockBindingGroup {
            pipeline_label: pipeline.label().to_string(),
            set_index,
            resources: resources.to_vec(),
        }))
    }

    fn create_command_lists(&mut self, count: usize) -> Result<Vec<Box<dyn CommandList>>> {
        self.record(|log| log.command_lists += count)?;
        Ok((0..count)
            .map(|_| Box::new(MockCommandList::new()) as Box<dyn CommandList>)
            .collect())
    }

    fn create_spatial_upscaler(&mut self, desc: &SpatialUpscaleDesc) -> Result<Box<dyn SpatialUpscaler>> {
        self.check_label("spatial_upscaler")?;
        let desc = *desc;
        self.record(|log| log.spatial_upscalers.push(desc))?;
        Ok(Box::new(MockSpatialUpscaler { desc }))
    }

    fn create_vrs_dispatcher(&mut self, desc: &VrsDispatcherDesc) -> Result<Box<dyn VrsDispatcher>> {
        self.check_label("vrs_dispatcher")?;
        let desc = *desc;
        self.record(|log| log.vrs_dispatchers.push(desc))?;
        Ok(Box::new(MockVrsDispatcher { desc }))
    }

    fn submit(
        &mut self,
        command_list: &dyn CommandList,
        _swapchain: &dyn Swapchain,
        image_index: u32,
    ) -> Result<()> {
        let Some(list) = command_list.as_any().downcast_ref::<MockCommandList>() else {
            engine_bail!("sponza::Mock", "submit of a foreign command list");
        };
        if list.recording || list.commands.is_empty() {
            engine_bail!("sponza::Mock", "submit of a command list that is not recorded");
        }
        self.record(|log| log.submits.push(image_index))
    }

    fn queue_wait_idle(&self) -> Result<()> {
        self.record(|log| log.queue_wait_idle += 1)
    }

    fn wait_idle(&self) -> Result<()> {
        self.record(|log| log.wait_idle += 1)
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
