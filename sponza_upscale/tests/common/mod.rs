#![allow(dead_code)]
//! Trace device - a GPU-free device double for integration tests
//!
//! Every command list keeps a flat trace of readable events
//! (`"pass:gbuffer"`, `"draw"`, `"vrs"`, ...). `submit` snapshots the trace
//! of the submitted list into the shared `TraceState`, so tests can assert
//! on exactly what reached the queue.

use std::any::Any;
use std::sync::{Arc, Mutex};

use sponza_upscale::sponza::render::*;
use sponza_upscale::sponza::scene::{DirectoryAssetResolver, MeshScene, SceneMesh};
use sponza_upscale::sponza::{Error, Result};

// ============================================================================
// Shared state
// ============================================================================

#[derive(Default)]
pub struct TraceState {
    /// Trace of every submitted list, in submit order
    pub submitted: Vec<Vec<String>>,
    pub submitted_images: Vec<u32>,
    pub textures_created: Vec<String>,
    pub command_lists_created: usize,
    pub wait_idle: usize,
    pub presented: usize,
    pub recreated: Vec<(u32, u32)>,
    /// Status returned by the next present
    pub next_present: Option<SwapchainStatus>,
}

pub type SharedTrace = Arc<Mutex<TraceState>>;

// ============================================================================
// Resources
// ============================================================================

struct TraceTexture(TextureInfo);

impl Texture for TraceTexture {
    fn info(&self) -> &TextureInfo {
        &self.0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct TraceBuffer {
    size: u64,
    data: Mutex<Vec<u8>>,
}

impl Buffer for TraceBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset as usize + data.len();
        if end as u64 > self.size {
            return Err(Error::InvalidResource("buffer update out of range".to_string()));
        }
        let mut contents = self.data.lock().map_err(|_| Error::BackendError("poisoned".to_string()))?;
        contents[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct TraceShader(ShaderStage);

impl Shader for TraceShader {
    fn stage(&self) -> ShaderStage {
        self.0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct TraceRenderPass(RenderPassDesc);

impl RenderPass for TraceRenderPass {
    fn desc(&self) -> &RenderPassDesc {
        &self.0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct TraceFramebuffer {
    width: u32,
    height: u32,
    attachments: Vec<Arc<dyn Texture>>,
}

impl Framebuffer for TraceFramebuffer {
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

struct TracePipeline {
    label: String,
    layouts: u32,
}

impl Pipeline for TracePipeline {
    fn label(&self) -> &str {
        &self.label
    }

    fn binding_group_layout_count(&self) -> u32 {
        self.layouts
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct TraceBindingGroup {
    set_index: u32,
    resources: Vec<BindingResource>,
}

impl BindingGroup for TraceBindingGroup {
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
// Command list
// ============================================================================

#[derive(Default)]
pub struct TraceCommandList {
    pub events: Vec<String>,
}

impl TraceCommandList {
    fn push(&mut self, event: impl Into<String>) -> Result<()> {
        self.events.push(event.into());
        Ok(())
    }

    fn trace(cmd: &mut dyn CommandList) -> Result<&mut TraceCommandList> {
        cmd.as_any_mut()
            .downcast_mut::<TraceCommandList>()
            .ok_or_else(|| Error::BackendError("foreign command list".to_string()))
    }
}

impl CommandList for TraceCommandList {
    fn begin(&mut self) -> Result<()> {
        self.events.clear();
        self.push("begin")
    }

    fn end(&mut self) -> Result<()> {
        self.push("end")
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        _clear_values: &[ClearValue],
    ) -> Result<()> {
        self.push(format!(
            "pass:{}@{}x{}",
            render_pass.desc().label,
            framebuffer.width(),
            framebuffer.height()
        ))
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.push("end_pass")
    }

    fn set_viewport(&mut self, _viewport: Viewport) -> Result<()> {
        Ok(())
    }

    fn set_scissor(&mut self, _scissor: Rect2D) -> Result<()> {
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.push(format!("pipeline:{}", pipeline.label()))
    }

    fn bind_binding_group(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        let textures: Vec<&str> = binding_group
            .resources()
            .iter()
            .filter_map(|r| r.texture())
            .map(|t| t.info().label.as_str())
            .collect();
        self.push(format!("group{}:{}", set_index, textures.join(",")))
    }

    fn push_constants(&mut self, _stages: &[ShaderStage], _offset: u32, data: &[u8]) -> Result<()> {
        self.push(format!("push:{}", data.len()))
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        Ok(())
    }

    fn bind_index_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64, _index_type: IndexType) -> Result<()> {
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) -> Result<()> {
        self.push(format!("draw:{}", vertex_count))
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) -> Result<()> {
        self.push(format!("draw_indexed:{}", index_count))
    }

    fn set_fragment_shading_rate(
        &mut self,
        _fragment_size: FragmentSize,
        combiner_ops: [CombinerOp; 2],
    ) -> Result<()> {
        self.push(format!("combiner:{:?},{:?}", combiner_ops[0], combiner_ops[1]))
    }

    fn image_barrier(&mut self, barrier: &ImageBarrier) -> Result<()> {
        self.push(format!("barrier:{}", barrier.texture.info().label))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Kernels
// ============================================================================

struct TraceSpatialUpscaler;

impl SpatialUpscaler for TraceSpatialUpscaler {
    fn record(&self, cmd: &mut dyn CommandList, input: &Arc<dyn Texture>, output: &Arc<dyn Texture>) -> Result<()> {
        TraceCommandList::trace(cmd)?.push(format!(
            "spatial:{}->{}",
            input.info().label,
            output.info().label
        ))
    }
}

struct TraceVrsDispatcher;

impl VrsDispatcher for TraceVrsDispatcher {
    fn dispatch(&self, cmd: &mut dyn CommandList, desc: &VrsDispatchDesc<'_>) -> Result<()> {
        let reprojection = match desc.reprojection {
            None => "none",
            Some(m) if m == glam::Mat4::ZERO => "zero",
            Some(_) => "matrix",
        };
        TraceCommandList::trace(cmd)?.push(format!(
            "vrs:{}:{}",
            desc.shading_rate.info().label,
            reprojection
        ))
    }
}

// ============================================================================
// Swapchain
// ============================================================================

pub struct TraceSwapchain {
    width: u32,
    height: u32,
    images: Vec<Arc<dyn Texture>>,
    next: u32,
    trace: SharedTrace,
}

impl TraceSwapchain {
    pub fn new(width: u32, height: u32, count: usize, trace: SharedTrace) -> Self {
        Self {
            width,
            height,
            images: Self::images(width, height, count),
            next: 0,
            trace,
        }
    }

    fn images(width: u32, height: u32, count: usize) -> Vec<Arc<dyn Texture>> {
        (0..count)
            .map(|i| {
                Arc::new(TraceTexture(TextureInfo {
                    label: format!("swapchain_{}", i),
                    width,
                    height,
                    format: TextureFormat::B8G8R8A8_UNORM,
                    usage: TextureUsage::COLOR_ATTACHMENT,
                })) as Arc<dyn Texture>
            })
            .collect()
    }
}

impl Swapchain for TraceSwapchain {
    fn acquire_next_image(&mut self) -> Result<(u32, SwapchainStatus)> {
        let index = self.next;
        self.next = (self.next + 1) % self.images.len() as u32;
        Ok((index, SwapchainStatus::Optimal))
    }

    fn present(&mut self, _image_index: u32) -> Result<SwapchainStatus> {
        let mut trace = self.trace.lock().map_err(|_| Error::BackendError("poisoned".to_string()))?;
        trace.presented += 1;
        Ok(trace.next_present.take().unwrap_or(SwapchainStatus::Optimal))
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        self.images = Self::images(width, height, self.images.len());
        self.next = 0;
        let mut trace = self.trace.lock().map_err(|_| Error::BackendError("poisoned".to_string()))?;
        trace.recreated.push((width, height));
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
// Device
// ============================================================================

pub struct TraceDevice {
    pub capabilities: DeviceCapabilities,
    pub trace: SharedTrace,
}

impl TraceDevice {
    pub fn new(trace: SharedTrace) -> Self {
        Self {
            capabilities: DeviceCapabilities {
                extensions: REQUIRED_VENDOR_EXTENSIONS
                    .iter()
                    .chain(REQUIRED_DEVICE_EXTENSIONS.iter())
                    .map(|name| name.to_string())
                    .collect(),
                renderpass2: true,
                pipeline_fragment_shading_rate: true,
                attachment_fragment_shading_rate: true,
                primitive_fragment_shading_rate: false,
            },
            trace,
        }
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, TraceState>> {
        self.trace.lock().map_err(|_| Error::BackendError("poisoned".to_string()))
    }
}

impl GraphicsDevice for TraceDevice {
    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn supports_format_feature(&self, _format: TextureFormat, _feature: FormatFeature) -> bool {
        true
    }

    fn depth_format(&self) -> TextureFormat {
        TextureFormat::D32_FLOAT
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        self.state()?.textures_created.push(desc.label.clone());
        Ok(Arc::new(TraceTexture(TextureInfo::from(&desc))))
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        Ok(Arc::new(TraceBuffer {
            size: desc.size,
            data: Mutex::new(vec![0; desc.size as usize]),
        }))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        Ok(Arc::new(TraceShader(desc.stage)))
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        Ok(Arc::new(TraceRenderPass(desc.clone())))
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        Ok(Arc::new(TraceFramebuffer {
            width: desc.width,
            height: desc.height,
            attachments: desc.ordered_attachments(),
        }))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        Ok(Arc::new(TracePipeline {
            layouts: desc.binding_group_layouts.len() as u32,
            label: desc.label,
        }))
    }

    fn create_binding_group(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        Ok(Arc::new(TraceBindingGroup {
            set_index,
            resources: resources.to_vec(),
        }))
    }

    fn create_command_lists(&mut self, count: usize) -> Result<Vec<Box<dyn CommandList>>> {
        self.state()?.command_lists_created += count;
        Ok((0..count)
            .map(|_| Box::new(TraceCommandList::default()) as Box<dyn CommandList>)
            .collect())
    }

    fn create_spatial_upscaler(&mut self, _desc: &SpatialUpscaleDesc) -> Result<Box<dyn SpatialUpscaler>> {
        Ok(Box::new(TraceSpatialUpscaler))
    }

    fn create_vrs_dispatcher(&mut self, _desc: &VrsDispatcherDesc) -> Result<Box<dyn VrsDispatcher>> {
        Ok(Box::new(TraceVrsDispatcher))
    }

    fn submit(&mut self, command_list: &dyn CommandList, _swapchain: &dyn Swapchain, image_index: u32) -> Result<()> {
        let list = command_list
            .as_any()
            .downcast_ref::<TraceCommandList>()
            .ok_or_else(|| Error::BackendError("foreign command list".to_string()))?;
        let mut state = self.state()?;
        state.submitted.push(list.events.clone());
        state.submitted_images.push(image_index);
        Ok(())
    }

    fn queue_wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.state()?.wait_idle += 1;
        Ok(())
    }
}

// ============================================================================
// Scene and assets
// ============================================================================

pub fn assets() -> Arc<DirectoryAssetResolver> {
    Arc::new(DirectoryAssetResolver::new("/opt/sponza"))
}

/// One untextured mesh with 36 indices
pub fn cube_scene(device: &mut TraceDevice) -> Result<MeshScene> {
    let vertex_buffer = device.create_buffer(BufferDesc {
        label: "cube_vertices".to_string(),
        size: 24 * 56,
        usage: BufferUsage::Vertex,
    })?;
    let index_buffer = device.create_buffer(BufferDesc {
        label: "cube_indices".to_string(),
        size: 36 * 4,
        usage: BufferUsage::Index,
    })?;
    Ok(MeshScene::new(vec![SceneMesh {
        vertex_buffer,
        index_buffer,
        index_count: 36,
        texture: None,
    }]))
}

/// Events of `trace` that begin a render pass, without the size suffix
pub fn pass_labels(events: &[String]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| e.strip_prefix("pass:"))
        .map(|e| e.split('@').next().unwrap_or(e).to_string())
        .collect()
}

pub fn count_prefix(events: &[String], prefix: &str) -> usize {
    events.iter().filter(|e| e.starts_with(prefix)).count()
}
