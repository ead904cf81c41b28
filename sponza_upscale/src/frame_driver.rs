/// Frame Driver
///
/// Top-level per-frame state machine. Command lists are re-recorded only
/// when the host changes the upscale method or the VRS toggle (or after a
/// resize); every other frame re-submits what is already recorded.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use crate::asset::AssetResolver;
use crate::camera::Camera;
use crate::command_recorder::{CommandRecorder, FrameResources, RecorderState};
use crate::config::{RenderConfig, UpscaleMethod};
use crate::error::{Error, Result};
use crate::frame_graph::{PassGraph, PresentTargets, TierExtent};
use crate::graphics_device::{
    CommandList, Extent2D, GraphicsDevice, Swapchain, SwapchainStatus, REQUIRED_VENDOR_EXTENSIONS,
};
use crate::pipeline_builder::PipelineBuilder;
use crate::scene::SceneDrawer;
use crate::upscale::UpscaleBackends;
use crate::vrs::VrsStage;
use crate::{engine_debug, engine_error, engine_info, engine_warn};

// ============================================================================
// ModeControl
// ============================================================================

/// Mode fields written by the host and read by the render thread
///
/// Changes are picked up by the next `render_frame`.
#[derive(Debug)]
pub struct ModeControl {
    method: AtomicI32,
    vrs: AtomicBool,
    pending_resize: Mutex<Option<Extent2D>>,
}

impl ModeControl {
    pub fn new(method: UpscaleMethod, vrs: bool) -> Self {
        Self {
            method: AtomicI32::new(method.index()),
            vrs: AtomicBool::new(vrs),
            pending_resize: Mutex::new(None),
        }
    }

    /// Select the upscale method by host index
    ///
    /// # Errors
    ///
    /// `InvalidResource` for an unknown index; the current method is kept.
    pub fn set_upscale_method(&self, index: i32) -> Result<()> {
        match UpscaleMethod::from_index(index) {
            Ok(method) => {
                self.method.store(method.index(), Ordering::Release);
                Ok(())
            }
            Err(err) => {
                engine_warn!("sponza::ModeControl", "Ignoring upscale method {}: {}", index, err);
                Err(err)
            }
        }
    }

    pub fn set_vrs_used(&self, used: bool) {
        self.vrs.store(used, Ordering::Release);
    }

    pub fn upscale_method(&self) -> UpscaleMethod {
        // Only valid indices are ever stored
        UpscaleMethod::from_index(self.method.load(Ordering::Acquire)).unwrap_or(UpscaleMethod::Native)
    }

    pub fn vrs_used(&self) -> bool {
        self.vrs.load(Ordering::Acquire)
    }

    /// Current `(method, vrs)` pair
    pub fn mode(&self) -> (UpscaleMethod, bool) {
        (self.upscale_method(), self.vrs_used())
    }

    /// Ask the render thread to resize before its next frame
    ///
    /// A later request replaces an earlier one that was not handled yet.
    pub fn request_resize(&self, width: u32, height: u32) {
        if let Ok(mut pending) = self.pending_resize.lock() {
            *pending = Some(Extent2D::new(width, height));
        }
    }

    fn take_resize(&self) -> Option<Extent2D> {
        self.pending_resize.lock().ok().and_then(|mut pending| pending.take())
    }
}

impl Default for ModeControl {
    fn default() -> Self {
        Self::new(UpscaleMethod::Native, false)
    }
}

// ============================================================================
// FrameDriver
// ============================================================================

/// Result of one `render_frame` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was submitted and presented
    Presented,
    /// The swapchain was out of date or suboptimal and has been recreated
    Resized,
    /// Nothing was rendered (zero-sized surface)
    Skipped,
}

/// Everything created by `prepare`, dropped before the device
struct Prepared {
    recorder: CommandRecorder,
    vrs: VrsStage,
    upscalers: UpscaleBackends,
    pipelines: PipelineBuilder,
    present: PresentTargets,
    passes: PassGraph,
}

impl Prepared {
    fn record(
        &mut self,
        method: UpscaleMethod,
        vrs: bool,
        scene: &dyn SceneDrawer,
        camera: &Camera,
        clear_color: [f32; 4],
    ) -> Result<()> {
        let resources = FrameResources {
            passes: &self.passes,
            present: &self.present,
            pipelines: &self.pipelines,
            upscalers: &self.upscalers,
            scene,
            camera,
            clear_color,
        };
        self.recorder.record(method, vrs, &resources, &mut self.vrs)
    }
}

pub struct FrameDriver {
    prepared: Option<Prepared>,
    scene: Box<dyn SceneDrawer>,
    swapchain: Box<dyn Swapchain>,
    device: Box<dyn GraphicsDevice>,
    assets: Arc<dyn AssetResolver>,
    config: RenderConfig,
    control: Arc<ModeControl>,
    camera: Camera,
    surface_extent: Extent2D,
    /// Recordings made by preparations replaced on resize
    earlier_rebuilds: usize,
}

impl FrameDriver {
    pub fn new(
        device: Box<dyn GraphicsDevice>,
        swapchain: Box<dyn Swapchain>,
        assets: Arc<dyn AssetResolver>,
        scene: Box<dyn SceneDrawer>,
        config: RenderConfig,
        control: Arc<ModeControl>,
    ) -> Self {
        let surface_extent = Extent2D::new(swapchain.width(), swapchain.height());
        Self {
            prepared: None,
            scene,
            swapchain,
            device,
            assets,
            config,
            control,
            camera: Camera::new(),
            surface_extent,
            earlier_rebuilds: 0,
        }
    }

    // ===== PREPARE =====

    /// Create every pass, pipeline and command list, then record them
    ///
    /// Fails closed: a device without the vendor extensions or the shading
    /// rate features is rejected before any GPU object exists, and any
    /// creation failure leaves the driver un-prepared.
    pub fn prepare(&mut self) -> Result<()> {
        if self.prepared.is_some() {
            return Ok(());
        }
        self.config.validate()?;
        self.check_capabilities()?;

        self.camera.set_perspective(
            self.config.fov_degrees,
            self.surface_extent.width as f32 / self.surface_extent.height.max(1) as f32,
            self.config.z_near,
            self.config.z_far,
        );

        // ========== PASSES ==========
        let output = Extent2D::new(self.swapchain.width(), self.swapchain.height());
        let device = self.device.as_mut();
        let passes = PassGraph::build(device, &self.config, output)?;
        let present = PresentTargets::build(device, self.swapchain.as_ref())?;

        // ========== PIPELINES ==========
        let pipelines = PipelineBuilder::build(device, self.assets.as_ref(), &passes, &present, self.scene.as_mut())?;
        pipelines.update_uniforms(&self.camera)?;
        let upscalers = UpscaleBackends::build(device, self.assets.as_ref(), &passes, &self.config)?;
        let vrs = VrsStage::build(device, &passes, &self.config)?;

        // ========== COMMAND LISTS ==========
        let lists = device.create_command_lists(self.swapchain.image_count())?;
        let mut prepared = Prepared {
            recorder: CommandRecorder::new(lists),
            vrs,
            upscalers,
            pipelines,
            present,
            passes,
        };
        let (method, vrs_used) = self.control.mode();
        prepared.record(method, vrs_used, self.scene.as_ref(), &self.camera, self.config.clear_color)?;
        self.camera.take_updated();
        self.prepared = Some(prepared);

        engine_info!(
            "sponza::FrameDriver",
            "Prepared {} swapchain images at {}x{} ({:?}, vrs {})",
            self.swapchain.image_count(), self.surface_extent.width, self.surface_extent.height,
            method, vrs_used
        );
        Ok(())
    }

    fn check_capabilities(&self) -> Result<()> {
        let missing = self.device.capabilities().missing_requirements();
        if missing.is_empty() {
            return Ok(());
        }
        engine_error!(
            "sponza::FrameDriver",
            "Device is missing: {}",
            missing.join(", ")
        );
        let extensions: Vec<&String> = missing
            .iter()
            .filter(|name| REQUIRED_VENDOR_EXTENSIONS.contains(&name.as_str()))
            .collect();
        if !extensions.is_empty() {
            let names: Vec<&str> = extensions.iter().map(|name| name.as_str()).collect();
            return Err(Error::MissingExtension(names.join(", ")));
        }
        Err(Error::InitializationFailed(format!(
            "unsupported device features: {}",
            missing.join(", ")
        )))
    }

    // ===== FRAME =====

    /// Render one frame
    ///
    /// Rebuilds the command lists first when the host mode changed, then
    /// acquires, submits the recorded list of the acquired image, presents
    /// and waits for the queue. Uniforms are refreshed afterwards if the
    /// camera moved.
    pub fn render_frame(&mut self) -> Result<FrameOutcome> {
        if self.prepared.is_none() {
            return Err(Error::NotPrepared);
        }
        if let Some(extent) = self.control.take_resize() {
            self.window_resize(extent.width, extent.height)?;
        }
        if self.surface_extent.width == 0 || self.surface_extent.height == 0 {
            return Ok(FrameOutcome::Skipped);
        }

        // ========== LAZY REBUILD ==========
        let (method, vrs) = self.control.mode();
        let Some(prepared) = self.prepared.as_mut() else {
            return Err(Error::NotPrepared);
        };
        if prepared.recorder.needs_rebuild(method, vrs) {
            engine_info!(
                "sponza::FrameDriver",
                "Mode changed to ({:?}, vrs {}), re-recording",
                method, vrs
            );
            prepared.record(method, vrs, self.scene.as_ref(), &self.camera, self.config.clear_color)?;
        }

        // ========== ACQUIRE ==========
        let (image_index, status) = self.swapchain.acquire_next_image()?;
        if status == SwapchainStatus::OutOfDate {
            engine_debug!("sponza::FrameDriver", "Swapchain out of date on acquire");
            self.resize_to_surface()?;
            return Ok(FrameOutcome::Resized);
        }

        // ========== SUBMIT / PRESENT ==========
        let cmd: &dyn CommandList = prepared.recorder.command_list(image_index as usize)?;
        self.device.submit(cmd, self.swapchain.as_ref(), image_index)?;
        let present_status = self.swapchain.present(image_index)?;
        self.device.queue_wait_idle()?;

        if self.camera.take_updated() {
            prepared.pipelines.update_uniforms(&self.camera)?;
        }

        if status == SwapchainStatus::Suboptimal || present_status != SwapchainStatus::Optimal {
            engine_debug!("sponza::FrameDriver", "Swapchain {:?} on present", present_status);
            self.resize_to_surface()?;
            return Ok(FrameOutcome::Resized);
        }
        Ok(FrameOutcome::Presented)
    }

    // ===== RESIZE =====

    /// Recreate the swapchain targets at a new size
    ///
    /// Waits for the whole device and recreates the swapchain. When the tier
    /// sizes change with the surface, every tier and everything built on it
    /// is prepared again. Otherwise only the present depth, the present
    /// framebuffers and the command lists are replaced and recorded again
    /// for the current mode. A zero size is remembered and frames are
    /// skipped until a real size arrives.
    pub fn window_resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.surface_extent = Extent2D::new(width, height);
        if width == 0 || height == 0 {
            engine_debug!("sponza::FrameDriver", "Surface is {}x{}, skipping frames", width, height);
            return Ok(());
        }
        let Some(prepared) = self.prepared.as_mut() else {
            return Ok(());
        };

        self.device.wait_idle()?;
        self.swapchain.recreate(width, height)?;

        let extents = TierExtent::for_output(&self.config, self.swapchain.width(), self.swapchain.height());
        if *prepared.passes.extents() != extents {
            return self.rebuild_tiers();
        }

        prepared.present.recreate(self.device.as_mut(), self.swapchain.as_ref())?;
        let lists = self.device.create_command_lists(self.swapchain.image_count())?;
        prepared.recorder.replace_command_lists(lists);

        self.camera.update_aspect_ratio(width as f32 / height as f32);
        self.camera.take_updated();
        prepared.pipelines.update_uniforms(&self.camera)?;

        let (method, vrs) = self.control.mode();
        prepared.record(method, vrs, self.scene.as_ref(), &self.camera, self.config.clear_color)?;
        engine_info!("sponza::FrameDriver", "Resized to {}x{}", width, height);
        Ok(())
    }

    /// Drop the whole preparation and prepare again at the swapchain size
    fn rebuild_tiers(&mut self) -> Result<()> {
        if let Some(prepared) = self.prepared.take() {
            self.earlier_rebuilds += prepared.recorder.rebuild_count();
        }
        self.prepare()?;
        engine_info!(
            "sponza::FrameDriver",
            "Resized to {}x{}, tiers rebuilt",
            self.swapchain.width(), self.swapchain.height()
        );
        Ok(())
    }

    fn resize_to_surface(&mut self) -> Result<()> {
        let extent = self.surface_extent;
        self.window_resize(extent.width, extent.height)
    }

    // ===== ACCESSORS =====

    pub fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    pub fn control(&self) -> &Arc<ModeControl> {
        &self.control
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Camera moves are uploaded after the next presented frame
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Completed command-list recordings, 0 before `prepare`
    pub fn rebuild_count(&self) -> usize {
        self.earlier_rebuilds + self.prepared.as_ref().map_or(0, |p| p.recorder.rebuild_count())
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.prepared.as_ref().map_or(RecorderState::Idle, |p| p.recorder.state())
    }

    /// Recorded list of a swapchain image
    pub fn command_list(&self, image_index: usize) -> Result<&dyn CommandList> {
        self.prepared
            .as_ref()
            .ok_or(Error::NotPrepared)?
            .recorder
            .command_list(image_index)
    }

    pub fn passes(&self) -> Option<&PassGraph> {
        self.prepared.as_ref().map(|p| &p.passes)
    }

    pub fn present_targets(&self) -> Option<&PresentTargets> {
        self.prepared.as_ref().map(|p| &p.present)
    }

    pub fn vrs_dispatch_count(&self) -> usize {
        self.prepared.as_ref().map_or(0, |p| p.vrs.dispatch_count())
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        if self.prepared.is_some() {
            if let Err(err) = self.device.wait_idle() {
                engine_error!("sponza::FrameDriver", "wait_idle on teardown failed: {}", err);
            }
            self.prepared = None;
        }
    }
}

#[cfg(test)]
#[path = "frame_driver_tests.rs"]
mod tests;
