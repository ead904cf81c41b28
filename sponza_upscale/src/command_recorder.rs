/// Command Recorder
///
/// Records one command list per swapchain image for the selected
/// `(method, vrs)` pair. Lists stay valid until the mode changes or the
/// window is resized; re-submitting them is the common per-frame case.
///
/// Recorded order, per image:
///
/// 1. G-buffer pass (tier pipeline, scene draws)
/// 2. VRS dispatch when enabled, then the shading-rate barrier
/// 3. Lighting pass with the combiner ops matching `vrs`
/// 4. Upscale backend when the method is not native
/// 5. Composite pass into the swapchain framebuffer
///
/// No explicit barrier sits between the G-buffer and lighting passes: the
/// G-buffer pass's outgoing external dependency (color write to fragment
/// shader read, by region) and its `ShaderReadOnly` final layouts are the
/// transition the lighting pass samples through.

use crate::camera::Camera;
use crate::config::UpscaleMethod;
use crate::error::{Error, Result};
use crate::frame_graph::{PassGraph, PresentTargets, Tier, TierKind};
use crate::graphics_device::{
    CommandList, ClearValue, CombinerOp, FragmentSize, Rect2D, Viewport,
};
use crate::pipeline_builder::{CompositeSource, PipelineBuilder};
use crate::scene::SceneDrawer;
use crate::upscale::UpscaleBackends;
use crate::vrs::VrsStage;
use crate::{engine_debug, engine_error};

/// Vertices of the full-screen triangle
const FULLSCREEN_VERTEX_COUNT: u32 = 3;

const GBUFFER_CLEAR: ClearValue = ClearValue::Color([0.0, 0.0, 0.0, 0.0]);
const DEPTH_CLEAR: ClearValue = ClearValue::DepthStencil { depth: 1.0, stencil: 0 };

/// Where the recorder stands relative to the requested mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Nothing recorded, or the lists were invalidated
    Idle,
    /// Lists are being recorded for this mode
    Recording { method: UpscaleMethod, vrs: bool },
    /// Every list holds a complete frame for this mode
    Recorded { method: UpscaleMethod, vrs: bool },
}

/// Everything a recording reads
pub struct FrameResources<'a> {
    pub passes: &'a PassGraph,
    pub present: &'a PresentTargets,
    pub pipelines: &'a PipelineBuilder,
    pub upscalers: &'a UpscaleBackends,
    pub scene: &'a dyn SceneDrawer,
    pub camera: &'a Camera,
    pub clear_color: [f32; 4],
}

/// Combiner ops of the lighting pass
///
/// The pipeline rate is always kept; the attachment rate replaces it only
/// while VRS is enabled, so a stale shading-rate image is ignored when off.
pub fn lighting_combiner_ops(vrs: bool) -> [CombinerOp; 2] {
    if vrs {
        [CombinerOp::Keep, CombinerOp::Replace]
    } else {
        [CombinerOp::Keep, CombinerOp::Keep]
    }
}

/// Tier rendered for `method`
pub fn tier_for_method(method: UpscaleMethod) -> TierKind {
    if method.is_upscale() {
        TierKind::Low
    } else {
        TierKind::High
    }
}

pub struct CommandRecorder {
    command_lists: Vec<Box<dyn CommandList>>,
    state: RecorderState,
    rebuild_count: usize,
}

impl CommandRecorder {
    /// Wrap one command list per swapchain image
    pub fn new(command_lists: Vec<Box<dyn CommandList>>) -> Self {
        Self {
            command_lists,
            state: RecorderState::Idle,
            rebuild_count: 0,
        }
    }

    // ===== STATE =====

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Completed recordings since creation
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    /// Whether the recorded lists do not match `(method, vrs)`
    pub fn needs_rebuild(&self, method: UpscaleMethod, vrs: bool) -> bool {
        self.state != RecorderState::Recorded { method, vrs }
    }

    /// Swap in freshly allocated lists (after a resize)
    ///
    /// The previous lists are dropped and the recorder returns to `Idle`.
    pub fn replace_command_lists(&mut self, command_lists: Vec<Box<dyn CommandList>>) {
        self.command_lists = command_lists;
        self.state = RecorderState::Idle;
    }

    pub fn command_list_count(&self) -> usize {
        self.command_lists.len()
    }

    /// Recorded list for a swapchain image
    pub fn command_list(&self, image_index: usize) -> Result<&dyn CommandList> {
        if !matches!(self.state, RecorderState::Recorded { .. }) {
            return Err(Error::NotPrepared);
        }
        self.command_lists
            .get(image_index)
            .map(|list| list.as_ref())
            .ok_or_else(|| Error::InvalidResource(format!("no command list for image {}", image_index)))
    }

    // ===== RECORDING =====

    /// Record every list for `(method, vrs)`
    ///
    /// Lists are recorded sequentially. On failure the recorder drops back
    /// to `Idle` so the next frame tries again from scratch.
    pub fn record(
        &mut self,
        method: UpscaleMethod,
        vrs: bool,
        resources: &FrameResources<'_>,
        vrs_stage: &mut VrsStage,
    ) -> Result<()> {
        if self.command_lists.len() != resources.present.framebuffer_count() {
            engine_error!(
                "sponza::CommandRecorder",
                "{} command lists for {} swapchain framebuffers",
                self.command_lists.len(), resources.present.framebuffer_count()
            );
            self.state = RecorderState::Idle;
            return Err(Error::InvalidResource("command list count mismatch".to_string()));
        }

        self.state = RecorderState::Recording { method, vrs };
        for image_index in 0..self.command_lists.len() {
            let cmd = self.command_lists[image_index].as_mut();
            if let Err(err) = Self::record_image(cmd, image_index, method, vrs, resources, vrs_stage) {
                engine_error!(
                    "sponza::CommandRecorder",
                    "Recording image {} failed: {}",
                    image_index, err
                );
                self.state = RecorderState::Idle;
                return Err(err);
            }
        }

        self.state = RecorderState::Recorded { method, vrs };
        self.rebuild_count += 1;
        engine_debug!(
            "sponza::CommandRecorder",
            "Recorded {} command lists ({:?}, vrs {}), rebuild #{}",
            self.command_lists.len(), method, vrs, self.rebuild_count
        );
        Ok(())
    }

    fn record_image(
        cmd: &mut dyn CommandList,
        image_index: usize,
        method: UpscaleMethod,
        vrs: bool,
        resources: &FrameResources<'_>,
        vrs_stage: &mut VrsStage,
    ) -> Result<()> {
        let kind = tier_for_method(method);
        let tier = resources.passes.tier(kind);

        cmd.begin()?;

        // ========== G-BUFFER ==========
        Self::record_gbuffer(cmd, tier, resources)?;

        // ========== SHADING RATE ==========
        if vrs {
            vrs_stage.dispatch(cmd, tier, resources.camera)?;
        }
        VrsStage::attachment_barrier(cmd, tier, vrs)?;

        // ========== LIGHTING ==========
        Self::record_lighting(cmd, tier, vrs, resources)?;

        // ========== UPSCALE ==========
        if let Some(backend) = resources.upscalers.get(method) {
            backend.record(cmd)?;
        }

        // ========== COMPOSITE ==========
        Self::record_composite(cmd, image_index, CompositeSource::for_method(method), resources)?;

        cmd.end()
    }

    fn record_gbuffer(cmd: &mut dyn CommandList, tier: &Tier, resources: &FrameResources<'_>) -> Result<()> {
        let pipelines = resources.pipelines.tier(tier.kind);
        cmd.begin_render_pass(
            resources.passes.gbuffer_pass(),
            &tier.gbuffer_framebuffer,
            &[GBUFFER_CLEAR, GBUFFER_CLEAR, GBUFFER_CLEAR, GBUFFER_CLEAR, DEPTH_CLEAR],
        )?;
        cmd.set_viewport(Viewport::full(tier.extent))?;
        cmd.set_scissor(Rect2D::full(tier.extent))?;
        cmd.bind_pipeline(&pipelines.gbuffer.pipeline)?;
        cmd.bind_binding_group(&pipelines.gbuffer.pipeline, 0, &pipelines.gbuffer.binding_group)?;
        resources.scene.draw(cmd, &pipelines.gbuffer.pipeline)?;
        cmd.end_render_pass()
    }

    fn record_lighting(
        cmd: &mut dyn CommandList,
        tier: &Tier,
        vrs: bool,
        resources: &FrameResources<'_>,
    ) -> Result<()> {
        let lighting = &resources.pipelines.tier(tier.kind).lighting;
        cmd.begin_render_pass(
            resources.passes.lighting_pass(),
            &tier.lighting_framebuffer,
            &[ClearValue::Color(resources.clear_color), DEPTH_CLEAR],
        )?;
        cmd.set_fragment_shading_rate(FragmentSize::FULL, lighting_combiner_ops(vrs))?;
        cmd.set_viewport(Viewport::full(tier.extent))?;
        cmd.set_scissor(Rect2D::full(tier.extent))?;
        cmd.bind_binding_group(&lighting.pipeline, 0, &lighting.binding_group)?;
        cmd.bind_pipeline(&lighting.pipeline)?;
        cmd.draw(FULLSCREEN_VERTEX_COUNT, 0)?;
        cmd.end_render_pass()
    }

    fn record_composite(
        cmd: &mut dyn CommandList,
        image_index: usize,
        source: CompositeSource,
        resources: &FrameResources<'_>,
    ) -> Result<()> {
        let composite = resources.pipelines.composite(source);
        let extent = resources.present.extent();
        cmd.begin_render_pass(
            resources.present.render_pass(),
            resources.present.framebuffer(image_index)?,
            &[ClearValue::Color(resources.clear_color), DEPTH_CLEAR],
        )?;
        cmd.set_viewport(Viewport::full(extent))?;
        cmd.set_scissor(Rect2D::full(extent))?;
        cmd.bind_binding_group(&composite.pipeline, 0, &composite.binding_group)?;
        cmd.bind_pipeline(&composite.pipeline)?;
        cmd.draw(FULLSCREEN_VERTEX_COUNT, 0)?;
        cmd.end_render_pass()
    }
}

#[cfg(test)]
#[path = "command_recorder_tests.rs"]
mod tests;
