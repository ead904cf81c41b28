/// Surface Registry
///
/// Explicit map from host surface ids to their render contexts. The
/// platform glue owns the registry and forwards surface and control events
/// to it; several registries can coexist (one per test, for instance).

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::config::RenderConfig;
use crate::error::Result;
use crate::frame_driver::{FrameDriver, FrameOutcome, ModeControl};
use crate::render_thread::{CancellationToken, LoopControl, RenderThread};
use crate::{engine_error, engine_info, engine_warn};

/// Pause after a skipped frame (zero-sized surface)
const SKIPPED_FRAME_WAIT: Duration = Duration::from_millis(16);

/// Render context of one surface
pub struct SurfaceContext {
    control: Arc<ModeControl>,
    thread: Option<RenderThread>,
}

impl SurfaceContext {
    pub fn control(&self) -> &Arc<ModeControl> {
        &self.control
    }

    /// Whether the render loop is still running
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|thread| !thread.is_finished())
    }

    fn shutdown(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(mut thread) => thread.stop(),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct SurfaceRegistry {
    surfaces: FxHashMap<String, SurfaceContext>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start rendering to a new surface
    ///
    /// `factory` runs on the render thread and builds the frame driver for
    /// the surface; the driver is prepared there too. If either fails the
    /// loop exits and the context stays registered but idle. A context
    /// already registered under `id` is shut down first.
    pub fn surface_created<F>(&mut self, id: &str, config: RenderConfig, factory: F) -> Result<()>
    where
        F: FnOnce(RenderConfig, Arc<ModeControl>) -> Result<FrameDriver> + Send + 'static,
    {
        if self.surfaces.contains_key(id) {
            engine_warn!("sponza::SurfaceRegistry", "Surface '{}' created twice, restarting", id);
            self.surface_destroyed(id)?;
        }

        let control = Arc::new(ModeControl::new(config.initial_method, config.initial_vrs));
        let token = CancellationToken::new();
        let task = render_task(id.to_string(), config, control.clone(), token.clone(), factory);
        let thread = RenderThread::spawn(format!("render_{}", id), token, task)?;

        self.surfaces.insert(
            id.to_string(),
            SurfaceContext {
                control,
                thread: Some(thread),
            },
        );
        engine_info!("sponza::SurfaceRegistry", "Surface '{}' registered", id);
        Ok(())
    }

    /// Stop the render loop of `id` and forget the surface
    ///
    /// Blocks until the current frame has finished. Unknown ids are ignored.
    pub fn surface_destroyed(&mut self, id: &str) -> Result<()> {
        let Some(mut context) = self.surfaces.remove(id) else {
            engine_warn!("sponza::SurfaceRegistry", "surface_destroyed: unknown surface '{}'", id);
            return Ok(());
        };
        context.shutdown()?;
        engine_info!("sponza::SurfaceRegistry", "Surface '{}' destroyed", id);
        Ok(())
    }

    /// Forward a new surface size to the render loop
    pub fn surface_changed(&self, id: &str, width: u32, height: u32) {
        match self.surfaces.get(id) {
            Some(context) => context.control.request_resize(width, height),
            None => {
                engine_warn!("sponza::SurfaceRegistry", "surface_changed: unknown surface '{}'", id);
            }
        }
    }

    /// Host entry point: 0 = native, 1 = vendor spatial, 2 = sharpen
    ///
    /// # Errors
    ///
    /// `InvalidResource` for an unknown method index. Unknown surfaces are
    /// logged and ignored.
    pub fn set_upscale_method(&self, id: &str, index: i32) -> Result<()> {
        match self.surfaces.get(id) {
            Some(context) => context.control.set_upscale_method(index),
            None => {
                engine_warn!("sponza::SurfaceRegistry", "set_upscale_method: unknown surface '{}'", id);
                Ok(())
            }
        }
    }

    /// Host entry point for the VRS toggle
    pub fn set_vrs_used(&self, id: &str, used: bool) {
        match self.surfaces.get(id) {
            Some(context) => context.control.set_vrs_used(used),
            None => {
                engine_warn!("sponza::SurfaceRegistry", "set_vrs_used: unknown surface '{}'", id);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&SurfaceContext> {
        self.surfaces.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.surfaces.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl Drop for SurfaceRegistry {
    fn drop(&mut self) {
        for (id, context) in self.surfaces.iter_mut() {
            if let Err(err) = context.shutdown() {
                engine_error!("sponza::SurfaceRegistry", "Stopping surface '{}': {}", id, err);
            }
        }
    }
}

/// Loop body of one surface: build and prepare once, then render frames
fn render_task<F>(
    id: String,
    config: RenderConfig,
    control: Arc<ModeControl>,
    token: CancellationToken,
    factory: F,
) -> impl FnMut() -> LoopControl + Send + 'static
where
    F: FnOnce(RenderConfig, Arc<ModeControl>) -> Result<FrameDriver> + Send + 'static,
{
    let mut pending = Some((factory, config, control));
    let mut driver: Option<FrameDriver> = None;

    move || {
        if let Some((factory, config, control)) = pending.take() {
            let prepared = factory(config, control).and_then(|mut new_driver| {
                new_driver.prepare()?;
                Ok(new_driver)
            });
            match prepared {
                Ok(new_driver) => driver = Some(new_driver),
                Err(err) => {
                    engine_error!("sponza::SurfaceRegistry", "Surface '{}' not prepared: {}", id, err);
                    return LoopControl::Stop;
                }
            }
        }

        let Some(active) = driver.as_mut() else {
            return LoopControl::Stop;
        };
        match active.render_frame() {
            Ok(FrameOutcome::Skipped) => {
                token.wait_timeout(SKIPPED_FRAME_WAIT);
                LoopControl::Continue
            }
            Ok(_) => LoopControl::Continue,
            Err(err) => {
                engine_error!("sponza::SurfaceRegistry", "Surface '{}' frame failed: {}", id, err);
                LoopControl::Stop
            }
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
