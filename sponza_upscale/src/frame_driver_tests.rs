use std::sync::{Arc, Mutex};

use glam::Vec3;

use crate::command_recorder::RecorderState;
use crate::config::{RenderConfig, UpscaleMethod};
use crate::error::Error;
use crate::frame_driver::*;
use crate::frame_graph::{COMPOSITE_PASS_LABEL, PRESENT_DEPTH_LABEL};
use crate::graphics_device::mock_graphics_device::{
    as_mock, MockDeviceLog, MockGraphicsDevice, MockSwapchain, MockSwapchainState,
};
use crate::graphics_device::*;
use crate::pipeline_builder::SCENE_UNIFORMS_LABEL;
use crate::test_fixtures::{assets, mesh_scene};
use crate::upscale::SHARPEN_PASS_LABEL;

struct DriverFixture {
    driver: FrameDriver,
    log: Arc<Mutex<MockDeviceLog>>,
    swapchain: Arc<Mutex<MockSwapchainState>>,
    control: Arc<ModeControl>,
}

impl DriverFixture {
    fn with_device(mut device: MockGraphicsDevice) -> Self {
        let log = device.log();
        let scene = mesh_scene(&mut device);
        let swapchain = MockSwapchain::new(1280, 720, 3);
        let swapchain_state = swapchain.state.clone();
        let control = Arc::new(ModeControl::default());
        let driver = FrameDriver::new(
            Box::new(device),
            Box::new(swapchain),
            Arc::new(assets()),
            Box::new(scene),
            RenderConfig::default(),
            control.clone(),
        );
        Self { driver, log, swapchain: swapchain_state, control }
    }

    fn prepared() -> Self {
        let mut fixture = Self::with_device(MockGraphicsDevice::new());
        fixture.driver.prepare().unwrap();
        fixture
    }
}

#[test]
fn test_mode_control_defaults_and_updates() {
    let control = ModeControl::default();
    assert_eq!(control.mode(), (UpscaleMethod::Native, false));
    control.set_upscale_method(1).unwrap();
    control.set_vrs_used(true);
    assert_eq!(control.mode(), (UpscaleMethod::VendorSpatialUpscale, true));
}

#[test]
fn test_invalid_method_index_keeps_mode() {
    let control = ModeControl::new(UpscaleMethod::SharpenUpscale, false);
    assert!(matches!(control.set_upscale_method(3), Err(Error::InvalidResource(_))));
    assert!(matches!(control.set_upscale_method(-1), Err(Error::InvalidResource(_))));
    assert_eq!(control.upscale_method(), UpscaleMethod::SharpenUpscale);
}

#[test]
fn test_prepare_records_initial_mode() {
    let fixture = DriverFixture::prepared();
    assert!(fixture.driver.is_prepared());
    assert_eq!(fixture.driver.rebuild_count(), 1);
    assert_eq!(
        fixture.driver.recorder_state(),
        RecorderState::Recorded { method: UpscaleMethod::Native, vrs: false }
    );
    let list = as_mock(fixture.driver.command_list(0).unwrap());
    assert_eq!(list.render_pass_labels().len(), 3);
    assert_eq!(list.vrs_dispatch_count(), 0);
    assert_eq!(fixture.log.lock().unwrap().command_lists, 3);
}

#[test]
fn test_prepare_is_idempotent() {
    let mut fixture = DriverFixture::prepared();
    fixture.driver.prepare().unwrap();
    assert_eq!(fixture.driver.rebuild_count(), 1);
    assert_eq!(fixture.log.lock().unwrap().command_lists, 3);
}

#[test]
fn test_prepare_fails_closed_without_vendor_extension() {
    let mut device = MockGraphicsDevice::new();
    device.capabilities.extensions.retain(|ext| ext != XEG_ADAPTIVE_VRS_EXTENSION_NAME);
    let mut fixture = DriverFixture::with_device(device);
    let textures_before = fixture.log.lock().unwrap().textures.len();

    let result = fixture.driver.prepare();
    assert!(matches!(result, Err(Error::MissingExtension(ref name)) if name == XEG_ADAPTIVE_VRS_EXTENSION_NAME));
    assert!(!fixture.driver.is_prepared());
    let log = fixture.log.lock().unwrap();
    assert_eq!(log.textures.len(), textures_before);
    assert!(log.render_passes.is_empty());
}

#[test]
fn test_prepare_fails_without_attachment_shading_rate() {
    let mut device = MockGraphicsDevice::new();
    device.capabilities.attachment_fragment_shading_rate = false;
    let mut fixture = DriverFixture::with_device(device);
    assert!(matches!(fixture.driver.prepare(), Err(Error::InitializationFailed(_))));
    assert!(fixture.log.lock().unwrap().render_passes.is_empty());
}

#[test]
fn test_prepare_failure_leaves_driver_unprepared() {
    let mut device = MockGraphicsDevice::new();
    device.fail_labels.push("lighting_high".to_string());
    let mut fixture = DriverFixture::with_device(device);
    assert!(fixture.driver.prepare().is_err());
    assert!(!fixture.driver.is_prepared());
    assert!(matches!(fixture.driver.render_frame(), Err(Error::NotPrepared)));
}

#[test]
fn test_render_before_prepare() {
    let mut fixture = DriverFixture::with_device(MockGraphicsDevice::new());
    assert!(matches!(fixture.driver.render_frame(), Err(Error::NotPrepared)));
    assert!(matches!(fixture.driver.command_list(0), Err(Error::NotPrepared)));
}

#[test]
fn test_unchanged_mode_never_rebuilds() {
    let mut fixture = DriverFixture::prepared();
    for _ in 0..10 {
        assert_eq!(fixture.driver.render_frame().unwrap(), FrameOutcome::Presented);
    }
    assert_eq!(fixture.driver.rebuild_count(), 1);

    let log = fixture.log.lock().unwrap();
    assert_eq!(log.submits, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
    assert_eq!(log.queue_wait_idle, 10);
    assert_eq!(fixture.swapchain.lock().unwrap().presented.len(), 10);
}

#[test]
fn test_mode_change_rebuilds_once() {
    let mut fixture = DriverFixture::prepared();
    fixture.driver.render_frame().unwrap();

    fixture.control.set_upscale_method(UpscaleMethod::SharpenUpscale.index()).unwrap();
    fixture.control.set_vrs_used(true);
    fixture.driver.render_frame().unwrap();
    fixture.driver.render_frame().unwrap();
    assert_eq!(fixture.driver.rebuild_count(), 2);

    let list = as_mock(fixture.driver.command_list(0).unwrap());
    assert_eq!(list.render_pass_count(COMPOSITE_PASS_LABEL), 1);
    assert_eq!(list.draw_count_in(SHARPEN_PASS_LABEL), 2);
    assert_eq!(list.vrs_dispatch_count(), 1);
    assert_eq!(list.combiner_ops(), vec![[CombinerOp::Keep, CombinerOp::Replace]]);
}

#[test]
fn test_vrs_toggle_alone_rebuilds() {
    let mut fixture = DriverFixture::prepared();
    fixture.control.set_vrs_used(true);
    fixture.driver.render_frame().unwrap();
    fixture.control.set_vrs_used(false);
    fixture.driver.render_frame().unwrap();
    assert_eq!(fixture.driver.rebuild_count(), 3);
    assert_eq!(fixture.driver.vrs_dispatch_count(), 3);
}

#[test]
fn test_invalid_host_index_does_not_rebuild() {
    let mut fixture = DriverFixture::prepared();
    assert!(fixture.control.set_upscale_method(9).is_err());
    fixture.driver.render_frame().unwrap();
    assert_eq!(fixture.driver.rebuild_count(), 1);
}

#[test]
fn test_out_of_date_acquire_recreates() {
    let mut fixture = DriverFixture::prepared();
    fixture.swapchain.lock().unwrap().acquire_script.push_back(SwapchainStatus::OutOfDate);

    assert_eq!(fixture.driver.render_frame().unwrap(), FrameOutcome::Resized);
    assert_eq!(fixture.swapchain.lock().unwrap().recreated, vec![(1280, 720)]);
    assert!(fixture.log.lock().unwrap().submits.is_empty());
    assert_eq!(fixture.driver.rebuild_count(), 2);

    assert_eq!(fixture.driver.render_frame().unwrap(), FrameOutcome::Presented);
}

#[test]
fn test_suboptimal_present_recreates_after_presenting() {
    let mut fixture = DriverFixture::prepared();
    fixture.swapchain.lock().unwrap().present_script.push_back(SwapchainStatus::Suboptimal);

    assert_eq!(fixture.driver.render_frame().unwrap(), FrameOutcome::Resized);
    let state = fixture.swapchain.lock().unwrap();
    assert_eq!(state.presented, vec![0]);
    assert_eq!(state.recreated.len(), 1);
}

#[test]
fn test_window_resize_replaces_present_targets() {
    let mut fixture = DriverFixture::prepared();
    fixture.driver.render_frame().unwrap();
    let wait_idle_before = fixture.log.lock().unwrap().wait_idle;

    fixture.driver.window_resize(1920, 1080).unwrap();

    {
        let log = fixture.log.lock().unwrap();
        assert_eq!(log.wait_idle, wait_idle_before + 1);
        assert_eq!(log.live_textures(PRESENT_DEPTH_LABEL), 1);
        let depth = log.live_texture(PRESENT_DEPTH_LABEL).unwrap();
        assert_eq!((depth.info.width, depth.info.height), (1920, 1080));
        // Tiers are rebuilt at the new surface size
        assert_eq!(log.live_textures("low_albedo"), 1);
        assert_eq!(log.live_textures("high_albedo"), 1);
        let low = log.live_texture("low_albedo").unwrap();
        assert_eq!((low.info.width, low.info.height), (768, 432));
        assert_eq!(log.command_lists, 6);
    }

    let present = fixture.driver.present_targets().unwrap();
    assert_eq!(present.framebuffer_count(), 3);
    assert_eq!(present.extent(), Extent2D::new(1920, 1080));
    for image_index in 0..3 {
        let list = as_mock(fixture.driver.command_list(image_index).unwrap());
        let composite = list.framebuffers().pop().unwrap();
        assert_eq!((composite.width(), composite.height()), (1920, 1080));
    }
    assert_eq!(fixture.driver.rebuild_count(), 2);
    assert_eq!(fixture.driver.render_frame().unwrap(), FrameOutcome::Presented);
}

#[test]
fn test_prepare_sizes_tiers_from_swapchain() {
    let mut device = MockGraphicsDevice::new();
    let log = device.log();
    let scene = mesh_scene(&mut device);
    let mut driver = FrameDriver::new(
        Box::new(device),
        Box::new(MockSwapchain::new(1920, 1080, 3)),
        Arc::new(assets()),
        Box::new(scene),
        RenderConfig::default(),
        Arc::new(ModeControl::default()),
    );
    driver.prepare().unwrap();

    let extents = *driver.passes().unwrap().extents();
    assert_eq!(extents.low, Extent2D::new(768, 432));
    assert_eq!(extents.high, Extent2D::new(1152, 648));
    let log = log.lock().unwrap();
    let output = log.live_texture("low_upscale_output").unwrap();
    assert_eq!((output.info.width, output.info.height), (1152, 648));
}

#[test]
fn test_resize_to_new_aspect_ratio_rebuilds_tiers() {
    let mut fixture = DriverFixture::prepared();
    fixture.control.set_upscale_method(UpscaleMethod::SharpenUpscale.index()).unwrap();
    fixture.driver.render_frame().unwrap();
    assert_eq!(fixture.driver.rebuild_count(), 2);

    fixture.driver.window_resize(1000, 1000).unwrap();

    let extents = *fixture.driver.passes().unwrap().extents();
    assert_eq!(extents.low, Extent2D::new(400, 400));
    assert_eq!(extents.high, Extent2D::new(600, 600));
    {
        let log = fixture.log.lock().unwrap();
        assert_eq!(log.live_textures("high_shading_rate"), 1);
        let sri = log.live_texture("high_shading_rate").unwrap();
        assert_eq!((sri.info.width, sri.info.height), (75, 75));
    }
    assert_eq!(fixture.driver.rebuild_count(), 3);
    assert_eq!(
        fixture.driver.recorder_state(),
        RecorderState::Recorded { method: UpscaleMethod::SharpenUpscale, vrs: false }
    );
    assert_eq!(fixture.driver.render_frame().unwrap(), FrameOutcome::Presented);
}

#[test]
fn test_resize_keeping_tier_sizes_only_rerecords() {
    let mut fixture = DriverFixture::prepared();
    let textures_before = fixture.log.lock().unwrap().textures.len();

    // 1281x720 scales to the same tier sizes as 1280x720
    fixture.driver.window_resize(1281, 720).unwrap();

    let log = fixture.log.lock().unwrap();
    assert_eq!(log.render_passes.iter().filter(|p| p.label == "gbuffer").count(), 1);
    // Only the present depth is new
    assert_eq!(log.textures.len(), textures_before + 1);
}

#[test]
fn test_zero_size_skips_frames() {
    let mut fixture = DriverFixture::prepared();
    fixture.driver.window_resize(0, 0).unwrap();
    assert_eq!(fixture.driver.render_frame().unwrap(), FrameOutcome::Skipped);
    assert!(fixture.log.lock().unwrap().submits.is_empty());

    fixture.driver.window_resize(800, 600).unwrap();
    assert_eq!(fixture.driver.render_frame().unwrap(), FrameOutcome::Presented);
}

#[test]
fn test_resize_request_from_host() {
    let mut fixture = DriverFixture::prepared();
    fixture.control.request_resize(1024, 768);
    fixture.control.request_resize(640, 480);
    fixture.driver.render_frame().unwrap();
    assert_eq!(fixture.swapchain.lock().unwrap().recreated, vec![(640, 480)]);
}

#[test]
fn test_camera_move_updates_uniforms_after_frame() {
    let mut fixture = DriverFixture::prepared();
    let before = fixture.log.lock().unwrap().buffer(SCENE_UNIFORMS_LABEL).unwrap().contents();

    fixture.driver.camera_mut().translate(Vec3::new(1.0, 0.0, 0.0));
    fixture.driver.render_frame().unwrap();

    let after = fixture.log.lock().unwrap().buffer(SCENE_UNIFORMS_LABEL).unwrap().contents();
    assert_ne!(before, after);
    assert!(!fixture.driver.camera().is_updated());
    assert_eq!(fixture.driver.rebuild_count(), 1);
}

#[test]
fn test_drop_waits_for_device() {
    let fixture = DriverFixture::prepared();
    let log = fixture.log.clone();
    drop(fixture);
    assert_eq!(log.lock().unwrap().wait_idle, 1);
    assert_eq!(log.lock().unwrap().live_textures("high_light_color"), 0);
}
