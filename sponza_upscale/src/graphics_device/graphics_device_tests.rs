//! Unit tests for DeviceCapabilities and the extension constants

use crate::graphics_device::{
    DeviceCapabilities, XEG_SPATIAL_UPSCALE_EXTENSION_NAME, XEG_ADAPTIVE_VRS_EXTENSION_NAME,
    REQUIRED_VENDOR_EXTENSIONS,
};

fn full_capabilities() -> DeviceCapabilities {
    DeviceCapabilities {
        extensions: vec![
            XEG_SPATIAL_UPSCALE_EXTENSION_NAME.to_string(),
            XEG_ADAPTIVE_VRS_EXTENSION_NAME.to_string(),
            "VK_KHR_create_renderpass2".to_string(),
        ],
        renderpass2: true,
        pipeline_fragment_shading_rate: true,
        attachment_fragment_shading_rate: true,
        primitive_fragment_shading_rate: false,
    }
}

// ============================================================================
// EXTENSION NAMES
// ============================================================================

#[test]
fn test_vendor_extension_names() {
    assert_eq!(XEG_SPATIAL_UPSCALE_EXTENSION_NAME, "XEG_spatial_upscale");
    assert_eq!(XEG_ADAPTIVE_VRS_EXTENSION_NAME, "XEG_adaptive_vrs");
    assert_eq!(REQUIRED_VENDOR_EXTENSIONS.len(), 2);
}

// ============================================================================
// MISSING REQUIREMENTS
// ============================================================================

#[test]
fn test_full_device_has_no_missing_requirements() {
    let caps = full_capabilities();
    assert!(caps.missing_requirements().is_empty());
    assert!(caps.has_extension("VK_KHR_create_renderpass2"));
}

#[test]
fn test_primitive_shading_rate_is_optional() {
    let mut caps = full_capabilities();
    caps.primitive_fragment_shading_rate = false;
    assert!(caps.missing_requirements().is_empty());
}

#[test]
fn test_missing_spatial_upscale_extension_reported() {
    let mut caps = full_capabilities();
    caps.extensions.retain(|e| e != XEG_SPATIAL_UPSCALE_EXTENSION_NAME);
    assert_eq!(caps.missing_requirements(), vec!["XEG_spatial_upscale".to_string()]);
}

#[test]
fn test_missing_vrs_extension_reported() {
    let mut caps = full_capabilities();
    caps.extensions.retain(|e| e != XEG_ADAPTIVE_VRS_EXTENSION_NAME);
    assert_eq!(caps.missing_requirements(), vec!["XEG_adaptive_vrs".to_string()]);
}

#[test]
fn test_missing_features_reported() {
    let mut caps = full_capabilities();
    caps.renderpass2 = false;
    caps.attachment_fragment_shading_rate = false;

    let missing = caps.missing_requirements();
    assert_eq!(missing.len(), 2);
    assert!(missing.contains(&"renderpass2".to_string()));
    assert!(missing.contains(&"attachmentFragmentShadingRate".to_string()));
}

#[test]
fn test_default_capabilities_miss_everything() {
    let missing = DeviceCapabilities::default().missing_requirements();
    assert_eq!(missing.len(), 5);
}
