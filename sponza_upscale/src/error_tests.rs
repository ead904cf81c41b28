//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkCreateRenderPass2 failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkCreateRenderPass2 failed"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("empty shader file".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid resource"));
    assert!(display.contains("empty shader file"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("no R8_UINT shading rate support".to_string());
    assert!(format!("{}", err).starts_with("Initialization failed"));
}

#[test]
fn test_missing_extension_display() {
    let err = Error::MissingExtension("XEG_adaptive_vrs".to_string());
    assert_eq!(format!("{}", err), "Missing device extension: XEG_adaptive_vrs");
}

#[test]
fn test_not_prepared_display() {
    assert_eq!(format!("{}", Error::NotPrepared), "Renderer not prepared");
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[test]
fn test_fatal_classification() {
    assert!(Error::InitializationFailed("x".into()).is_fatal());
    assert!(Error::MissingExtension("x".into()).is_fatal());
    assert!(Error::OutOfMemory.is_fatal());
    assert!(!Error::InvalidResource("x".into()).is_fatal());
    assert!(!Error::BackendError("x".into()).is_fatal());
    assert!(!Error::NotPrepared.is_fatal());
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::BackendError("lost device".to_string());
    assert_eq!(err.clone(), err);
}

#[test]
fn test_result_question_mark_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::NotPrepared)
    }
    fn outer() -> Result<u32> {
        let v = inner()?;
        Ok(v + 1)
    }
    assert_eq!(outer(), Err(Error::NotPrepared));
}
