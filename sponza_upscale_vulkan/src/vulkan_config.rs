/// VulkanConfig - bootstrap options of the Vulkan device
///
/// Validation settings only take effect when the crate is built with the
/// `vulkan-validation` feature.

/// Which validation messages are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Where validation messages go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    /// Engine logger only
    Console,
    /// Append to a file only
    File(String),
    /// Engine logger and file
    Both(String),
}

/// Validation message categories to report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Counters of validation messages seen since the device was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Vulkan device configuration
#[derive(Debug, Clone)]
pub struct VulkanConfig {
    /// Application name reported to the driver
    pub application_name: String,
    /// Enable VK_LAYER_KHRONOS_validation and the debug messenger
    pub enable_validation: bool,
    pub debug_severity: DebugSeverity,
    pub debug_output: DebugOutput,
    pub debug_message_filter: DebugMessageFilter,
    /// Abort the process on the first validation error
    pub break_on_validation_error: bool,
    /// Panic on the first validation error
    pub panic_on_error: bool,
    pub enable_validation_stats: bool,
}

impl Default for VulkanConfig {
    fn default() -> Self {
        Self {
            application_name: "Sponza Upscale".to_string(),
            enable_validation: cfg!(feature = "vulkan-validation"),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            break_on_validation_error: false,
            panic_on_error: false,
            enable_validation_stats: true,
        }
    }
}

#[cfg(test)]
#[path = "vulkan_config_tests.rs"]
mod tests;
