/// Vulkan debug messenger - validation layer messages routed to the engine logger
///
/// Messages are filtered by severity and category, counted, grouped by
/// repetition and optionally appended to a file. Only compiled with the
/// `vulkan-validation` feature.

use ash::vk;
use colored::*;
use rustc_hash::FxHashMap;
use sponza_upscale::{engine_debug, engine_error, engine_info, engine_warn};
use std::ffi::CStr;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::vulkan_config::{DebugMessageFilter, DebugOutput, DebugSeverity, ValidationStats};

/// Global debug configuration (shared across callbacks)
static DEBUG_CONFIG: Mutex<Option<Config>> = Mutex::new(None);

/// Global validation statistics
static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Occurrence count per message text
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Debug configuration for the callback
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
    pub break_on_error: bool,
    pub panic_on_error: bool,
    pub enable_stats: bool,
}

/// Message severity as reported by the layer, most severe flag wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageLevel {
    Error,
    Warning,
    Info,
    Verbose,
}

impl MessageLevel {
    fn from_vk(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Self::Error
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Self::Warning
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Self::Info
        } else {
            Self::Verbose
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Verbose => "VERBOSE",
        }
    }
}

struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn increment(&self, level: MessageLevel) {
        let counter = match level {
            MessageLevel::Error => &self.errors,
            MessageLevel::Warning => &self.warnings,
            MessageLevel::Info => &self.info,
            MessageLevel::Verbose => &self.verbose,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

// A panic inside the callback must not disable logging for the rest of the run
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mask of severities the messenger is created with
pub(crate) fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Whether a message passes the configured severity and category filters
fn should_report(
    config: &Config,
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
) -> bool {
    if !severity.intersects(severity_flags(config.severity)) {
        return false;
    }

    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        config.message_filter.show_validation
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        config.message_filter.show_performance
    } else {
        config.message_filter.show_general
    }
}

fn type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Initialize debug configuration and reset the counters
pub(crate) fn init_debug_config(config: Config) {
    VALIDATION_STATS.reset();
    *lock(&MESSAGE_TRACKER) = Some(FxHashMap::default());
    *lock(&DEBUG_CONFIG) = Some(config);
}

/// Stop reporting; called when the instance is destroyed
pub(crate) fn cleanup_debug_config() {
    *lock(&DEBUG_CONFIG) = None;
}

/// Current validation statistics
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get_stats()
}

/// Print a colored summary of the validation messages seen so far
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "✓ No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());

    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    if let Some(tracker) = lock(&MESSAGE_TRACKER).as_ref() {
        let repeated = tracker.values().filter(|&&count| count > 1).count();
        if repeated > 0 {
            println!("\n  {} {} message(s) appeared multiple times", "ℹ".cyan(), repeated);
        }
    }

    println!("{}\n", "====================================".bright_blue().bold());
}

/// Vulkan debug messenger callback
///
/// # Safety
///
/// Called by the validation layer with a valid callback data pointer.
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = *p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };

    let config = match lock(&DEBUG_CONFIG).as_ref() {
        Some(config) => config.clone(),
        None => return vk::FALSE,
    };

    if !should_report(&config, message_severity, message_type) {
        return vk::FALSE;
    }

    let level = MessageLevel::from_vk(message_severity);
    let type_str = type_name(message_type);

    let occurrences = if config.enable_stats {
        VALIDATION_STATS.increment(level);
        let mut tracker = lock(&MESSAGE_TRACKER);
        let count = tracker
            .get_or_insert_with(FxHashMap::default)
            .entry(message.to_string())
            .or_insert(0);
        *count += 1;
        *count
    } else {
        1
    };
    let repeat = if occurrences > 1 {
        format!(" [x{}]", occurrences)
    } else {
        String::new()
    };

    let (to_logger, file) = match &config.output {
        DebugOutput::Console => (true, None),
        DebugOutput::File(path) => (false, Some(path.as_str())),
        DebugOutput::Both(path) => (true, Some(path.as_str())),
    };

    if to_logger {
        match level {
            MessageLevel::Error => engine_error!("sponza::vulkan",
                "[{}]{} {}: {}", type_str, repeat, message_id_name, message),
            MessageLevel::Warning => engine_warn!("sponza::vulkan",
                "[{}]{} {}: {}", type_str, repeat, message_id_name, message),
            MessageLevel::Info => engine_info!("sponza::vulkan",
                "[{}]{} {}: {}", type_str, repeat, message_id_name, message),
            MessageLevel::Verbose => engine_debug!("sponza::vulkan",
                "[{}]{} {}: {}", type_str, repeat, message_id_name, message),
        }
    }
    if let Some(path) = file {
        write_to_file(path, &format!(
            "[VULKAN {}] [{}]{}\n  Message ID: {}\n  {}\n",
            level.as_str(), type_str, repeat, message_id_name, message
        ));
    }

    if level == MessageLevel::Error && config.panic_on_error {
        panic!("Vulkan validation error ({}): {}", message_id_name, message);
    }
    if level == MessageLevel::Error && config.break_on_error {
        eprintln!("\n{} {} [{}]\n  {}\n",
            "BREAK ON VALIDATION ERROR".red().bold(),
            message_id_name.yellow(),
            type_str.cyan(),
            message);
        std::process::abort();
    }

    vk::FALSE
}

fn write_to_file(path: &str, message: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", message);
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
