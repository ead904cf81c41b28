use super::*;

fn config(severity: DebugSeverity, filter: DebugMessageFilter) -> Config {
    Config {
        severity,
        output: DebugOutput::Console,
        message_filter: filter,
        break_on_error: false,
        panic_on_error: false,
        enable_stats: true,
    }
}

const ERROR: vk::DebugUtilsMessageSeverityFlagsEXT = vk::DebugUtilsMessageSeverityFlagsEXT::ERROR;
const WARNING: vk::DebugUtilsMessageSeverityFlagsEXT = vk::DebugUtilsMessageSeverityFlagsEXT::WARNING;
const VERBOSE: vk::DebugUtilsMessageSeverityFlagsEXT = vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE;
const VALIDATION: vk::DebugUtilsMessageTypeFlagsEXT = vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION;
const PERFORMANCE: vk::DebugUtilsMessageTypeFlagsEXT = vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE;

#[test]
fn test_severity_flags() {
    assert_eq!(severity_flags(DebugSeverity::ErrorsOnly), ERROR);
    assert_eq!(severity_flags(DebugSeverity::ErrorsAndWarnings), ERROR | WARNING);
    assert!(severity_flags(DebugSeverity::All).contains(VERBOSE));
}

#[test]
fn test_errors_only_drops_warnings() {
    let cfg = config(DebugSeverity::ErrorsOnly, DebugMessageFilter::default());
    assert!(should_report(&cfg, ERROR, VALIDATION));
    assert!(!should_report(&cfg, WARNING, VALIDATION));
}

#[test]
fn test_category_filter() {
    let filter = DebugMessageFilter { show_performance: false, ..Default::default() };
    let cfg = config(DebugSeverity::All, filter);
    assert!(should_report(&cfg, WARNING, VALIDATION));
    assert!(!should_report(&cfg, WARNING, PERFORMANCE));
}

#[test]
fn test_message_level_picks_most_severe() {
    assert_eq!(MessageLevel::from_vk(ERROR | WARNING), MessageLevel::Error);
    assert_eq!(MessageLevel::from_vk(VERBOSE), MessageLevel::Verbose);
    assert_eq!(MessageLevel::Warning.as_str(), "WARNING");
}

#[test]
fn test_type_name() {
    assert_eq!(type_name(VALIDATION), "Validation");
    assert_eq!(type_name(PERFORMANCE), "Performance");
    assert_eq!(type_name(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL), "General");
}
