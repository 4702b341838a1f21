//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger and LogOnce.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, LogOnce};
use std::sync::Arc;
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "fusion::test".to_string(),
        message: format!("{:?} message", severity),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_with_file_line() {
    let entry = entry(LogSeverity::Error, Some("vulkan_swapchain.rs"), Some(42));
    assert_eq!(entry.source, "fusion::test");
    assert_eq!(entry.file, Some("vulkan_swapchain.rs"));
    assert_eq!(entry.line, Some(42));
}

#[test]
fn test_log_entry_clone() {
    let entry1 = entry(LogSeverity::Warn, None, None);
    let entry2 = entry1.clone();
    assert_eq!(entry1.severity, entry2.severity);
    assert_eq!(entry1.message, entry2.message);
}

#[test]
fn test_severity_tags_have_fixed_width() {
    for severity in [LogSeverity::Trace, LogSeverity::Debug, LogSeverity::Info, LogSeverity::Warn, LogSeverity::Error] {
        assert_eq!(severity.tag().len(), 5);
    }
    assert_eq!(LogSeverity::Info.tag().trim_end(), "INFO");
}

#[test]
fn test_format_plain_without_location() {
    let text = entry(LogSeverity::Info, None, None).format_plain();
    assert!(text.contains("[INFO ] [fusion::test] Info message"));
    assert!(!text.ends_with(')'));
}

#[test]
fn test_format_plain_appends_location() {
    let text = entry(LogSeverity::Error, Some("graphics.rs"), Some(12)).format_plain();
    assert!(text.contains("[ERROR] [fusion::test] Error message"));
    assert!(text.ends_with("(graphics.rs:12)"));
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        // Just verify it doesn't panic, with and without location
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("render_stage.rs"), Some(7)));
    }
}

#[test]
fn test_logger_is_object_safe() {
    let logger: Box<dyn Logger> = Box::new(DefaultLogger);
    logger.log(&entry(LogSeverity::Info, None, None));
}

// ============================================================================
// LOG ONCE TESTS
// ============================================================================

#[test]
fn test_log_once_reports_first_occurrence_only() {
    let once = LogOnce::new();
    assert!(once.first_time("u_color"));
    assert!(!once.first_time("u_color"));
    assert!(!once.first_time("u_color"));
    assert_eq!(once.len(), 1);
}

#[test]
fn test_log_once_tracks_distinct_keys() {
    let once = LogOnce::new();
    assert!(once.is_empty());
    assert!(once.first_time("albedo"));
    assert!(once.first_time("normal"));
    assert!(!once.first_time("albedo"));
    assert_eq!(once.len(), 2);
}

#[test]
fn test_log_once_across_threads() {
    let once = Arc::new(LogOnce::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let once = Arc::clone(&once);
            std::thread::spawn(move || once.first_time("shared") as usize)
        })
        .collect();

    let firsts: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(firsts, 1);
}
