//! Integration tests for Engine logging
//!
//! Checks that the logger receives what the render core reports. No GPU
//! required.
//!
//! Run with: cargo test --test logging_integration_tests

use std::sync::{Arc, Mutex};
use serial_test::serial;
use fusion_engine::fusion::descriptor::{UniformBlock, UniformHandler};
use fusion_engine::fusion::log::{LogEntry, LogSeverity, Logger};
use fusion_engine::fusion::render::{Attachment, RenderStage, SubpassType, Viewport};
use fusion_engine::fusion::{Engine, Error};

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Logger capturing every entry
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGER
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log(LogSeverity::Info, "test::module", "Info message".to_string());
    Engine::log(LogSeverity::Warn, "test::module", "Warning message".to_string());

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].severity, LogSeverity::Info);
        assert_eq!(captured[1].message, "Warning message");
        assert_eq!(captured[1].file, None);
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);
    Engine::log(LogSeverity::Info, "test", "Message 1".to_string());

    Engine::reset_logger();
    Engine::log(LogSeverity::Info, "test", "Message 2".to_string());

    assert_eq!(entries.lock().unwrap().len(), 1);
}

// ============================================================================
// RENDER CORE REPORTS
// ============================================================================

#[test]
#[serial]
fn test_integration_invalid_stage_logs_error_with_location() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let result = RenderStage::new(
        vec![Attachment::depth(0, "depth_a"), Attachment::depth(1, "depth_b")],
        vec![SubpassType::new(0, vec![0, 1])],
        Viewport::default(),
    );
    assert!(matches!(result, Err(Error::InvalidDescription(_))));

    {
        let captured = entries.lock().unwrap();
        let errors: Vec<&LogEntry> = captured.iter().filter(|e| e.severity == LogSeverity::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].source, "fusion::RenderStage");
        assert!(errors[0].message.contains("depth_b"));
        assert!(errors[0].file.is_some());
        assert!(errors[0].line.is_some());
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_unknown_uniform_warned_once() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let mut handler = UniformHandler::new(UniformBlock::new(0).with_member("color", 0, 16));
    for _ in 0..5 {
        handler.push("colour", &[1.0f32; 4]);
    }

    {
        let captured = entries.lock().unwrap();
        let warnings: Vec<&LogEntry> = captured.iter().filter(|e| e.severity == LogSeverity::Warn).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].source, "fusion::UniformHandler");
        assert!(warnings[0].message.contains("colour"));
    }

    Engine::reset_logger();
}
