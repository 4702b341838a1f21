/// Fusion Engine - process-wide logger management
///
/// The render core itself carries no global state: every component receives
/// an explicit `GraphicsContext`. The only process-wide object is the logger,
/// so that any thread (frame thread, loader threads, validation callbacks)
/// can report through the same sink.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

fn entry(severity: LogSeverity, source: &str, message: String, location: Option<(&'static str, u32)>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: source.to_string(),
        message,
        file: location.map(|(file, _)| file),
        line: location.map(|(_, line)| line),
    }
}

// ===== PUBLIC API =====

/// Engine entry point for logging configuration
pub struct Engine;

impl Engine {
    /// Replace the active logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fusion_engine::fusion::Engine;
    /// use fusion_engine::fusion::log::{Logger, LogEntry};
    ///
    /// struct FileLogger;
    ///
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(logger_impl);
        }
    }

    /// Reinstall the colored console logger
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Send a message to the active logger (backs `engine_info!` and friends)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&entry(severity, source, message, None));
        }
    }

    /// Same as `log`, with the call site attached (backs `engine_error!`)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger().read() {
            lock.log(&entry(severity, source, message, Some((file, line))));
        }
    }
}
