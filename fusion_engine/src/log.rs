//! Engine logging
//!
//! Every component reports through one process-wide `Logger` (see
//! `Engine::set_logger`). Messages carry a severity, a source path such as
//! `"fusion::Graphics"` and, for errors, the file and line they came from.

use colored::*;
use rustc_hash::FxHashSet;
use std::sync::Mutex;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Sink for engine log entries
///
/// Implementations must tolerate calls from any thread: the frame thread,
/// cache users and the Vulkan validation callback all log concurrently.
///
/// ```no_run
/// use fusion_engine::fusion::log::{Logger, LogEntry, LogSeverity};
///
/// struct ErrorsToStderr;
///
/// impl Logger for ErrorsToStderr {
///     fn log(&self, entry: &LogEntry) {
///         if entry.severity == LogSeverity::Error {
///             eprintln!("{}: {}", entry.source, entry.message);
///         }
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// One log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Reporting component, e.g. "fusion::vulkan"
    pub source: String,
    pub message: String,
    /// Call site, only set by `engine_error!` / `engine_err!`
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

/// Log severity, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogSeverity {
    /// Fixed-width tag used in console output
    pub fn tag(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }
}

impl LogEntry {
    /// Plain-text rendering: `[timestamp] [SEVERITY] [source] message (file:line)`
    pub fn format_plain(&self) -> String {
        let datetime: DateTime<Local> = self.timestamp.into();
        let mut line = format!(
            "[{}] [{}] [{}] {}",
            datetime.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.severity.tag(),
            self.source,
            self.message
        );
        if let (Some(file), Some(line_no)) = (self.file, self.line) {
            line.push_str(&format!(" ({}:{})", file, line_no));
        }
        line
    }
}

/// Colored console logger, installed until `Engine::set_logger` replaces it
///
/// Warnings and errors go to stderr, the rest to stdout.
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let tag = entry.severity.tag();
        let severity = match entry.severity {
            LogSeverity::Trace => tag.bright_black(),
            LogSeverity::Debug => tag.cyan(),
            LogSeverity::Info => tag.green(),
            LogSeverity::Warn => tag.yellow(),
            LogSeverity::Error => tag.red().bold(),
        };
        let location = match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(" ({}:{})", file, line),
            _ => String::new(),
        };
        let text = format!(
            "[{}] [{}] [{}] {}{}",
            datetime.format("%Y-%m-%d %H:%M:%S%.3f"),
            severity,
            entry.source.bright_blue(),
            entry.message,
            location
        );

        if entry.severity >= LogSeverity::Warn {
            eprintln!("{}", text);
        } else {
            println!("{}", text);
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (very verbose, typically disabled)
///
/// # Example
///
/// ```no_run
/// # use fusion_engine::engine_trace;
/// # let frame = 0;
/// engine_trace!("fusion::Graphics", "Frame {} begin", frame);
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::fusion::Engine::log(
            $crate::fusion::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message (development information)
///
/// # Example
///
/// ```no_run
/// # use fusion_engine::engine_debug;
/// # let count = 0;
/// engine_debug!("fusion::RenderStage", "Rebuilt {} framebuffers", count);
/// ```
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::fusion::Engine::log(
            $crate::fusion::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message (important events)
///
/// # Example
///
/// ```no_run
/// # use fusion_engine::engine_info;
/// # let id = 0;
/// engine_info!("fusion::Graphics", "Surface {} registered", id);
/// ```
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::fusion::Engine::log(
            $crate::fusion::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (potential issues)
///
/// # Example
///
/// ```no_run
/// # use fusion_engine::engine_warn;
/// engine_warn!("fusion::Graphics", "Swapchain suboptimal, recreating");
/// ```
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::fusion::Engine::log(
            $crate::fusion::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
///
/// # Example
///
/// ```no_run
/// # use fusion_engine::engine_error;
/// # let result = ();
/// engine_error!("fusion::vulkan", "Failed to create render pass: {:?}", result);
/// ```
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::fusion::Engine::log_detailed(
            $crate::fusion::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR message and build an `Error::BackendError` from it
///
/// Evaluates to the error so it can be returned or used in `map_err`.
///
/// # Example
///
/// ```no_run
/// # use fusion_engine::engine_err;
/// # struct Device;
/// # impl Device {
/// #     unsafe fn create_render_pass(&self, _: &(), _: Option<()>) -> Result<(), i32> { Ok(()) }
/// # }
/// # fn main() -> fusion_engine::fusion::Result<()> {
/// # let device = Device;
/// # let info = ();
/// let pass = unsafe { device.create_render_pass(&info, None) }
///     .map_err(|e| engine_err!("fusion::vulkan", "Failed to create render pass: {:?}", e))?;
/// # let _ = pass;
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::fusion::Engine::log_detailed(
            $crate::fusion::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::fusion::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return `Err(Error::BackendError)` from the enclosing function
///
/// # Example
///
/// ```no_run
/// # use fusion_engine::engine_bail;
/// # fn main() -> fusion_engine::fusion::Result<()> {
/// # let (image_index, count) = (0u32, 1u32);
/// if image_index >= count {
///     engine_bail!("fusion::vulkan", "Image index {} out of range", image_index);
/// }
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

// ===== LOG ONCE =====

/// Remembers which keys were already reported
///
/// Used for caller-misuse warnings that would otherwise flood the log every
/// frame (e.g. a uniform name the shader does not declare).
#[derive(Debug, Default)]
pub struct LogOnce {
    seen: Mutex<FxHashSet<String>>,
}

impl LogOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `key` is seen, `false` afterwards
    pub fn first_time(&self, key: &str) -> bool {
        match self.seen.lock() {
            Ok(mut seen) => {
                if seen.contains(key) {
                    false
                } else {
                    seen.insert(key.to_string());
                    true
                }
            }
            Err(_) => false,
        }
    }

    /// Number of distinct keys reported so far
    pub fn len(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
