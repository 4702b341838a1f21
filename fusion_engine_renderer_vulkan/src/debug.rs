/// Vulkan debug messenger - validation layer messages routed to the engine logger
///
/// Severity filtering happens when the messenger is created (see
/// `severity_flags`); the callback only maps the message to a log severity
/// and counts it.

use ash::vk;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};
use fusion_engine::fusion::device::DebugSeverity;
use fusion_engine::{engine_debug, engine_error, engine_info, engine_warn};

const SOURCE: &str = "fusion::vulkan::validation";

/// Counters of validation messages received since startup
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
}

static ERRORS: AtomicU32 = AtomicU32::new(0);
static WARNINGS: AtomicU32 = AtomicU32::new(0);
static INFO: AtomicU32 = AtomicU32::new(0);
static VERBOSE: AtomicU32 = AtomicU32::new(0);

/// Current validation statistics
pub fn validation_stats() -> ValidationStats {
    ValidationStats {
        errors: ERRORS.load(Ordering::Relaxed),
        warnings: WARNINGS.load(Ordering::Relaxed),
        info: INFO.load(Ordering::Relaxed),
        verbose: VERBOSE.load(Ordering::Relaxed),
    }
}

/// Messenger severity mask for a configured verbosity
pub(crate) fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Vulkan debug messenger callback
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;
    let message_id = if callback_data.p_message_id_name.is_null() {
        "Unknown".into()
    } else {
        CStr::from_ptr(callback_data.p_message_id_name).to_string_lossy()
    };
    let message = if callback_data.p_message.is_null() {
        "No message".into()
    } else {
        CStr::from_ptr(callback_data.p_message).to_string_lossy()
    };
    let kind = message_type_name(message_type);

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        ERRORS.fetch_add(1, Ordering::Relaxed);
        engine_error!(SOURCE, "[{}] {}: {}", kind, message_id, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        WARNINGS.fetch_add(1, Ordering::Relaxed);
        engine_warn!(SOURCE, "[{}] {}: {}", kind, message_id, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        INFO.fetch_add(1, Ordering::Relaxed);
        engine_info!(SOURCE, "[{}] {}: {}", kind, message_id, message);
    } else {
        VERBOSE.fetch_add(1, Ordering::Relaxed);
        engine_debug!(SOURCE, "[{}] {}: {}", kind, message_id, message);
    }

    // Never abort the Vulkan call
    vk::FALSE
}
