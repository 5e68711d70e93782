//! FILENAME: core/report-engine/src/logging.rs
// PURPOSE: Categorized, sequence-numbered log lines for the report pipeline.
// CONTEXT: Lines have the shape `seq|CATEGORY|message` and go through the
//          `log` facade, so the host application picks the sink and level.

use std::sync::atomic::{AtomicU64, Ordering};

pub use log::Level;

/// Log target used for every line this crate writes.
pub const LOG_TARGET: &str = "report_engine";

/// Global sequence counter, shared by every pipeline run in the process.
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

/// Write a log line in unified format
pub fn write_log(level: Level, category: &str, message: &str) {
    if !log::log_enabled!(target: LOG_TARGET, level) {
        return;
    }
    let seq = next_seq();
    log::log!(target: LOG_TARGET, level, "{}|{}|{}", seq, category, message);
}

// ============================================================================
// MACRO DEFINITIONS & EXPORTS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log($crate::logging::Level::Debug, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log($crate::logging::Level::Info, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log($crate::logging::Level::Warn, $cat, &format!($($arg)*))
    };
}

pub use log_debug;
pub use log_info;
pub use log_warn;
