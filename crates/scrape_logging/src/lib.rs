#![deny(missing_docs)]
//! Shared logging utilities for the scraper controller workspace.
//!
//! This crate provides the `scrape_*` logging macros used across the codebase,
//! a process-wide job context that prefixes every message with the active job,
//! and a minimal test initializer for the global logger.

use std::sync::atomic::{AtomicU64, Ordering};

/// Raw id of the job currently being tracked, or 0 when no job is active.
static JOB_CONTEXT: AtomicU64 = AtomicU64::new(0);

/// Sets the job id that subsequent log messages are attributed to.
/// Pass `None` once the job has reached a terminal state.
pub fn set_job_context(job_id: Option<u64>) {
    JOB_CONTEXT.store(job_id.unwrap_or(0), Ordering::Relaxed);
}

/// Retrieves the job id set by [`set_job_context`], if any.
pub fn job_context() -> Option<u64> {
    match JOB_CONTEXT.load(Ordering::Relaxed) {
        0 => None,
        id => Some(id),
    }
}

/// Returns the `[job N] ` prefix for the active job, or an empty string.
#[doc(hidden)]
pub fn job_prefix() -> String {
    job_context()
        .map(|id| format!("[job {id}] "))
        .unwrap_or_default()
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! scrape_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! scrape_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! scrape_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! scrape_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! scrape_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
