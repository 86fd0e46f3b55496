#![deny(missing_docs)]
//! Shared logging utilities for the transcript workspace.
//!
//! This crate provides the `transcript_*` logging macros used across the
//! codebase, an error-chain formatter for diagnostics, and a minimal test
//! initializer for the global logger.

use std::error::Error;
use std::fmt::Write;

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! transcript_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! transcript_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! transcript_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! transcript_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! transcript_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Renders an error followed by every `source()` below it, one per line.
///
/// The first line is the error itself; each cause is prefixed with
/// `caused by: `. A cause whose text is already part of the line above it is
/// not repeated. Used wherever a failure is reported with its full trace.
pub fn error_chain(err: &dyn Error) -> String {
    let mut previous = err.to_string();
    let mut out = previous.clone();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !previous.contains(&text) {
            let _ = write!(out, "\n  caused by: {text}");
        }
        previous = text;
        source = cause.source();
    }
    out
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
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
