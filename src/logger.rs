//! Logging utilities with colored output and a single-line build status.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro for verbose-only output
//! - a build status line (start / ready / fail) that overwrites itself
//!
//! # Example
//!
//! ```ignore
//! log!("serve"; "http://{}", addr);
//!
//! status_start("building src/root.tsx (production)");
//! status_ready("app ready on http://127.0.0.1:3000");
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Global silent flag (set by --silent CLI argument)
static SILENT: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Set silent mode globally
pub fn set_silent(s: bool) {
    SILENT.store(s, Ordering::SeqCst);
}

/// Check if silent mode is enabled
pub fn is_silent() -> bool {
    SILENT.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    if is_silent() {
        return;
    }

    let prefix = colorize_prefix(module);
    let mut stdout = stdout().lock();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module {
        "serve" => prefix.bright_blue().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Build Status Line
// ============================================================================

/// Single-line build status display.
///
/// `start()` prints an in-progress line; `ready()`/`fail()` overwrite it
/// with the final symbol, so a build occupies one terminal line end to end.
pub struct StatusLine {
    /// A start line is on screen and should be overwritten
    pending: bool,
}

/// Global status line shared by build and serve phases.
static STATUS: LazyLock<Mutex<StatusLine>> = LazyLock::new(|| Mutex::new(StatusLine::new()));

impl StatusLine {
    pub const fn new() -> Self {
        Self { pending: false }
    }

    /// Display an in-progress message.
    pub fn start(&mut self, message: &str) {
        self.display(format!("{}", "…".dimmed()), message);
        self.pending = true;
    }

    /// Display a success message (✓ prefix, green), replacing the start line.
    pub fn ready(&mut self, message: &str) {
        self.display(format!("{}", "✓".green()), message);
        self.pending = false;
    }

    /// Display a failure message (✗ prefix, red), replacing the start line.
    pub fn fail(&mut self, message: &str) {
        self.display(format!("{}", "✗".red()), message);
        self.pending = false;
    }

    fn display(&mut self, symbol: String, message: &str) {
        let mut stdout = stdout().lock();

        if self.pending {
            execute!(stdout, cursor::MoveUp(1), Clear(ClearType::FromCursorDown)).ok();
        }

        writeln!(stdout, "{symbol} {message}").ok();
        stdout.flush().ok();
    }
}

/// Global status line: build started
pub fn status_start(message: &str) {
    if !is_silent() {
        STATUS.lock().start(message);
    }
}

/// Global status line: build succeeded
pub fn status_ready(message: &str) {
    if !is_silent() {
        STATUS.lock().ready(message);
    }
}

/// Global status line: build failed
pub fn status_fail(message: &str) {
    if !is_silent() {
        STATUS.lock().fail(message);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_pending() {
        let mut status = StatusLine::new();
        assert!(!status.pending);

        status.start("building");
        assert!(status.pending);

        status.ready("done");
        assert!(!status.pending);
    }

    #[test]
    fn test_colorize_prefix_contains_module() {
        assert!(colorize_prefix("serve").contains("[serve]"));
        assert!(colorize_prefix("build").contains("[build]"));
    }
}
