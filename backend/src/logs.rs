//! Leveled console logging for pipeline runs.
//!
//! A single process-wide [`Logger`] prints entries to stderr. A numeric
//! verbosity threshold decides what is shown: warnings and errors always,
//! info from 3, detail from 6, debug from 10.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Default verbosity, matching the CLI default.
pub const DEFAULT_VERBOSITY: u8 = 5;

/// Log level for console display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Detail,
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Minimum verbosity at which entries of this level are printed.
    fn threshold(self) -> u8 {
        match self {
            LogLevel::Debug => 10,
            LogLevel::Detail => 6,
            LogLevel::Info | LogLevel::Success => 3,
            LogLevel::Warning | LogLevel::Error => 0,
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Optional indentation level (for nested logs)
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Render the entry the way it is printed.
    pub fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Debug => "   ·",
            LogLevel::Detail | LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(self.indent as usize);
        format!("{}{} {}", indent, prefix, self.message)
    }
}

/// Global logger
pub static LOGGER: Lazy<Logger> = Lazy::new(Logger::new);

/// Prints entries that pass the verbosity threshold.
pub struct Logger {
    verbosity: AtomicU8,
}

impl Logger {
    pub fn new() -> Self {
        Self { verbosity: AtomicU8::new(DEFAULT_VERBOSITY) }
    }

    pub fn set_verbosity(&self, level: u8) {
        self.verbosity.store(level, Ordering::Relaxed);
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity.load(Ordering::Relaxed)
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        self.verbosity() >= level.threshold()
    }

    pub fn log(&self, entry: LogEntry) {
        if self.enabled(entry.level) {
            eprintln!("{}", entry.render());
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Set the global verbosity threshold.
pub fn set_verbosity(level: u8) {
    LOGGER.set_verbosity(level);
}

pub fn log_debug(msg: impl Into<String>) {
    LOGGER.log(LogEntry::new(LogLevel::Debug, msg));
}

pub fn log_detail(msg: impl Into<String>) {
    LOGGER.log(LogEntry::new(LogLevel::Detail, msg));
}

pub fn log_info(msg: impl Into<String>) {
    LOGGER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOGGER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOGGER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOGGER.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOGGER.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}
