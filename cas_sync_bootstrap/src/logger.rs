// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Logger
//!
//! A minimal logging trait for the window before
//! [`crate::shutdown`] and the application's own tracing subscriber
//! (`cas_sync::infrastructure::logging`) are installed. Kept separate from
//! the application's [`crate::logger`]-unrelated progress reporter so
//! bootstrap failures (bad CLI args, missing config file) can still be
//! reported even if subscriber initialization itself is what failed.

#[cfg(test)]
use std::fmt;

/// Bootstrap-phase logging abstraction.
pub trait BootstrapLogger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Routes bootstrap messages through `tracing`, tagged with a prefix.
pub struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::with_prefix("bootstrap")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapLogger for ConsoleLogger {
    fn error(&self, message: &str) {
        tracing::error!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }
}

/// Discards everything. Used where a `BootstrapLogger` is required but
/// output is not wanted (library embedding, quiet mode).
pub struct NoOpLogger;

impl NoOpLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapLogger for NoOpLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

#[cfg(test)]
pub struct CapturingLogger {
    messages: std::sync::Arc<std::sync::Mutex<Vec<LogMessage>>>,
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

#[cfg(test)]
impl CapturingLogger {
    pub fn new() -> Self {
        Self {
            messages: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn messages(&self) -> Vec<LogMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.messages.lock().unwrap().push(LogMessage {
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
impl BootstrapLogger for CapturingLogger {
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
}

#[cfg(test)]
impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Debug => write!(f, "DEBUG"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_logger_does_not_panic() {
        let logger = ConsoleLogger::new();
        logger.info("test message");
    }

    #[test]
    fn console_logger_with_prefix_does_not_panic() {
        let logger = ConsoleLogger::with_prefix("custom");
        logger.debug("test message");
    }

    #[test]
    fn noop_logger_discards_everything() {
        let logger = NoOpLogger::new();
        logger.error("error");
        logger.warn("warning");
        logger.info("info");
        logger.debug("debug");
    }

    #[test]
    fn capturing_logger_records_in_order() {
        let logger = CapturingLogger::new();

        logger.error("error message");
        logger.warn("warning message");
        logger.info("info message");
        logger.debug("debug message");

        let messages = logger.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].level, LogLevel::Error);
        assert_eq!(messages[0].message, "error message");
        assert_eq!(messages[3].level, LogLevel::Debug);
    }

    #[test]
    fn capturing_logger_clear_resets_buffer() {
        let logger = CapturingLogger::new();

        logger.info("message 1");
        logger.info("message 2");
        assert_eq!(logger.messages().len(), 2);

        logger.clear();
        assert_eq!(logger.messages().len(), 0);

        logger.info("message 3");
        assert_eq!(logger.messages().len(), 1);
    }
}
