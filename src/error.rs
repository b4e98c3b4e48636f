//! Error handling for the templab engine
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for templab operations
#[derive(Error, Debug)]
pub enum TempLabError {
    /// Errors reported by the serial port layer
    #[error("Serial port error: {0}")]
    Transport(#[from] serialport::Error),

    /// An operation required an open transport but none was available
    #[error("Not connected: no open serial transport")]
    NotConnected,

    /// The device never sent its hello greeting within the deadline
    #[error("Handshake timed out after {timeout_ms} ms")]
    HandshakeTimeout { timeout_ms: u64 },

    /// Errors related to measurement session state
    #[error("Session error: {0}")]
    Session(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TempLabError>,
    },
}

impl TempLabError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TempLabError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for templab operations
pub type Result<T> = std::result::Result<T, TempLabError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TempLabError::Session("already started".to_string());
        assert_eq!(err.to_string(), "Session error: already started");
    }

    #[test]
    fn test_error_with_context() {
        let err = TempLabError::NotConnected;
        let with_ctx = err.with_context("Failed to start measurement");
        assert!(with_ctx.to_string().contains("Failed to start measurement"));
    }

    #[test]
    fn test_handshake_timeout_message() {
        let err = TempLabError::HandshakeTimeout { timeout_ms: 3000 };
        assert!(err.to_string().contains("3000 ms"));
    }
}
