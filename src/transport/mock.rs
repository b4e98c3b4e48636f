//! Mock serial transport for testing without hardware
//!
//! [`MockTransport`] implements [`SerialTransport`] entirely in process:
//! tests inject device lines with [`MockTransport::inject_line`] and
//! inspect what the host sent with [`MockTransport::sent_lines`]. Injected
//! lines are delivered synchronously on the caller's thread, which makes
//! test timing deterministic.

use crate::error::{Result, TempLabError};
use crate::transport::{LineCallback, SerialTransport};
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
struct MockState {
    open: bool,
    sent: Vec<String>,
    fail_next_open: bool,
    fail_writes: bool,
}

/// Scripted in-process transport
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    callback: Mutex<Option<LineCallback>>,
}

impl MockTransport {
    /// Create a closed mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open()` call fail (port missing, permissions, ...)
    pub fn fail_next_open(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_next_open = true;
    }

    /// Make every subsequent `write_line()` fail with an IO error
    pub fn fail_writes(&self, fail: bool) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_writes = fail;
    }

    /// Deliver one device line to the registered callback
    ///
    /// Dropped silently when the port is closed or no callback is
    /// installed, mirroring real-transport behavior.
    pub fn inject_line(&self, line: &str) {
        if !self.is_open() {
            return;
        }
        let handler = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(line);
        }
    }

    /// Lines the host has written so far, oldest first
    pub fn sent_lines(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .clone()
    }

    /// True when a line callback is currently installed
    pub fn has_line_callback(&self) -> bool {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl SerialTransport for MockTransport {
    fn open(&self, port: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.fail_next_open {
            state.fail_next_open = false;
            return Err(TempLabError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("mock port {} not available", port),
            )));
        }
        state.open = true;
        Ok(())
    }

    fn close(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .open = false;
    }

    fn is_open(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .open
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.open {
            return Err(TempLabError::NotConnected);
        }
        if state.fail_writes {
            return Err(TempLabError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        state.sent.push(line.to_string());
        Ok(())
    }

    fn set_line_callback(&self, callback: LineCallback) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn clear_line_callback(&self) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_open_close_cycle() {
        let transport = MockTransport::new();
        assert!(!transport.is_open());
        transport.open("mock0").unwrap();
        assert!(transport.is_open());
        transport.close();
        assert!(!transport.is_open());
    }

    #[test]
    fn test_write_records_lines() {
        let transport = MockTransport::new();
        transport.open("mock0").unwrap();
        transport.write_line("START").unwrap();
        transport.write_line("STOP").unwrap();
        assert_eq!(transport.sent_lines(), vec!["START", "STOP"]);
    }

    #[test]
    fn test_write_when_closed_fails() {
        let transport = MockTransport::new();
        assert!(matches!(
            transport.write_line("START"),
            Err(TempLabError::NotConnected)
        ));
    }

    #[test]
    fn test_inject_reaches_callback() {
        let transport = MockTransport::new();
        transport.open("mock0").unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        transport.set_line_callback(Arc::new(move |line: &str| {
            sink.lock().unwrap().push(line.to_string());
        }));

        transport.inject_line("{\"type\":\"hello\"}");
        assert_eq!(received.lock().unwrap().as_slice(), ["{\"type\":\"hello\"}"]);
    }

    #[test]
    fn test_inject_dropped_when_closed() {
        let transport = MockTransport::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        transport.set_line_callback(Arc::new(move |line: &str| {
            sink.lock().unwrap().push(line.to_string());
        }));

        transport.inject_line("lost");
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fail_next_open() {
        let transport = MockTransport::new();
        transport.fail_next_open();
        assert!(transport.open("mock0").is_err());
        // The failure is one-shot
        assert!(transport.open("mock0").is_ok());
    }
}
