//! Serial transport abstraction
//!
//! All device I/O goes through the [`SerialTransport`] trait so the protocol
//! engine never touches a concrete port. Two implementations exist:
//!
//! - [`SerialManager`] - real hardware via the `serialport` crate, with a
//!   background reader thread that splits the byte stream into lines
//! - [`MockTransport`] - scripted in-process transport for tests and demos
//!
//! # Line callback
//!
//! The transport delivers received lines through a single registrable
//! callback, invoked on the transport's reader thread. Registering a new
//! callback replaces the previous one - this is how the handshake gate
//! hands the line stream over to the measurement session after the device
//! says hello.

pub mod mock;
pub mod serial;

pub use mock::MockTransport;
pub use serial::SerialManager;

use crate::error::Result;
use std::sync::Arc;

/// Handler invoked for every received line, on the transport's reader thread
pub type LineCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Line-oriented serial transport to the measurement device
///
/// Methods take `&self` so one transport can be shared across the
/// connecting thread, the session's watchdog thread and the reader thread;
/// implementations use interior mutability.
pub trait SerialTransport: Send + Sync {
    /// Open the named port; fails with a transport error when the port
    /// cannot be opened
    fn open(&self, port: &str) -> Result<()>;

    /// Close the port; idempotent
    fn close(&self);

    /// Whether the port is currently open
    fn is_open(&self) -> bool;

    /// Send one line (newline appended); fails with
    /// [`crate::TempLabError::NotConnected`] when closed
    fn write_line(&self, line: &str) -> Result<()>;

    /// Install the line callback, replacing any previous registrant
    fn set_line_callback(&self, callback: LineCallback);

    /// Remove the line callback; received lines are dropped until a new
    /// one is installed
    fn clear_line_callback(&self);
}

/// Names of serial ports present on this machine
pub fn list_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    }
}
