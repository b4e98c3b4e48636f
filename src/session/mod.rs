//! Measurement session orchestration
//!
//! This module owns the protocol state machines that sit between the
//! transport and the display sink:
//!
//! - [`HandshakeGate`] - one-shot gate that holds the connection attempt
//!   until the device says hello (or the deadline passes)
//! - [`MeasurementSession`] - start/stop sequencing, relative-time
//!   computation, watchdog-based liveness detection and progress reporting
//!
//! # Event delivery
//!
//! The session publishes [`SessionEvent`]s through a bounded crossbeam
//! channel created by [`event_channel`]. Events are produced on two
//! threads (the transport reader and the session watchdog) and the sink
//! drains the receiver on whatever thread it likes - a GUI marshals them
//! onto its frame loop, the headless CLI consumes them inline.

pub mod handshake;
pub mod measurement;

pub use handshake::{connect_with_handshake, HandshakeGate, HandshakeState};
pub use measurement::{MeasurementSession, SessionPhase};

use crate::types::Sample;
use crossbeam_channel::{bounded, Receiver, Sender};

/// Capacity of the session event channel
///
/// Generous for the firmware's sample rates; if the sink stalls anyway,
/// data-bearing events are dropped rather than blocking the reader thread.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Notification from a running session to the display sink
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A decoded data frame, timestamped relative to the session origin
    Sample(Sample),
    /// Fraction of the configured duration elapsed, in `[0, 1]`
    Progress(f64),
    /// Device acknowledged a command; informational only
    DeviceAck { cmd: Option<String> },
    /// Device reported a fault; informational only
    DeviceError { message: Option<String> },
    /// No data frame has arrived for longer than the liveness window.
    /// Report-only unless the auto-stop policy is enabled.
    DataStall { silent_for_s: f64 },
    /// The measurement ended; emitted exactly once per session
    Finished,
}

/// Create the session-to-sink event channel
pub fn event_channel() -> (Sender<SessionEvent>, Receiver<SessionEvent>) {
    bounded(EVENT_CHANNEL_CAPACITY)
}
