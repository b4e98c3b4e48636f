//! Handshake gate: wait for the device's hello before enabling measurement
//!
//! After the port opens, the device announces itself with
//! `{"type":"hello", ...}`. The gate holds the connection attempt until
//! that greeting arrives or a deadline (3 s by default) passes. Timeout is
//! fatal to the attempt: the transport is closed and the caller gets a
//! distinct error so the connect UI can reset. The gate is one-shot - a
//! new open + gate cycle is required after a timeout.

use crate::error::{Result, TempLabError};
use crate::protocol::{self, Message};
use crate::transport::SerialTransport;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How long to wait for the device's hello
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Gate state; transitions are `Waiting -> Confirmed` or `Waiting -> TimedOut`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Hello not seen yet, deadline pending
    Waiting,
    /// Hello received within the deadline
    Confirmed,
    /// Deadline elapsed first; the gate cannot be resumed
    TimedOut,
}

/// One-shot state machine gating readiness on the device's hello
///
/// `observe_line` runs on the transport reader thread; `wait` blocks the
/// connecting thread until confirmation or deadline. Confirmation crosses
/// threads through a rendezvous channel.
pub struct HandshakeGate {
    deadline: Instant,
    state: Mutex<HandshakeState>,
    confirm_tx: Sender<()>,
    confirm_rx: Receiver<()>,
}

impl HandshakeGate {
    /// Create a gate whose deadline starts now
    pub fn new(timeout: Duration) -> Arc<Self> {
        let (confirm_tx, confirm_rx) = bounded(1);
        Arc::new(Self {
            deadline: Instant::now() + timeout,
            state: Mutex::new(HandshakeState::Waiting),
            confirm_tx,
            confirm_rx,
        })
    }

    /// Current gate state
    pub fn state(&self) -> HandshakeState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feed one received line through the gate
    ///
    /// A decoded `Hello` while waiting confirms the gate; every other
    /// message (and anything after confirmation or timeout) is ignored.
    pub fn observe_line(&self, line: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != HandshakeState::Waiting {
            return;
        }
        if protocol::decode(line) == Message::Hello {
            *state = HandshakeState::Confirmed;
            tracing::info!("Handshake confirmed by device hello");
            let _ = self.confirm_tx.try_send(());
        }
    }

    /// Block until the gate confirms or the deadline passes
    pub fn wait(&self) -> HandshakeState {
        match self.confirm_rx.recv_deadline(self.deadline) {
            Ok(()) => HandshakeState::Confirmed,
            Err(_) => {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                // A hello may have slipped in right at the deadline
                if *state == HandshakeState::Waiting {
                    *state = HandshakeState::TimedOut;
                }
                *state
            }
        }
    }
}

/// Open a port and wait for the device's hello
///
/// On timeout the transport is closed and the callback cleared before the
/// error is returned. On success the gate's callback stays registered
/// (inert once confirmed) until the measurement session installs its own.
pub fn connect_with_handshake(
    transport: &Arc<dyn SerialTransport>,
    port: &str,
    timeout: Duration,
) -> Result<()> {
    transport.open(port)?;

    let gate = HandshakeGate::new(timeout);
    let gate_cb = gate.clone();
    transport.set_line_callback(Arc::new(move |line: &str| gate_cb.observe_line(line)));

    match gate.wait() {
        HandshakeState::Confirmed => Ok(()),
        _ => {
            tracing::warn!("No hello from device within {:?}, closing port", timeout);
            transport.clear_line_callback();
            transport.close();
            Err(TempLabError::HandshakeTimeout {
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_hello_confirms_gate() {
        let gate = HandshakeGate::new(Duration::from_secs(1));
        gate.observe_line(r#"{"type":"hello"}"#);
        assert_eq!(gate.state(), HandshakeState::Confirmed);
        assert_eq!(gate.wait(), HandshakeState::Confirmed);
    }

    #[test]
    fn test_non_hello_messages_ignored() {
        let gate = HandshakeGate::new(Duration::from_millis(50));
        gate.observe_line(r#"{"type":"ack","cmd":"start"}"#);
        gate.observe_line(r#"{"t_ms":1,"T_DS0":20.0}"#);
        gate.observe_line("garbage");
        assert_eq!(gate.state(), HandshakeState::Waiting);
        assert_eq!(gate.wait(), HandshakeState::TimedOut);
    }

    #[test]
    fn test_gate_is_one_shot() {
        let gate = HandshakeGate::new(Duration::from_millis(10));
        assert_eq!(gate.wait(), HandshakeState::TimedOut);
        // A late hello must not resurrect a timed-out gate
        gate.observe_line(r#"{"type":"hello"}"#);
        assert_eq!(gate.state(), HandshakeState::TimedOut);
    }

    #[test]
    fn test_connect_success() {
        let mock = Arc::new(MockTransport::new());
        let transport: Arc<dyn SerialTransport> = mock.clone();

        let bg_mock = mock.clone();
        let bg = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            bg_mock.inject_line(r#"{"type":"hello","device":"temp-lab-v2"}"#);
        });

        let result = connect_with_handshake(&transport, "mock0", Duration::from_secs(1));
        bg.join().unwrap();

        assert!(result.is_ok());
        assert!(transport.is_open());
    }

    #[test]
    fn test_connect_timeout_closes_transport() {
        let mock = Arc::new(MockTransport::new());
        let transport: Arc<dyn SerialTransport> = mock.clone();

        let result = connect_with_handshake(&transport, "mock0", Duration::from_millis(30));
        assert!(matches!(result, Err(TempLabError::HandshakeTimeout { .. })));
        assert!(!transport.is_open());
        assert!(!mock.has_line_callback());
    }

    #[test]
    fn test_connect_open_failure_propagates() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_next_open();
        let transport: Arc<dyn SerialTransport> = mock.clone();

        let result = connect_with_handshake(&transport, "mock0", Duration::from_millis(30));
        assert!(result.is_err());
        assert!(!matches!(result, Err(TempLabError::HandshakeTimeout { .. })));
    }
}
