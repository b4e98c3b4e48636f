//! Streaming measurement session
//!
//! Drives one measurement run over the serial link: sends `START`, routes
//! decoded data frames to the sink as timestamped samples, reports
//! progress against the configured duration, watches for stalled data
//! delivery, and sends `STOP` when the run ends (externally or by
//! duration).
//!
//! # Threads
//!
//! Two threads touch session state: the transport reader (via
//! [`MeasurementSession::handle_line`]) and the watchdog spawned by
//! [`MeasurementSession::start`], which ticks at a fixed 100 ms cadence.
//! Both go through one mutex; events leave through the crossbeam channel,
//! so the sink never shares that lock.
//!
//! # Time base
//!
//! The first non-empty data frame fixes the session's time base. If it
//! carries `t_ms`, that value becomes the origin and all sample times are
//! device-relative; otherwise sample times are wall-clock seconds since
//! `start()`. The two bases are never mixed within one session: under the
//! wall base later `t_ms` fields are ignored, and under the device base a
//! frame missing `t_ms` refreshes liveness but emits no sample.
//!
//! # Sessions are single-use
//!
//! `start()` succeeds only from the idle phase. Run-to-run reuse is a new
//! `MeasurementSession`, matching how the UI constructs one per run.

use crate::config::MeasurementConfig;
use crate::error::{Result, TempLabError};
use crate::protocol::{self, Message};
use crate::session::SessionEvent;
use crate::transport::{LineCallback, SerialTransport};
use crate::types::{Sample, SensorValues};
use crossbeam_channel::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Literal line sent to the device to begin sampling
const START_COMMAND: &str = "START";
/// Literal line sent to the device to end sampling
const STOP_COMMAND: &str = "STOP";

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Constructed, not yet started
    Idle,
    /// START sent, watchdog running
    Running,
    /// Stopped (externally, by duration, or by stall policy)
    Stopped,
}

/// Which clock sample times are computed against
#[derive(Debug, Clone, Copy)]
enum TimeBase {
    /// Device `t_ms` relative to the latched origin
    Device { t0_ms: f64 },
    /// Wall-clock seconds since `start()`
    Wall,
}

struct SessionState {
    phase: SessionPhase,
    started_at: Instant,
    last_data_at: Instant,
    time_base: Option<TimeBase>,
    stop_requested: bool,
    finished_sent: bool,
    stall_reported: bool,
}

struct SessionInner {
    transport: Arc<dyn SerialTransport>,
    events: Sender<SessionEvent>,
    config: MeasurementConfig,
    state: Mutex<SessionState>,
}

/// One measurement run; cheap to clone (shared handle)
#[derive(Clone)]
pub struct MeasurementSession {
    inner: Arc<SessionInner>,
}

impl MeasurementSession {
    /// Create an idle session over an already-connected transport
    pub fn new(
        transport: Arc<dyn SerialTransport>,
        config: MeasurementConfig,
        events: Sender<SessionEvent>,
    ) -> Self {
        let now = Instant::now();
        Self {
            inner: Arc::new(SessionInner {
                transport,
                events,
                config,
                state: Mutex::new(SessionState {
                    phase: SessionPhase::Idle,
                    started_at: now,
                    last_data_at: now,
                    time_base: None,
                    stop_requested: false,
                    finished_sent: false,
                    stall_reported: false,
                }),
            }),
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.inner.lock_state().phase
    }

    /// The configured measurement duration in seconds
    pub fn duration_s(&self) -> f64 {
        self.inner.config.duration_s
    }

    /// Begin the measurement: reset timing state, send `START`, start the
    /// watchdog
    ///
    /// Fails with [`TempLabError::NotConnected`] when the transport is
    /// closed (no state change; the caller should abort the run) and with
    /// a session error when the session was already started.
    pub fn start(&self) -> Result<()> {
        if !self.inner.transport.is_open() {
            return Err(TempLabError::NotConnected);
        }

        {
            let mut state = self.inner.lock_state();
            if state.phase != SessionPhase::Idle {
                return Err(TempLabError::Session(
                    "session already started; construct a new one per run".to_string(),
                ));
            }
            let now = Instant::now();
            state.phase = SessionPhase::Running;
            state.started_at = now;
            state.last_data_at = now;
            state.time_base = None;
        }

        self.inner.emit(SessionEvent::Progress(0.0));

        tracing::info!("Starting measurement, sending {}", START_COMMAND);
        if let Err(e) = self.inner.transport.write_line(START_COMMAND) {
            // The run never began; put the session back so the error is
            // purely a transport failure, not a half-started state.
            self.inner.lock_state().phase = SessionPhase::Idle;
            return Err(e.with_context("Failed to send start command"));
        }

        let watchdog_inner = self.inner.clone();
        std::thread::Builder::new()
            .name("measurement-watchdog".to_string())
            .spawn(move || watchdog_inner.watchdog_loop())?;

        Ok(())
    }

    /// End the measurement; idempotent and callable from any thread
    ///
    /// Sends `STOP` when the transport is open. The state transition and
    /// the single `Finished` event happen even when the write fails; the
    /// write error is returned so the caller can surface it.
    pub fn stop(&self) -> Result<()> {
        self.inner.stop()
    }

    /// Process one received line; invoked from the transport reader thread
    pub fn handle_line(&self, line: &str) {
        self.inner.handle_line(line);
    }

    /// A transport line callback routing into this session
    pub fn line_callback(&self) -> LineCallback {
        let session = self.clone();
        Arc::new(move |line: &str| session.handle_line(line))
    }
}

impl SessionInner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send an event without blocking the producing thread
    ///
    /// Data-bearing events are droppable under backpressure; `Finished`
    /// must arrive, so it uses a blocking send (the channel is bounded and
    /// the sink is expected to drain).
    fn emit(&self, event: SessionEvent) {
        if matches!(event, SessionEvent::Finished) {
            if self.events.send(event).is_err() {
                tracing::debug!("Event sink disconnected, dropping finished notification");
            }
        } else if self.events.try_send(event).is_err() {
            tracing::debug!("Event sink full or disconnected, dropping event");
        }
    }

    fn stop(&self) -> Result<()> {
        let emit_finished = {
            let mut state = self.lock_state();
            state.stop_requested = true;
            state.phase = SessionPhase::Stopped;
            let first = !state.finished_sent;
            state.finished_sent = true;
            first
        };

        let write_result = if self.transport.is_open() {
            tracing::info!("Stopping measurement, sending {}", STOP_COMMAND);
            self.transport
                .write_line(STOP_COMMAND)
                .map_err(|e| e.with_context("Failed to send stop command"))
        } else {
            Ok(())
        };

        if emit_finished {
            self.emit(SessionEvent::Finished);
        }

        write_result
    }

    fn handle_line(&self, line: &str) {
        match protocol::decode(line) {
            Message::Empty => {}
            Message::Malformed { raw } => {
                tracing::debug!("Discarding malformed frame: {:?}", raw);
            }
            Message::Hello => {
                // Handshake already passed; a stray hello carries no data
                tracing::debug!("Ignoring hello during measurement");
            }
            Message::Ack { cmd } => {
                tracing::debug!("Device acknowledged command: {:?}", cmd);
                self.emit(SessionEvent::DeviceAck { cmd });
            }
            Message::DeviceError { message } => {
                tracing::warn!("Device reported error: {:?}", message);
                self.emit(SessionEvent::DeviceError { message });
            }
            Message::Data {
                timestamp_ms,
                values,
            } => self.handle_data(timestamp_ms, values),
        }
    }

    fn handle_data(&self, timestamp_ms: Option<f64>, values: SensorValues) {
        if values.is_empty() {
            // Valid JSON, nothing to plot; notably does NOT count as
            // liveness for the watchdog
            tracing::debug!("Data frame without numeric sensor fields, skipping");
            return;
        }

        let sample = {
            let mut state = self.lock_state();
            if state.phase != SessionPhase::Running {
                tracing::trace!("Data frame outside running phase, dropping");
                return;
            }

            // The only path that refreshes watchdog liveness
            state.last_data_at = Instant::now();
            state.stall_reported = false;

            match Self::relative_time(&mut state, timestamp_ms) {
                Some(time_s) => Sample::new(time_s, values),
                None => return,
            }
        };

        tracing::trace!(
            "Sample at {:.3}s with {} sensor(s)",
            sample.time_s,
            sample.values.len()
        );
        self.emit(SessionEvent::Sample(sample));
    }

    /// Compute the relative sample time, latching the time base on the
    /// first data frame
    fn relative_time(state: &mut SessionState, timestamp_ms: Option<f64>) -> Option<f64> {
        let wall_elapsed_s = state.started_at.elapsed().as_secs_f64();

        match state.time_base {
            None => match timestamp_ms {
                Some(t_ms) => {
                    state.time_base = Some(TimeBase::Device { t0_ms: t_ms });
                    Some(0.0)
                }
                None => {
                    state.time_base = Some(TimeBase::Wall);
                    Some(wall_elapsed_s)
                }
            },
            Some(TimeBase::Device { t0_ms }) => match timestamp_ms {
                Some(t_ms) => Some(((t_ms - t0_ms) / 1000.0).max(0.0)),
                None => {
                    // Bases never mix: no invented timestamp for this frame
                    tracing::debug!("Data frame missing t_ms under device time base, no sample");
                    None
                }
            },
            Some(TimeBase::Wall) => Some(wall_elapsed_s),
        }
    }

    /// Watchdog: fixed-cadence progress, stall detection, duration stop
    fn watchdog_loop(self: Arc<Self>) {
        let period = Duration::from_millis(self.config.watchdog_period_ms);
        let duration_s = self.config.duration_s;
        tracing::debug!("Watchdog started, {}s measurement", duration_s);

        loop {
            std::thread::sleep(period);

            let (elapsed_s, stalled_for_s) = {
                let mut state = self.lock_state();
                if state.stop_requested || state.phase != SessionPhase::Running {
                    break;
                }

                let elapsed_s = state.started_at.elapsed().as_secs_f64();
                let silent_s = state.last_data_at.elapsed().as_secs_f64();
                let stalled_for_s = if silent_s > self.config.no_data_timeout_s
                    && !state.stall_reported
                {
                    state.stall_reported = true;
                    Some(silent_s)
                } else {
                    None
                };
                (elapsed_s, stalled_for_s)
            };

            self.emit(SessionEvent::Progress((elapsed_s / duration_s).min(1.0)));

            if let Some(silent_for_s) = stalled_for_s {
                tracing::warn!("No data for {:.1}s", silent_for_s);
                self.emit(SessionEvent::DataStall {
                    silent_for_s,
                });
                // Report-only by default; stopping here is an opt-in policy
                if self.config.auto_stop_on_stall {
                    let _ = self.stop();
                    break;
                }
            }

            if elapsed_s >= duration_s {
                tracing::info!("Measurement duration reached");
                let _ = self.stop();
                break;
            }
        }

        tracing::debug!("Watchdog exiting");
    }
}
