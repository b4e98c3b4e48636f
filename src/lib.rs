//! # TempLab: serial temperature measurement engine
//!
//! Talks to a lab temperature logger over a serial line, runs timed
//! measurements, and maintains the data structures a live plot needs. The
//! device streams newline-delimited JSON; the host side here handles the
//! hello handshake, the `START`/`STOP` command exchange, sample timing,
//! progress tracking, and stall detection.
//!
//! ## Architecture
//!
//! - **Transport**: A background reader thread per open port, delivering
//!   complete lines through a callback ([`transport`])
//! - **Protocol**: Tolerant line decoder for the device's JSON frames
//!   ([`protocol`])
//! - **Session**: Handshake gate and measurement lifecycle with a
//!   watchdog thread ([`session`])
//! - **Display**: Sliding-window series buffer and time-axis tick
//!   planning for the plot ([`display`])
//! - **Communication**: Crossbeam channels carry session events from the
//!   worker threads to the consumer
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform config directory
//! under `dev.templab`; every field has a default.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use templab::{
//!     config::AppConfig,
//!     session::{connect_with_handshake, event_channel, MeasurementSession, SessionEvent},
//!     transport::{SerialManager, SerialTransport},
//! };
//!
//! fn main() -> templab::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let transport: Arc<dyn SerialTransport> =
//!         Arc::new(SerialManager::new(config.serial.baud_rate));
//!
//!     connect_with_handshake(
//!         &transport,
//!         "/dev/ttyUSB0",
//!         std::time::Duration::from_millis(config.serial.handshake_timeout_ms),
//!     )?;
//!
//!     let (tx, rx) = event_channel();
//!     let session = MeasurementSession::new(transport.clone(), config.measurement, tx);
//!     transport.set_line_callback(session.line_callback());
//!     session.start()?;
//!
//!     for event in rx {
//!         match event {
//!             SessionEvent::Sample(sample) => println!("{:?}", sample),
//!             SessionEvent::Finished => break,
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod display;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use display::{AxisTickPlanner, SeriesBuffer};
pub use error::{Result, TempLabError};
pub use session::{MeasurementSession, SessionEvent, SessionPhase};
pub use transport::{SerialManager, SerialTransport};
pub use types::{Sample, SensorValues};
