//! Core data types for templab
//!
//! This module contains the fundamental data structures shared between the
//! protocol codec, the measurement session and the display buffer.
//!
//! # Main Types
//!
//! - [`SensorKey`] - Stable string identifier for one telemetry channel
//! - [`SensorValues`] - Ordered sensor-to-value mapping for one frame
//! - [`Sample`] - A single timestamped set of sensor values
//!
//! # Ordering
//!
//! Sensor ordering matters for display: the first frame that mentions a
//! sensor fixes its position in the legend and the value cards. Frames are
//! therefore decoded into an [`IndexMap`](indexmap::IndexMap) which keeps
//! wire order, and [`crate::display::SeriesBuffer`] keeps first-seen order
//! across frames.

use indexmap::IndexMap;

/// Stable string identifier for one telemetry channel (e.g. `"T_DS0"`,
/// `"T_BME280"`). Opaque to the engine; the firmware picks the names.
pub type SensorKey = String;

/// Ordered mapping from sensor key to numeric value for one data frame
pub type SensorValues = IndexMap<SensorKey, f64>;

/// A single timestamped set of sensor values emitted by a running session
///
/// `time_s` is relative to the session's time origin (device `t_ms` base or
/// wall-clock base, see [`crate::session::MeasurementSession`]) and is
/// non-decreasing within one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Seconds since the session's time origin, always >= 0
    pub time_s: f64,
    /// Sensor readings carried by this frame, in wire order
    pub values: SensorValues,
}

impl Sample {
    /// Create a new sample
    pub fn new(time_s: f64, values: SensorValues) -> Self {
        Self { time_s, values }
    }

    /// The latest value for a given sensor in this sample, if present
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}
