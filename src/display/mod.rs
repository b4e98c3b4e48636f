//! Display-side data model
//!
//! This module owns everything the plot surface consumes: the sliding-window
//! series buffer and the time-axis tick planner. No rendering happens here -
//! the UI shell (or the headless CLI) reads from these structures and draws
//! however it likes.
//!
//! # Components
//!
//! - [`SeriesBuffer`] - Per-sensor `(time, value)` sequences bounded to a
//!   trailing time window, with automatic eviction and y-range computation
//! - [`AxisTickPlanner`] - Picks human-friendly tick steps for a window span
//!   and generates positions and labels

pub mod axis;
pub mod series;

pub use axis::{AxisTickPlanner, Tick};
pub use series::{sensor_label, SeriesBuffer, SLACK_S};
