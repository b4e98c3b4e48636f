//! Sliding-window series storage for live plotting
//!
//! One [`SeriesBuffer`] holds, per sensor key, an ordered sequence of
//! `(time_s, value)` pairs. Series are created on first sight and keep
//! first-seen order, which the UI uses for legend and card ordering. After
//! each appended sample the buffer evicts leading points that fell out of
//! the trailing time window, so memory stays bounded regardless of run
//! length.

use crate::types::Sample;
use indexmap::IndexMap;
use std::collections::VecDeque;

/// Grace margin added to the window before eviction, in seconds
///
/// Keeps points from being dropped at the window edge by minor timestamp
/// jitter.
pub const SLACK_S: f64 = 5.0;

/// Headroom fraction applied on both sides of the y-range
const Y_MARGIN: f64 = 0.1;

/// Minimum y-span; avoids a degenerate zero-height range for near-constant
/// signals
const Y_SPAN_FLOOR: f64 = 1.0;

/// Human-friendly display name for a sensor key
///
/// Knows the temp-lab firmware's naming scheme: `T_BME`/`T_BME280` is the
/// BME280 ambient sensor and `T_DS<n>` is the n-th DS18B20 probe (numbered
/// from 1 for display). Unknown keys are shown verbatim.
pub fn sensor_label(key: &str) -> String {
    if key == "T_BME" || key == "T_BME280" {
        return "BME280".to_string();
    }
    if let Some(index_str) = key.strip_prefix("T_DS") {
        if let Ok(index) = index_str.parse::<u32>() {
            return format!("DS18B20 #{}", index + 1);
        }
    }
    key.to_string()
}

/// Per-sensor sliding-window `(time, value)` storage
///
/// Single-writer: only the sample stream emitted by the measurement session
/// mutates this buffer. Times are non-decreasing per key by construction
/// (session-relative time is monotonic); out-of-order input is accepted
/// as-is and never re-sorted.
#[derive(Debug)]
pub struct SeriesBuffer {
    /// Trailing window span in seconds
    window_s: f64,
    /// Series keyed by sensor, in first-seen order
    series: IndexMap<String, VecDeque<(f64, f64)>>,
}

impl SeriesBuffer {
    /// Create a buffer with the given trailing window span
    pub fn new(window_s: f64) -> Self {
        Self {
            window_s,
            series: IndexMap::new(),
        }
    }

    /// The current window span in seconds
    pub fn window_s(&self) -> f64 {
        self.window_s
    }

    /// Change the window span; ignored for non-positive spans
    ///
    /// Used between runs when the measurement duration changes. Eviction
    /// against the new span happens on the next append.
    pub fn set_window(&mut self, window_s: f64) {
        if window_s > 0.0 {
            self.window_s = window_s;
        }
    }

    /// Append one point for one sensor, creating the series on first sight
    pub fn add_point(&mut self, key: &str, time_s: f64, value: f64) {
        self.series
            .entry(key.to_string())
            .or_default()
            .push_back((time_s, value));
    }

    /// Append a whole sample (one point per carried sensor), then evict
    pub fn push_sample(&mut self, sample: &Sample) {
        for (key, value) in &sample.values {
            self.add_point(key, sample.time_s, *value);
        }
        self.evict();
    }

    /// Drop leading points older than `latest - window - slack`, per key
    pub fn evict(&mut self) {
        for points in self.series.values_mut() {
            let Some(&(latest, _)) = points.back() else {
                continue;
            };
            let cutoff = latest - self.window_s - SLACK_S;
            while points.front().is_some_and(|&(t, _)| t < cutoff) {
                points.pop_front();
            }
        }
    }

    /// Sensor keys in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Retained points for one sensor, oldest first
    pub fn points(&self, key: &str) -> Option<&VecDeque<(f64, f64)>> {
        self.series.get(key)
    }

    /// Total retained points across all sensors
    pub fn len(&self) -> usize {
        self.series.values().map(VecDeque::len).sum()
    }

    /// True when no points are retained
    pub fn is_empty(&self) -> bool {
        self.series.values().all(VecDeque::is_empty)
    }

    /// Latest retained time across all sensors
    pub fn latest_time(&self) -> Option<f64> {
        self.series
            .values()
            .filter_map(|points| points.back().map(|&(t, _)| t))
            .fold(None, |acc, t| Some(acc.map_or(t, |a: f64| a.max(t))))
    }

    /// Display y-range over all retained points: `(min - 0.1*span,
    /// max + 0.1*span)` with a span floor of 1.0. `None` when empty.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut any = false;

        for points in self.series.values() {
            for &(_, value) in points {
                min = min.min(value);
                max = max.max(value);
                any = true;
            }
        }

        if !any {
            return None;
        }

        let span = (max - min).max(Y_SPAN_FLOOR);
        Some((min - span * Y_MARGIN, max + span * Y_MARGIN))
    }

    /// Drop all series state; used between runs
    pub fn clear(&mut self) {
        self.series.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SensorValues;

    #[test]
    fn test_first_seen_order_preserved() {
        let mut buffer = SeriesBuffer::new(60.0);
        buffer.add_point("T_DS1", 0.0, 21.0);
        buffer.add_point("T_BME", 0.0, 23.0);
        buffer.add_point("T_DS0", 0.5, 22.0);
        // Re-appending an existing key must not move it
        buffer.add_point("T_BME", 0.5, 23.1);

        let keys: Vec<_> = buffer.keys().collect();
        assert_eq!(keys, vec!["T_DS1", "T_BME", "T_DS0"]);
    }

    #[test]
    fn test_eviction_cutoff() {
        // window=60, slack=5: after feeding t=0..100 nothing older than 35
        // may remain
        let mut buffer = SeriesBuffer::new(60.0);
        for t in 0..=100 {
            buffer.add_point("T_DS0", t as f64, 20.0);
            buffer.evict();
        }

        let points = buffer.points("T_DS0").unwrap();
        assert!(points.iter().all(|&(t, _)| t >= 35.0));
        assert_eq!(points.front(), Some(&(35.0, 20.0)));
        assert_eq!(points.back(), Some(&(100.0, 20.0)));
    }

    #[test]
    fn test_eviction_is_per_key() {
        let mut buffer = SeriesBuffer::new(10.0);
        buffer.add_point("fast", 0.0, 1.0);
        buffer.add_point("fast", 100.0, 1.0);
        // "slow" stopped reporting early; its own latest drives its cutoff
        buffer.add_point("slow", 0.0, 2.0);
        buffer.evict();

        assert_eq!(buffer.points("fast").unwrap().len(), 1);
        assert_eq!(buffer.points("slow").unwrap().len(), 1);
    }

    #[test]
    fn test_push_sample_appends_all_sensors() {
        let mut buffer = SeriesBuffer::new(60.0);
        let mut values = SensorValues::new();
        values.insert("T_BME".to_string(), 23.0);
        values.insert("T_DS0".to_string(), 22.0);
        buffer.push_sample(&Sample::new(1.0, values));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.latest_time(), Some(1.0));
    }

    #[test]
    fn test_y_range_with_margin() {
        let mut buffer = SeriesBuffer::new(60.0);
        buffer.add_point("a", 0.0, 10.0);
        buffer.add_point("b", 0.0, 30.0);

        let (lo, hi) = buffer.y_range().unwrap();
        assert!((lo - 8.0).abs() < 1e-9);
        assert!((hi - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_y_range_span_floor_for_flat_signal() {
        let mut buffer = SeriesBuffer::new(60.0);
        buffer.add_point("a", 0.0, 25.0);
        buffer.add_point("a", 1.0, 25.0);

        // span floors at 1.0, so the range is 25 +/- 0.1
        let (lo, hi) = buffer.y_range().unwrap();
        assert!((lo - 24.9).abs() < 1e-9);
        assert!((hi - 25.1).abs() < 1e-9);
    }

    #[test]
    fn test_y_range_empty() {
        let buffer = SeriesBuffer::new(60.0);
        assert!(buffer.y_range().is_none());
    }

    #[test]
    fn test_clear() {
        let mut buffer = SeriesBuffer::new(60.0);
        buffer.add_point("a", 0.0, 1.0);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.keys().count(), 0);
    }

    #[test]
    fn test_sensor_labels() {
        assert_eq!(sensor_label("T_BME"), "BME280");
        assert_eq!(sensor_label("T_BME280"), "BME280");
        assert_eq!(sensor_label("T_DS0"), "DS18B20 #1");
        assert_eq!(sensor_label("T_DS5"), "DS18B20 #6");
        assert_eq!(sensor_label("T_DSx"), "T_DSx");
        assert_eq!(sensor_label("V_ADS_R"), "V_ADS_R");
    }
}
