//! Time-axis tick planning
//!
//! Picks a human-friendly tick step for a window span from a fixed ladder
//! and generates tick positions with labels. The right edge of the window
//! is always labeled, even when it falls between regular steps - a live
//! plot without its end time marked reads badly.

/// Candidate tick steps in seconds, smallest first
const STEP_LADDER: [f64; 11] = [0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// Maximum number of step intervals across the span (caps tick count at 9)
const MAX_INTERVALS: f64 = 8.0;

/// Tolerance for "the last generated tick already sits on the edge"
const EDGE_EPSILON: f64 = 1e-3;

/// One generated axis tick
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Position on the time axis, in seconds
    pub value: f64,
    /// Formatted label
    pub label: String,
}

/// Generates tick positions and labels for a `[0, max_time]` span
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisTickPlanner;

impl AxisTickPlanner {
    /// Create a planner
    pub fn new() -> Self {
        Self
    }

    /// Select the tick step for a span: the smallest ladder entry that
    /// divides the span into at most 8 intervals, falling back to the span
    /// itself when even 600 s is too fine.
    pub fn step_for(&self, max_time: f64) -> f64 {
        for candidate in STEP_LADDER {
            if max_time / candidate <= MAX_INTERVALS {
                return candidate;
            }
        }
        max_time
    }

    /// Tick positions for a `[0, max_time]` span
    ///
    /// Regular ticks run `0, step, 2*step, ..` up to `max_time * 1.1`; the
    /// exact edge is appended when the last regular tick misses it by more
    /// than 1 ms. A non-positive span produces no ticks.
    pub fn tick_values(&self, max_time: f64) -> Vec<f64> {
        if max_time <= 0.0 {
            return Vec::new();
        }

        let step = self.step_for(max_time);
        let mut ticks = Vec::new();
        let mut x = 0.0;
        while x <= max_time * 1.1 {
            ticks.push(x);
            x += step;
        }

        if ticks
            .last()
            .is_some_and(|&last| (last - max_time).abs() > EDGE_EPSILON)
        {
            ticks.push(max_time);
        }

        ticks
    }

    /// Format one tick value: integers without decimals, everything else
    /// with one decimal place
    pub fn label(&self, value: f64) -> String {
        if (value - value.round()).abs() < 1e-6 {
            format!("{}", value.round() as i64)
        } else {
            format!("{:.1}", value)
        }
    }

    /// Positions and labels in one pass
    pub fn ticks(&self, max_time: f64) -> Vec<Tick> {
        self.tick_values(max_time)
            .into_iter()
            .map(|value| Tick {
                value,
                label: self.label(value),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_selection() {
        let planner = AxisTickPlanner::new();
        // 47/5 = 9.4 > 8, 47/10 = 4.7 <= 8
        assert_eq!(planner.step_for(47.0), 10.0);
        assert_eq!(planner.step_for(4.0), 0.5);
        assert_eq!(planner.step_for(10.0), 2.0);
        assert_eq!(planner.step_for(60.0), 10.0);
        assert_eq!(planner.step_for(600.0), 120.0);
    }

    #[test]
    fn test_step_fallback_beyond_ladder() {
        let planner = AxisTickPlanner::new();
        // 10000/600 > 8, so the span itself becomes the step
        assert_eq!(planner.step_for(10_000.0), 10_000.0);
        assert_eq!(planner.tick_values(10_000.0), vec![0.0, 10_000.0]);
    }

    #[test]
    fn test_edge_tick_appended() {
        let planner = AxisTickPlanner::new();
        let ticks = planner.tick_values(47.0);
        assert_eq!(ticks, vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 47.0]);
    }

    #[test]
    fn test_no_duplicate_edge_when_step_divides_span() {
        let planner = AxisTickPlanner::new();
        // step 2 over [0,10]: 10*1.1 = 11, so 10 is the last regular tick
        let ticks = planner.tick_values(10.0);
        assert_eq!(ticks, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_zero_span_produces_no_ticks() {
        let planner = AxisTickPlanner::new();
        assert!(planner.tick_values(0.0).is_empty());
        assert!(planner.tick_values(-1.0).is_empty());
    }

    #[test]
    fn test_tick_count_capped() {
        let planner = AxisTickPlanner::new();
        for span in [1.0, 7.5, 47.0, 61.0, 240.0, 599.0, 4800.0] {
            let count = planner.tick_values(span).len();
            assert!(count <= 11, "span {} produced {} ticks", span, count);
        }
    }

    #[test]
    fn test_labels() {
        let planner = AxisTickPlanner::new();
        assert_eq!(planner.label(10.0), "10");
        assert_eq!(planner.label(0.0), "0");
        assert_eq!(planner.label(0.5), "0.5");
        assert_eq!(planner.label(47.25), "47.2");
    }

    #[test]
    fn test_ticks_with_labels() {
        let planner = AxisTickPlanner::new();
        let ticks = planner.ticks(1.0);
        assert_eq!(ticks[0].label, "0");
        assert_eq!(ticks[1].label, "0.5");
        assert_eq!(ticks[2].label, "1");
    }
}
