//! ARR milestone detection.

/// Milestone granularity in dollars
pub const MILESTONE_STEP: f64 = 10_000.0;

/// Raises a milestone when the total crosses a multiple of the step
///
/// The first observation only records the baseline.
#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    step: f64,
    previous: Option<u64>,
}

impl Default for MilestoneTracker {
    fn default() -> Self {
        Self::new(MILESTONE_STEP)
    }
}

impl MilestoneTracker {
    pub fn new(step: f64) -> Self {
        Self {
            step: if step > 0.0 { step } else { MILESTONE_STEP },
            previous: None,
        }
    }

    /// Feed the latest total; returns the milestone index when one was crossed
    pub fn observe(&mut self, total: f64) -> Option<u64> {
        if !total.is_finite() {
            return None;
        }
        let current = (total.max(0.0) / self.step).floor() as u64;
        let crossed = match self.previous {
            Some(previous) if current > previous => Some(current),
            _ => None,
        };
        self.previous = Some(current);
        crossed
    }
}
