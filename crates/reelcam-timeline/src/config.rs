//! Budget configuration for a timeline.

use reelcam_core::{defaults, RationalTime};
use serde::{Deserialize, Serialize};

use crate::error::{TimelineError, TimelineResult};

/// Duration limits applied to a [`crate::SegmentTimeline`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Hard cap on cumulative recorded duration, in seconds.
    pub total_budget_secs: f64,
    /// Cumulative duration needed before export, in seconds.
    pub minimum_required_secs: f64,
}

impl TimelineConfig {
    /// Create a configuration with explicit limits.
    pub fn new(total_budget_secs: f64, minimum_required_secs: f64) -> Self {
        Self {
            total_budget_secs,
            minimum_required_secs,
        }
    }

    /// Check that `0 < minimum <= total` and both are finite.
    pub fn validate(&self) -> TimelineResult<()> {
        let total = self.total_budget_secs;
        let minimum = self.minimum_required_secs;
        if !total.is_finite() || !minimum.is_finite() {
            return Err(TimelineError::InvalidConfig(
                "limits must be finite".into(),
            ));
        }
        if total <= 0.0 {
            return Err(TimelineError::InvalidConfig(format!(
                "total budget must be positive, got {total}"
            )));
        }
        if minimum <= 0.0 || minimum > total {
            return Err(TimelineError::InvalidConfig(format!(
                "minimum {minimum} must be within (0, {total}]"
            )));
        }
        Ok(())
    }

    pub fn total_budget(&self) -> RationalTime {
        RationalTime::from_seconds_f64(self.total_budget_secs)
    }

    pub fn minimum_required(&self) -> RationalTime {
        RationalTime::from_seconds_f64(self.minimum_required_secs)
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self::new(defaults::TOTAL_BUDGET_SECS, defaults::MINIMUM_REQUIRED_SECS)
    }
}
