//! Per-move depth selection.
//!
//! Depth is a performance tunable, not a correctness knob: any fixed depth
//! gives a valid (if weaker or slower) solver. The controller deepens as the
//! board fills up and backs off when recent searches blow the time budget.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Number of recent per-move search times the governor averages over.
const LATENCY_WINDOW: usize = 8;

/// Bounds and budget for depth selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DepthProfile {
    /// Smallest depth the controller will pick.
    pub min_depth: u32,
    /// Largest depth the controller will pick.
    pub max_depth: u32,
    /// Fixed depth override. Bypasses banding and the latency governor;
    /// meant for deterministic tests and benchmarks.
    pub fixed_depth: Option<u32>,
    /// Rolling-average search-time budget, in milliseconds.
    pub time_budget_ms: u64,
}

impl Default for DepthProfile {
    fn default() -> Self {
        Self {
            min_depth: 3,
            max_depth: 6,
            fixed_depth: None,
            time_budget_ms: 120,
        }
    }
}

impl DepthProfile {
    /// Reject profiles the controller cannot honor. The search recurses to
    /// depth 0, so every selectable depth must be at least 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_depth == 0 || self.min_depth > self.max_depth {
            return Err(ConfigError::InvalidDepthRange {
                min: self.min_depth,
                max: self.max_depth,
            });
        }
        if self.fixed_depth == Some(0) {
            return Err(ConfigError::InvalidDepthRange { min: 0, max: 0 });
        }
        Ok(())
    }
}

/// Maps the empty-cell count to a depth within the profile's bounds, shrunk
/// by one step while the rolling latency average exceeds the budget.
#[derive(Debug, Clone)]
pub struct DepthController {
    profile: DepthProfile,
    window: VecDeque<u64>,
}

impl DepthController {
    pub fn new(profile: DepthProfile) -> Self {
        Self {
            profile,
            window: VecDeque::with_capacity(LATENCY_WINDOW),
        }
    }

    pub fn profile(&self) -> &DepthProfile {
        &self.profile
    }

    /// Depth for a position with `empty_count` empty cells.
    ///
    /// Open boards search shallow, crowded boards deep: >= 10 empties at
    /// `min_depth`, 6..=9 one deeper, 3..=5 two deeper, and 2 or fewer at
    /// `max_depth`, all clamped into the profile's range.
    pub fn choose(&self, empty_count: u32) -> u32 {
        if let Some(fixed) = self.profile.fixed_depth {
            return fixed;
        }
        let banded = match empty_count {
            10.. => self.profile.min_depth,
            6..=9 => self.profile.min_depth + 1,
            3..=5 => self.profile.min_depth + 2,
            _ => self.profile.max_depth,
        };
        let mut depth = banded.min(self.profile.max_depth);
        if self.over_budget() {
            depth = depth.saturating_sub(1);
        }
        depth.max(self.profile.min_depth)
    }

    /// Record the wall-clock cost of the search just finished.
    pub fn record(&mut self, elapsed_ms: u64) {
        if self.window.len() == LATENCY_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(elapsed_ms);
    }

    fn over_budget(&self) -> bool {
        if self.window.is_empty() {
            return false;
        }
        let sum: u64 = self.window.iter().sum();
        sum as f64 / self.window.len() as f64 > self.profile.time_budget_ms as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_follow_empty_count() {
        let ctl = DepthController::new(DepthProfile::default());
        assert_eq!(ctl.choose(16), 3);
        assert_eq!(ctl.choose(10), 3);
        assert_eq!(ctl.choose(9), 4);
        assert_eq!(ctl.choose(6), 4);
        assert_eq!(ctl.choose(5), 5);
        assert_eq!(ctl.choose(3), 5);
        assert_eq!(ctl.choose(2), 6);
        assert_eq!(ctl.choose(0), 6);
    }

    #[test]
    fn bands_clamp_to_max_depth() {
        let ctl = DepthController::new(DepthProfile {
            min_depth: 3,
            max_depth: 4,
            ..DepthProfile::default()
        });
        assert_eq!(ctl.choose(4), 4);
        assert_eq!(ctl.choose(0), 4);
    }

    #[test]
    fn fixed_depth_overrides_everything() {
        let mut ctl = DepthController::new(DepthProfile {
            fixed_depth: Some(2),
            ..DepthProfile::default()
        });
        for _ in 0..LATENCY_WINDOW {
            ctl.record(10_000);
        }
        assert_eq!(ctl.choose(16), 2);
        assert_eq!(ctl.choose(0), 2);
    }

    #[test]
    fn slow_moves_shrink_depth_but_not_below_min() {
        let mut ctl = DepthController::new(DepthProfile::default());
        for _ in 0..LATENCY_WINDOW {
            ctl.record(500);
        }
        assert_eq!(ctl.choose(4), 4);
        assert_eq!(ctl.choose(16), 3);
    }

    #[test]
    fn window_recovers_after_fast_moves() {
        let mut ctl = DepthController::new(DepthProfile::default());
        for _ in 0..LATENCY_WINDOW {
            ctl.record(500);
        }
        assert_eq!(ctl.choose(4), 4);
        for _ in 0..LATENCY_WINDOW {
            ctl.record(5);
        }
        assert_eq!(ctl.choose(4), 5);
    }

    #[test]
    fn partial_window_counts_too() {
        let mut ctl = DepthController::new(DepthProfile::default());
        ctl.record(1_000);
        assert_eq!(ctl.choose(4), 4);
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let profile = DepthProfile {
            min_depth: 0,
            ..DepthProfile::default()
        };
        assert_eq!(
            profile.validate(),
            Err(ConfigError::InvalidDepthRange { min: 0, max: 6 })
        );

        let profile = DepthProfile {
            min_depth: 5,
            max_depth: 4,
            ..DepthProfile::default()
        };
        assert_eq!(
            profile.validate(),
            Err(ConfigError::InvalidDepthRange { min: 5, max: 4 })
        );

        let profile = DepthProfile {
            fixed_depth: Some(0),
            ..DepthProfile::default()
        };
        assert!(profile.validate().is_err());

        assert!(DepthProfile::default().validate().is_ok());
    }
}
