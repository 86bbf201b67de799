//! Tunable parameters for target reconciliation and trend analysis.
//!
//! Defaults reproduce the behavior of the slider UI and the analytics
//! dashboard; the CLI overrides individual fields from flags or environment.

use crate::domain::Metric;

/// Calorie bound multipliers applied to base maintenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsConfig {
    /// (min, max) multipliers for deficit, surplus and maintenance goals.
    pub standard: (f64, f64),
    /// (min, max) multipliers for fully custom targets.
    pub custom: (f64, f64),
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            standard: (0.5, 1.5),
            custom: (0.25, 2.0),
        }
    }
}

/// Configuration for the calorie/steps reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilerConfig {
    /// Upper bound of the steps slider.
    pub max_steps: i32,
    /// Calorie slider granularity (kcal).
    pub calorie_step: i32,
    /// Steps slider granularity.
    pub step_step: i32,
    pub bounds: BoundsConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_steps: 30_000,
            calorie_step: 50,
            step_step: 100,
            bounds: BoundsConfig::default(),
        }
    }
}

/// Configuration for trend analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendConfig {
    /// Minimum observations required for a summary.
    pub min_observations: usize,
    /// Trailing window used for the summary's moving average.
    pub moving_average_window: usize,
    /// Plateau comparison distance in observations.
    pub plateau_window: usize,
    /// Plateau threshold for weight series (kg).
    pub plateau_threshold: f64,
    /// Plateau threshold for calorie series (kcal).
    pub calorie_plateau_threshold: f64,
    /// Plateau threshold for step series.
    pub step_plateau_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_observations: 7,
            moving_average_window: 7,
            plateau_window: 14,
            plateau_threshold: 0.2,
            calorie_plateau_threshold: 50.0,
            step_plateau_threshold: 500.0,
        }
    }
}

impl TrendConfig {
    /// Returns the plateau threshold for a given metric.
    ///
    /// Each metric has its own threshold in its own unit.
    pub fn plateau_threshold_for(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Weight => self.plateau_threshold,
            Metric::Calories => self.calorie_plateau_threshold,
            Metric::Steps => self.step_plateau_threshold,
        }
    }
}

/// All planner settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannerConfig {
    pub reconciler: ReconcilerConfig,
    pub trend: TrendConfig,
}
