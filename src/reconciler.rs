//! Calorie/steps target reconciliation.
//!
//! A [`TargetReconciler`] holds one slider session: a committed
//! `(calories, steps)` pair whose energy balance matches the goal's daily
//! energy change. Moving one slider recomputes the other through the
//! maintenance identity
//!
//! ```text
//! calories - (base_maintenance + steps × 0.045) = target_daily_change
//! ```
//!
//! When the recomputed value would leave its range the move is rejected and
//! the opposite control is locked until the pointer is released. The order of
//! operations matters: clamp the input, round it to the slider bucket and
//! re-clamp before deriving the other value. Derived steps are bucket-rounded
//! and clamped before the boundary check. Derived calories are checked against
//! the bounds at whole-kcal precision, then bucket-rounded and clamped.

use serde::Serialize;

use crate::config::{BoundsConfig, ReconcilerConfig};
use crate::domain::{GoalPolicy, Profile};
use crate::energy::{
    CALORIES_PER_KG, CALORIES_PER_STEP, calculate_base_maintenance, calculate_neat, profile_bmr,
    total_maintenance,
};

/// Share of the daily energy change assigned to extra activity when gaining.
pub const GAIN_ACTIVITY_SHARE: f64 = 0.2;

/// Share of the daily energy change assigned to extra activity when losing.
pub const LOSS_ACTIVITY_SHARE: f64 = 0.3;

/// Baseline daily steps for gain goals.
pub const GAIN_BASELINE_STEPS: f64 = 7500.0;

/// Baseline daily steps for every other goal.
pub const DEFAULT_BASELINE_STEPS: f64 = 10_000.0;

/// Inclusive calorie range of the calorie slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalorieBounds {
    pub min: i32,
    pub max: i32,
}

impl CalorieBounds {
    /// Scales base maintenance by a (min, max) multiplier pair.
    pub fn from_multipliers(base_maintenance: f64, (low, high): (f64, f64)) -> Self {
        Self {
            min: (base_maintenance * low).round() as i32,
            max: (base_maintenance * high).round() as i32,
        }
    }

    /// Bounds for a goal policy. Custom targets get the wider range.
    pub fn for_policy(base_maintenance: f64, policy: &GoalPolicy, config: &BoundsConfig) -> Self {
        let multipliers = if policy.is_custom() {
            config.custom
        } else {
            config.standard
        };
        Self::from_multipliers(base_maintenance, multipliers)
    }

    pub fn contains(&self, calories: i32) -> bool {
        calories >= self.min && calories <= self.max
    }

    pub fn clamp(&self, calories: i32) -> i32 {
        clamp_to(calories, self.min, self.max)
    }
}

/// Recommended daily targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub calories: i32,
    pub steps: i32,
}

/// Committed slider values plus transient lock flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetState {
    pub calories: i32,
    pub steps: i32,
    pub calories_locked: bool,
    pub steps_locked: bool,
}

impl TargetState {
    fn from_recommendation(rec: Recommendation) -> Self {
        Self {
            calories: rec.calories,
            steps: rec.steps,
            calories_locked: false,
            steps_locked: false,
        }
    }
}

/// Slider axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Calories,
    Steps,
}

/// Outcome of a slider event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reconciliation {
    /// Both values were updated.
    Committed,
    /// The input resolved to the committed value.
    Unchanged,
    /// The moved control is locked; nothing happened.
    Ignored,
    /// The other value would leave its range; `locked` is now locked.
    Rejected { locked: Axis },
}

/// Derives an initial `(calories, steps)` pair for a daily energy change.
///
/// Part of the change is covered by walking: 20% when gaining, 30% otherwise.
/// Extra steps are added on top of a 10 000 step baseline for loss, and taken
/// off a 7 500 step baseline for gain. Calories then follow from total
/// maintenance at that step count.
///
/// # Arguments
/// * `profile` - User profile
/// * `target_daily_change` - Signed kcal/day (negative for loss)
/// * `is_gain` - Selects the gain split and baseline
/// * `config` - Step range and calorie bound multipliers
pub fn initial_recommendation(
    profile: &Profile,
    target_daily_change: f64,
    is_gain: bool,
    config: &ReconcilerConfig,
) -> Recommendation {
    let (share, baseline) = if is_gain {
        (GAIN_ACTIVITY_SHARE, GAIN_BASELINE_STEPS)
    } else {
        (LOSS_ACTIVITY_SHARE, DEFAULT_BASELINE_STEPS)
    };

    let activity_change = target_daily_change * share;
    let additional_steps = activity_change.abs() / CALORIES_PER_STEP;
    let raw_steps = if is_gain {
        baseline - additional_steps
    } else {
        baseline + additional_steps
    };
    let steps = clamp_to(raw_steps.round() as i32, 0, config.max_steps);

    let base_maintenance = calculate_base_maintenance(profile_bmr(profile));
    let bounds = CalorieBounds::from_multipliers(base_maintenance, config.bounds.standard);
    let maintenance = base_maintenance + calculate_neat(f64::from(steps));
    let calories = bounds.clamp((maintenance + target_daily_change).round() as i32);

    Recommendation { calories, steps }
}

/// One calorie/steps slider session.
#[derive(Debug, Clone)]
pub struct TargetReconciler {
    profile: Profile,
    policy: GoalPolicy,
    config: ReconcilerConfig,
    base_maintenance: f64,
    target_daily_change: f64,
    bounds: CalorieBounds,
    state: TargetState,
}

impl TargetReconciler {
    /// Starts a session from a profile and goal.
    ///
    /// Rate-based goals start from [`initial_recommendation`]. Custom goals
    /// start from their own targets (clamped to range) and adopt the energy
    /// balance those targets imply.
    pub fn new(profile: Profile, policy: GoalPolicy, config: ReconcilerConfig) -> Self {
        let base_maintenance = calculate_base_maintenance(profile_bmr(&profile));
        let bounds = CalorieBounds::for_policy(base_maintenance, &policy, &config.bounds);

        let (recommendation, target_daily_change) = match policy {
            GoalPolicy::Custom { calories, steps } => {
                let rec = Recommendation {
                    calories: bounds.clamp(calories),
                    steps: clamp_to(steps, 0, config.max_steps),
                };
                let change =
                    f64::from(rec.calories) - total_maintenance(&profile, f64::from(rec.steps));
                (rec, change)
            }
            _ => {
                let change = policy.daily_energy_change(&profile);
                (
                    initial_recommendation(&profile, change, policy.is_gain(), &config),
                    change,
                )
            }
        };

        log::info!(
            "Reconciler session: {:?}, change {:.0} kcal/day, start {} kcal / {} steps",
            policy,
            target_daily_change,
            recommendation.calories,
            recommendation.steps
        );

        Self {
            profile,
            policy,
            config,
            base_maintenance,
            target_daily_change,
            bounds,
            state: TargetState::from_recommendation(recommendation),
        }
    }

    pub fn state(&self) -> &TargetState {
        &self.state
    }

    pub fn bounds(&self) -> CalorieBounds {
        self.bounds
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn policy(&self) -> &GoalPolicy {
        &self.policy
    }

    pub fn base_maintenance(&self) -> f64 {
        self.base_maintenance
    }

    pub fn target_daily_change(&self) -> f64 {
        self.target_daily_change
    }

    pub fn max_steps(&self) -> i32 {
        self.config.max_steps
    }

    /// Energy balance of the committed pair (kcal/day).
    pub fn energy_balance(&self) -> f64 {
        f64::from(self.state.calories)
            - total_maintenance(&self.profile, f64::from(self.state.steps))
    }

    /// Expected weight change (kg/week) of the committed pair.
    pub fn weekly_rate_kg(&self) -> f64 {
        self.energy_balance() * 7.0 / CALORIES_PER_KG
    }

    /// Handles a calorie slider move.
    pub fn on_calories_change(&mut self, new_calories: i32) -> Reconciliation {
        if self.state.calories_locked {
            return Reconciliation::Ignored;
        }
        if new_calories == self.state.calories {
            return Reconciliation::Unchanged;
        }

        let clamped = self.bounds.clamp(new_calories);
        let calories = self
            .bounds
            .clamp(round_to_step(f64::from(clamped), self.config.calorie_step));
        if calories == self.state.calories {
            return Reconciliation::Unchanged;
        }

        let required_steps = (f64::from(calories)
            - self.target_daily_change
            - self.base_maintenance)
            / CALORIES_PER_STEP;
        let steps = clamp_to(
            round_to_step(required_steps, self.config.step_step),
            0,
            self.config.max_steps,
        );

        if steps == 0 || steps == self.config.max_steps {
            self.state.steps_locked = true;
            log::debug!(
                "Rejected {} kcal: requires {:.0} steps, locking steps",
                calories,
                required_steps
            );
            return Reconciliation::Rejected { locked: Axis::Steps };
        }

        self.state.calories = calories;
        self.state.steps = steps;
        self.state.steps_locked = false;
        log::debug!("Committed {} kcal / {} steps", calories, steps);
        Reconciliation::Committed
    }

    /// Handles a steps slider move.
    pub fn on_steps_change(&mut self, new_steps: i32) -> Reconciliation {
        if self.state.steps_locked {
            return Reconciliation::Ignored;
        }
        if new_steps == self.state.steps {
            return Reconciliation::Unchanged;
        }

        let max_steps = self.config.max_steps;
        let clamped = clamp_to(new_steps, 0, max_steps);
        let steps = clamp_to(
            round_to_step(f64::from(clamped), self.config.step_step),
            0,
            max_steps,
        );
        if steps == self.state.steps {
            return Reconciliation::Unchanged;
        }

        let required_calories = (self.target_daily_change
            + self.base_maintenance
            + calculate_neat(f64::from(steps)))
        .round() as i32;

        if !self.bounds.contains(required_calories) {
            self.state.calories_locked = true;
            log::debug!(
                "Rejected {} steps: requires {} kcal outside {}..={}, locking calories",
                steps,
                required_calories,
                self.bounds.min,
                self.bounds.max
            );
            return Reconciliation::Rejected {
                locked: Axis::Calories,
            };
        }

        // Bucket rounding can step past a bound that is not a bucket multiple
        let calories = self.bounds.clamp(round_to_step(
            f64::from(required_calories),
            self.config.calorie_step,
        ));

        self.state.calories = calories;
        self.state.steps = steps;
        self.state.calories_locked = false;
        log::debug!("Committed {} kcal / {} steps", calories, steps);
        Reconciliation::Committed
    }

    /// Ends a drag gesture, unlocking both controls.
    pub fn on_pointer_release(&mut self) {
        self.state.calories_locked = false;
        self.state.steps_locked = false;
    }
}

/// Rounds to the nearest multiple of `step`. Non-positive steps round to a whole unit.
fn round_to_step(value: f64, step: i32) -> i32 {
    if step <= 0 {
        return value.round() as i32;
    }
    let step = f64::from(step);
    ((value / step).round() * step) as i32
}

/// Clamps without panicking when `min > max`; `max` wins.
fn clamp_to(value: i32, min: i32, max: i32) -> i32 {
    value.max(min).min(max)
}
