//! Domain types: user profile, goal policy and dated observation series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::energy::{CALORIES_PER_KG, total_maintenance};
use crate::error::ParseError;

/// Minimum supported age in years.
pub const MIN_AGE: u32 = 13;

/// Biological sex, used to select BMR and body-fat formula constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl FromStr for Sex {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            _ => Err(ParseError::UnknownSex(s.to_string())),
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sex::Male => write!(f, "male"),
            Sex::Female => write!(f, "female"),
        }
    }
}

/// Anthropometric profile of a user.
///
/// Construction does not validate; out-of-range values flow through the
/// energy formulas as-is. Call [`Profile::validate`] where input comes from
/// an untrusted source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub sex: Sex,
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub body_fat_pct: Option<f64>,
}

impl Profile {
    /// Creates a new profile.
    pub fn new(
        sex: Sex,
        age: u32,
        height_cm: f64,
        weight_kg: f64,
        body_fat_pct: Option<f64>,
    ) -> Self {
        Self {
            sex,
            age,
            height_cm,
            weight_kg,
            body_fat_pct,
        }
    }

    /// Checks the profile against physiological ranges.
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.age < MIN_AGE {
            return Err(ParseError::AgeTooLow {
                value: self.age,
                min: MIN_AGE,
            });
        }
        if !(self.weight_kg > 0.0) {
            return Err(ParseError::NonPositive {
                field: "weight",
                value: self.weight_kg,
            });
        }
        if !(self.height_cm > 0.0) {
            return Err(ParseError::NonPositive {
                field: "height",
                value: self.height_cm,
            });
        }
        if let Some(bf) = self.body_fat_pct
            && !(bf > 0.0 && bf < 100.0)
        {
            return Err(ParseError::BodyFatOutOfRange(bf));
        }
        Ok(())
    }
}

/// What the user wants their weight to do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GoalPolicy {
    /// Lose weight at the given rate (kg/week).
    Deficit { weekly_rate_kg: f64 },
    /// Gain weight at the given rate (kg/week).
    Surplus { weekly_rate_kg: f64 },
    Maintenance,
    /// Explicit daily calorie and step targets.
    Custom { calories: i32, steps: i32 },
}

impl GoalPolicy {
    /// Returns true for weight-gain goals.
    pub fn is_gain(&self) -> bool {
        matches!(self, GoalPolicy::Surplus { .. })
    }

    /// Returns true for custom targets.
    pub fn is_custom(&self) -> bool {
        matches!(self, GoalPolicy::Custom { .. })
    }

    /// Signed daily energy change (kcal/day) this goal asks for.
    ///
    /// Rate-based goals convert kg/week through [`CALORIES_PER_KG`]. Custom
    /// goals imply whatever balance their calories leave over the profile's
    /// maintenance at their step count.
    pub fn daily_energy_change(&self, profile: &Profile) -> f64 {
        match *self {
            GoalPolicy::Deficit { weekly_rate_kg } => -weekly_rate_kg * CALORIES_PER_KG / 7.0,
            GoalPolicy::Surplus { weekly_rate_kg } => weekly_rate_kg * CALORIES_PER_KG / 7.0,
            GoalPolicy::Maintenance => 0.0,
            GoalPolicy::Custom { calories, steps } => {
                f64::from(calories) - total_maintenance(profile, f64::from(steps))
            }
        }
    }

    /// Maps the stored profile fields (`primaryGoal`, `weeklyWeightGoal`)
    /// onto a goal policy.
    ///
    /// The weekly rate is ignored for maintenance goals.
    pub fn from_legacy(primary_goal: &str, weekly_weight_goal: &str) -> Result<Self, ParseError> {
        let goal = primary_goal.trim().to_lowercase();
        match goal.as_str() {
            "maintain" | "maintenance" => return Ok(GoalPolicy::Maintenance),
            "lose" | "loss" | "weight_loss" | "gain" | "muscle_gain" => {}
            _ => return Err(ParseError::UnknownGoal(primary_goal.to_string())),
        }

        let weekly_rate_kg = weekly_weight_goal
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| ParseError::InvalidRate(weekly_weight_goal.to_string()))?;

        if matches!(goal.as_str(), "gain" | "muscle_gain") {
            Ok(GoalPolicy::Surplus { weekly_rate_kg })
        } else {
            Ok(GoalPolicy::Deficit { weekly_rate_kg })
        }
    }
}

/// Daily metrics tracked by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Weight,
    Calories,
    Steps,
}

impl Metric {
    /// Returns all metric variants.
    pub fn all() -> &'static [Metric] {
        &[Metric::Weight, Metric::Calories, Metric::Steps]
    }

    /// Returns the display name for the metric.
    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::Weight => "Weight",
            Metric::Calories => "Calories",
            Metric::Steps => "Steps",
        }
    }

    /// Unit suffix for reports.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Weight => "kg",
            Metric::Calories => "kcal",
            Metric::Steps => "steps",
        }
    }
}

impl FromStr for Metric {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weight" | "bodyweight" => Ok(Metric::Weight),
            "calorie" | "calories" => Ok(Metric::Calories),
            "step" | "steps" => Ok(Metric::Steps),
            _ => Err(ParseError::UnknownMetric(s.to_string())),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One value of one metric on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Date-ordered sequence of observations.
///
/// Several observations on the same date are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    observations: Vec<Observation>,
}

impl Series {
    /// Creates a series, sorting observations by date.
    ///
    /// The sort is stable, so same-day entries keep their input order.
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.date);
        Self { observations }
    }

    /// Creates a series of consecutive daily values starting at `start`.
    ///
    /// Non-finite values mark missing days and are skipped.
    pub fn daily(start: NaiveDate, values: &[f64]) -> Self {
        let observations = start
            .iter_days()
            .zip(values.iter())
            .filter(|(_, value)| value.is_finite())
            .map(|(date, &value)| Observation::new(date, value))
            .collect();
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    /// Returns the values in date order.
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    /// Returns the first and last dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.observations.first()?;
        let last = self.observations.last()?;
        Some((first.date, last.date))
    }
}

impl From<Vec<Observation>> for Series {
    fn from(observations: Vec<Observation>) -> Self {
        Self::new(observations)
    }
}
