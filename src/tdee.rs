//! Empirical TDEE (Total Daily Energy Expenditure) from logged intake and weight.
//!
//! Compares smoothed bodyweight at both ends of a 28-day window with the
//! average intake in between. Weight is smoothed with a 10-day EMA
//! (Exponential Moving Average) so single weigh-ins do not swing the result.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::domain::Series;
use crate::energy::CALORIES_PER_KG;

// === Constants ===

/// Main window for TDEE comparison (days).
pub const TDEE_WINDOW_DAYS: i64 = 28;

/// Days in each EMA smoothing window.
pub const EMA_WINDOW_DAYS: i64 = 10;

/// EMA smoothing factor (0.1 = 10% weight on new values).
pub const EMA_ALPHA: f64 = 0.1;

/// Minimum fraction of valid calorie-weight pairs required (14/28 = 50%).
pub const MIN_PAIR_RATIO: f64 = 0.5;

/// Minimum weight measurements required in each EMA window.
pub const MIN_EMA_DATA_POINTS: usize = 3;

// === Data Structures ===

/// TDEE calculation result.
#[derive(Debug, Clone, Serialize)]
pub struct TdeeResult {
    /// Estimated TDEE in kcal.
    pub tdee: f64,
    /// Average intake over the valid pairs.
    pub avg_calories: f64,
    /// Smoothed weight at the start of the window.
    pub ema_start: f64,
    /// Smoothed weight at the end of the window.
    pub ema_end: f64,
    /// `ema_end - ema_start` in kg.
    pub weight_change_kg: f64,
    /// Number of calorie days followed by a weigh-in.
    pub pairs_used: usize,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
}

/// Reason TDEE couldn't be calculated.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "error", content = "details", rename_all = "snake_case")]
pub enum TdeeError {
    #[error("need {required} calorie entries, found {available}")]
    InsufficientCalorieData { available: usize, required: usize },

    #[error("need {required} weights in EMA start window, found {available}")]
    InsufficientWeightDataForEmaStart { available: usize, required: usize },

    #[error("need {required} weights in EMA end window, found {available}")]
    InsufficientWeightDataForEmaEnd { available: usize, required: usize },

    #[error("need {required} calorie-weight pairs, found {available}")]
    InsufficientPairs { available: usize, required: usize },
}

// === Calculation ===

/// Estimates TDEE for the 28 days ending at `today`.
///
/// A calorie entry on day X counts only when a weigh-in exists on day X + 1,
/// since that weigh-in is the first to reflect the intake. At least half of the
/// window must have such pairs.
///
/// ```text
/// TDEE = avg_calories - (weight_change_kg / 28) × 7700
/// ```
pub fn calculate_tdee(
    calories: &Series,
    weights: &Series,
    today: NaiveDate,
) -> Result<TdeeResult, TdeeError> {
    let required_pairs = (TDEE_WINDOW_DAYS as f64 * MIN_PAIR_RATIO).ceil() as usize;

    // Same-day repeats: the last entry wins
    let calorie_map: BTreeMap<NaiveDate, f64> =
        calories.iter().map(|o| (o.date, o.value)).collect();
    let weight_map: BTreeMap<NaiveDate, f64> = weights.iter().map(|o| (o.date, o.value)).collect();

    if calorie_map.len() < required_pairs {
        return Err(TdeeError::InsufficientCalorieData {
            available: calorie_map.len(),
            required: required_pairs,
        });
    }

    let window_start = today - Duration::days(TDEE_WINDOW_DAYS);

    let ema_end = smoothed_weight(&weight_map, today).ok_or_else(|| {
        TdeeError::InsufficientWeightDataForEmaEnd {
            available: count_in_ema_window(&weight_map, today),
            required: MIN_EMA_DATA_POINTS,
        }
    })?;
    let ema_start = smoothed_weight(&weight_map, window_start).ok_or_else(|| {
        TdeeError::InsufficientWeightDataForEmaStart {
            available: count_in_ema_window(&weight_map, window_start),
            required: MIN_EMA_DATA_POINTS,
        }
    })?;

    let paired: Vec<f64> = window_start
        .iter_days()
        .take_while(|d| *d < today)
        .filter(|d| weight_map.contains_key(&(*d + Duration::days(1))))
        .filter_map(|d| calorie_map.get(&d).copied())
        .collect();

    if paired.len() < required_pairs {
        return Err(TdeeError::InsufficientPairs {
            available: paired.len(),
            required: required_pairs,
        });
    }

    let avg_calories = paired.iter().sum::<f64>() / paired.len() as f64;
    let weight_change_kg = ema_end - ema_start;
    let tdee = avg_calories - weight_change_kg / TDEE_WINDOW_DAYS as f64 * CALORIES_PER_KG;

    log::debug!(
        "TDEE {:.0} kcal from {} pairs, weight change {:+.2} kg",
        tdee,
        paired.len(),
        weight_change_kg
    );

    Ok(TdeeResult {
        tdee,
        avg_calories,
        ema_start,
        ema_end,
        weight_change_kg,
        pairs_used: paired.len(),
        window_start,
        window_end: today,
    })
}

fn count_in_ema_window(weights: &BTreeMap<NaiveDate, f64>, target: NaiveDate) -> usize {
    let start = target - Duration::days(EMA_WINDOW_DAYS - 1);
    weights.range(start..=target).count()
}

/// Smoothed weight on `target` over the window `[target - 9, target]`.
///
/// Seeds with the first weigh-in in the window and walks forward day by day;
/// days without a weigh-in carry the average forward.
fn smoothed_weight(weights: &BTreeMap<NaiveDate, f64>, target: NaiveDate) -> Option<f64> {
    let start = target - Duration::days(EMA_WINDOW_DAYS - 1);
    let mut window = weights.range(start..=target);

    if count_in_ema_window(weights, target) < MIN_EMA_DATA_POINTS {
        return None;
    }

    let (_, &seed) = window.next()?;
    Some(window.fold(seed, |ema, (_, &w)| EMA_ALPHA * w + (1.0 - EMA_ALPHA) * ema))
}
