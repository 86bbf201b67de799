//! Trend analytics over dated metric series.
//!
//! Everything here treats a series as one observation per day. Regression
//! runs against observation index, and plateau windows count observations,
//! not calendar days, so irregular logging skews both. Underpowered input
//! yields `None`, NaN fields or [`TrendError::InsufficientData`], never a panic.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::TrendConfig;
use crate::domain::{Metric, Series};
use crate::error::TrendError;

// === Constants ===

/// Short prediction horizon (days past the last observation).
pub const SHORT_HORIZON_DAYS: f64 = 30.0;

/// Long prediction horizon (days past the last observation).
pub const LONG_HORIZON_DAYS: f64 = 90.0;

// === Data Structures ===

/// Ordinary least-squares fit of value against observation index.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LinearTrend {
    /// Change per observation.
    pub slope: f64,
    /// Fitted value at index 0.
    pub intercept: f64,
    /// Coefficient of determination. NaN for a perfectly flat series.
    pub r_squared: f64,
}

impl LinearTrend {
    /// Value of the fitted line at an observation index.
    pub fn predict(&self, index: f64) -> f64 {
        self.intercept + self.slope * index
    }
}

/// Streak lengths in observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streaks {
    /// Streak ending at the last observation.
    pub current: usize,
    pub longest: usize,
}

/// Condition an observation must meet to extend a streak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum StreakGoal {
    AtMost(f64),
    AtLeast(f64),
}

impl StreakGoal {
    pub fn is_met(&self, value: f64) -> bool {
        match *self {
            StreakGoal::AtMost(target) => value <= target,
            StreakGoal::AtLeast(target) => value >= target,
        }
    }
}

/// Weekday (Mon–Fri) versus weekend (Sat/Sun) averages.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WeekdaySplit {
    pub weekday_average: f64,
    pub weekend_average: f64,
    /// `weekend_average - weekday_average`.
    pub difference: f64,
    pub weekday_count: usize,
    pub weekend_count: usize,
}

/// A stretch where the value stayed within the plateau threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Plateau {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration_days: i64,
}

/// Full trend summary for one series.
#[derive(Debug, Clone, Serialize)]
pub struct TrendSummary {
    pub observations: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub latest_value: f64,
    pub average: f64,
    pub trend: Option<LinearTrend>,
    /// Extrapolated value 30 days past the last observation.
    pub predicted_30d: Option<f64>,
    /// Extrapolated value 90 days past the last observation.
    pub predicted_90d: Option<f64>,
    pub weekly_rate: Option<f64>,
    pub monthly_rate: Option<f64>,
    /// Latest trailing moving average.
    pub moving_average: Option<f64>,
    /// Percentage of calendar days in the span that have an observation.
    pub consistency_score: f64,
    pub streaks: Streaks,
    pub weekday_split: WeekdaySplit,
    pub plateaus: Vec<Plateau>,
}

// === Analysis Functions ===

/// Fits a least-squares line through the series values.
///
/// Returns `None` with fewer than two observations, so callers can tell
/// "no trend" apart from a flat one.
pub fn linear_trend(series: &Series) -> Option<LinearTrend> {
    fit_line(&series.values())
}

fn fit_line(values: &[f64]) -> Option<LinearTrend> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = values
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let residual = y - (intercept + slope * i as f64);
            residual * residual
        })
        .sum();

    Some(LinearTrend {
        slope,
        intercept,
        r_squared: 1.0 - ss_res / syy,
    })
}

/// Trailing simple moving average.
///
/// Element `i` is the mean of values `i..i + window`. Returns `None` when the
/// series is shorter than the window or the window is zero.
pub fn moving_average(series: &Series, window: usize) -> Option<Vec<f64>> {
    if window == 0 || series.len() < window {
        return None;
    }

    let values = series.values();
    Some(
        values
            .windows(window)
            .map(|w| w.iter().sum::<f64>() / window as f64)
            .collect(),
    )
}

/// Counts runs of observations on consecutive calendar days that satisfy `predicate`.
///
/// A gap other than exactly one day restarts the run at the current
/// observation; a failed predicate resets it to zero. `current` is the run
/// ending at the last observation, however long ago that was.
pub fn streaks<F>(series: &Series, predicate: F) -> Streaks
where
    F: Fn(f64) -> bool,
{
    let mut current = 0;
    let mut longest = 0;
    let mut previous: Option<NaiveDate> = None;

    for obs in series.iter() {
        let consecutive = previous.is_some_and(|d| (obs.date - d).num_days() == 1);

        current = if !predicate(obs.value) {
            0
        } else if consecutive {
            current + 1
        } else {
            1
        };

        longest = longest.max(current);
        previous = Some(obs.date);
    }

    Streaks { current, longest }
}

/// Splits observations into weekday and weekend groups.
///
/// An empty group yields a NaN average (and difference).
pub fn weekday_weekend_split(series: &Series) -> WeekdaySplit {
    let (mut weekday_sum, mut weekday_count) = (0.0, 0usize);
    let (mut weekend_sum, mut weekend_count) = (0.0, 0usize);

    for obs in series.iter() {
        match obs.date.weekday() {
            Weekday::Sat | Weekday::Sun => {
                weekend_sum += obs.value;
                weekend_count += 1;
            }
            _ => {
                weekday_sum += obs.value;
                weekday_count += 1;
            }
        }
    }

    let weekday_average = weekday_sum / weekday_count as f64;
    let weekend_average = weekend_sum / weekend_count as f64;

    WeekdaySplit {
        weekday_average,
        weekend_average,
        difference: weekend_average - weekday_average,
        weekday_count,
        weekend_count,
    }
}

/// Finds stretches where values stayed flat.
///
/// Observation `i` is flagged when `|v[i] - v[i - window]| < threshold`.
/// Contiguous flags merge into one plateau that starts at the window start of
/// its first flagged observation and ends at its last.
pub fn plateau_periods(series: &Series, window: usize, threshold: f64) -> Vec<Plateau> {
    let obs = series.observations();
    if window == 0 || obs.len() <= window {
        return Vec::new();
    }

    let to_plateau = |first_flagged: usize, last_flagged: usize| {
        let start = obs[first_flagged - window].date;
        let end = obs[last_flagged].date;
        Plateau {
            start,
            end,
            duration_days: (end - start).num_days(),
        }
    };

    let mut plateaus = Vec::new();
    let mut run_start: Option<usize> = None;

    for i in window..obs.len() {
        let flagged = (obs[i].value - obs[i - window].value).abs() < threshold;
        match (flagged, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(first)) => {
                plateaus.push(to_plateau(first, i - 1));
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(first) = run_start {
        plateaus.push(to_plateau(first, obs.len() - 1));
    }

    plateaus
}

/// Percentage of calendar days between the first and last observation that were logged.
pub fn consistency_score(series: &Series) -> f64 {
    let Some((first, last)) = series.date_range() else {
        return 0.0;
    };

    let span_days = (last - first).num_days() + 1;
    let mut dates: Vec<NaiveDate> = series.iter().map(|o| o.date).collect();
    dates.dedup();

    100.0 * dates.len() as f64 / span_days as f64
}

/// Builds a full summary for one series.
///
/// Streaks count days meeting `goal`, or simply logged days without one.
pub fn summarize(
    series: &Series,
    goal: Option<StreakGoal>,
    config: &TrendConfig,
) -> Result<TrendSummary, TrendError> {
    let required = config.min_observations;
    let (first_date, last_date) = match series.date_range() {
        Some(range) if series.len() >= required => range,
        _ => {
            return Err(TrendError::InsufficientData {
                available: series.len(),
                required,
            });
        }
    };

    let values = series.values();
    let n = values.len() as f64;
    let trend = fit_line(&values);
    let last_index = n - 1.0;

    let streaks = match goal {
        Some(goal) => streaks(series, |v| goal.is_met(v)),
        None => streaks(series, |_| true),
    };

    let plateaus = plateau_periods(series, config.plateau_window, config.plateau_threshold);
    if !plateaus.is_empty() {
        log::debug!("Detected {} plateau(s)", plateaus.len());
    }

    Ok(TrendSummary {
        observations: values.len(),
        first_date,
        last_date,
        latest_value: values[values.len() - 1],
        average: values.iter().sum::<f64>() / n,
        predicted_30d: trend.map(|t| t.predict(last_index + SHORT_HORIZON_DAYS)),
        predicted_90d: trend.map(|t| t.predict(last_index + LONG_HORIZON_DAYS)),
        weekly_rate: trend.map(|t| t.slope * 7.0),
        monthly_rate: trend.map(|t| t.slope * 30.0),
        trend,
        moving_average: moving_average(series, config.moving_average_window)
            .and_then(|ma| ma.last().copied()),
        consistency_score: consistency_score(series),
        streaks,
        weekday_split: weekday_weekend_split(series),
        plateaus,
    })
}

/// Summarizes several metric series in parallel.
///
/// Each metric uses its own plateau threshold. Metrics without a series are
/// left out of the result.
pub fn analyze_metrics(
    series: &HashMap<Metric, Series>,
    goals: &HashMap<Metric, StreakGoal>,
    config: &TrendConfig,
) -> HashMap<Metric, Result<TrendSummary, TrendError>> {
    Metric::all()
        .par_iter()
        .filter_map(|&metric| {
            let data = series.get(&metric)?;
            let metric_config = TrendConfig {
                plateau_threshold: config.plateau_threshold_for(metric),
                ..config.clone()
            };
            let summary = summarize(data, goals.get(&metric).copied(), &metric_config);
            if let Err(e) = &summary {
                log::warn!("{}: {}", metric, e);
            }
            Some((metric, summary))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Observation;

    fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// Daily series starting Monday 2024-01-01.
    fn daily(values: &[f64]) -> Series {
        Series::daily(date(2024, 1, 1), values)
    }

    /// Series with observations on the given day offsets from 2024-01-01.
    fn on_days(days: &[i64], value: f64) -> Series {
        Series::new(
            days.iter()
                .map(|&d| Observation::new(date(2024, 1, 1) + chrono::Duration::days(d), value))
                .collect(),
        )
    }

    // === Linear Trend ===

    #[test]
    fn test_linear_trend_exact_line() {
        let values: Vec<f64> = (0..10).map(|i| 2.0 * i as f64 + 1.0).collect();
        let trend = linear_trend(&daily(&values)).unwrap();
        assert!(approx_eq(trend.slope, 2.0, 1e-9));
        assert!(approx_eq(trend.intercept, 1.0, 1e-9));
        assert!(approx_eq(trend.r_squared, 1.0, 1e-9));
        assert!(approx_eq(trend.predict(20.0), 41.0, 1e-9));
    }

    #[test]
    fn test_linear_trend_noisy_fit_quality() {
        let values = [80.0, 80.4, 79.6, 79.9, 79.2, 79.5, 78.8, 79.0];
        let trend = linear_trend(&daily(&values)).unwrap();
        assert!(trend.slope < 0.0);
        assert!(trend.r_squared > 0.0 && trend.r_squared < 1.0);
    }

    #[test]
    fn test_linear_trend_too_short() {
        assert!(linear_trend(&daily(&[80.0])).is_none());
        assert!(linear_trend(&Series::default()).is_none());
    }

    #[test]
    fn test_linear_trend_flat_has_nan_r_squared() {
        let trend = linear_trend(&daily(&[80.0; 10])).unwrap();
        assert_eq!(trend.slope, 0.0);
        assert!(trend.r_squared.is_nan());
    }

    // === Moving Average ===

    #[test]
    fn test_moving_average_lengths() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let ma = moving_average(&daily(&values), 7).unwrap();
        assert_eq!(ma.len(), 4);
        assert!(approx_eq(ma[0], 4.0, 1e-9));
        assert!(approx_eq(ma[3], 7.0, 1e-9));

        assert!(moving_average(&daily(&values[..6]), 7).is_none());
    }

    #[test]
    fn test_moving_average_exact_window_and_zero() {
        let series = daily(&[1.0, 2.0, 3.0]);
        assert_eq!(moving_average(&series, 3), Some(vec![2.0]));
        assert!(moving_average(&series, 0).is_none());
    }

    // === Streaks ===

    #[test]
    fn test_streaks_consecutive() {
        let series = daily(&[79.0, 78.9, 78.8, 78.7, 78.6]);
        let result = streaks(&series, |v| v <= 79.0);
        assert_eq!(result, Streaks { current: 5, longest: 5 });
    }

    #[test]
    fn test_streaks_gap_restarts_current() {
        // Days 0-4 then day 6: the 2-day gap restarts the count
        let series = on_days(&[0, 1, 2, 3, 4, 6], 79.0);
        let result = streaks(&series, |v| v <= 79.0);
        assert_eq!(result, Streaks { current: 1, longest: 5 });
    }

    #[test]
    fn test_streaks_predicate_failure_resets() {
        let series = daily(&[81.0, 79.0, 79.0, 81.0, 79.0]);
        let result = streaks(&series, |v| v <= 80.0);
        assert_eq!(result, Streaks { current: 1, longest: 2 });

        let series = daily(&[79.0, 79.0, 81.0]);
        assert_eq!(streaks(&series, |v| v <= 80.0).current, 0);
    }

    #[test]
    fn test_streaks_same_day_duplicates_restart() {
        let series = on_days(&[0, 1, 1, 2], 79.0);
        let result = streaks(&series, |_| true);
        assert_eq!(result, Streaks { current: 2, longest: 2 });
    }

    #[test]
    fn test_streaks_empty() {
        assert_eq!(streaks(&Series::default(), |_| true), Streaks::default());
    }

    #[test]
    fn test_streak_goal() {
        assert!(StreakGoal::AtMost(80.0).is_met(80.0));
        assert!(!StreakGoal::AtMost(80.0).is_met(80.1));
        assert!(StreakGoal::AtLeast(10_000.0).is_met(12_000.0));
        assert!(!StreakGoal::AtLeast(10_000.0).is_met(9_999.0));
    }

    // === Weekday / Weekend ===

    #[test]
    fn test_weekday_weekend_split() {
        // 2024-01-01 is a Monday
        let series = daily(&[80.0, 80.0, 80.0, 80.0, 80.0, 82.0, 82.0]);
        let split = weekday_weekend_split(&series);
        assert_eq!(split.weekday_count, 5);
        assert_eq!(split.weekend_count, 2);
        assert!(approx_eq(split.weekday_average, 80.0, 1e-9));
        assert!(approx_eq(split.weekend_average, 82.0, 1e-9));
        assert!(approx_eq(split.difference, 2.0, 1e-9));
    }

    #[test]
    fn test_weekday_weekend_split_empty_bucket_is_nan() {
        let split = weekday_weekend_split(&daily(&[80.0, 81.0, 82.0]));
        assert!(approx_eq(split.weekday_average, 81.0, 1e-9));
        assert!(split.weekend_average.is_nan());
        assert!(split.difference.is_nan());
    }

    // === Plateaus ===

    #[test]
    fn test_plateau_flat_series() {
        let values: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 80.05 } else { 79.95 })
            .collect();
        let plateaus = plateau_periods(&daily(&values), 14, 0.2);
        assert_eq!(plateaus.len(), 1);
        assert_eq!(plateaus[0].start, date(2024, 1, 1));
        assert_eq!(plateaus[0].end, date(2024, 1, 30));
        assert_eq!(plateaus[0].duration_days, 29);
    }

    #[test]
    fn test_plateau_after_steady_loss() {
        let mut values: Vec<f64> = (0..20).map(|i| 90.0 - 0.5 * i as f64).collect();
        values.extend(std::iter::repeat_n(80.5, 20));

        let plateaus = plateau_periods(&daily(&values), 14, 0.2);
        assert_eq!(plateaus.len(), 1);
        assert_eq!(plateaus[0].start, date(2024, 1, 20));
        assert_eq!(plateaus[0].end, date(2024, 2, 9));
        assert_eq!(plateaus[0].duration_days, 20);
    }

    #[test]
    fn test_plateau_interrupted() {
        // Flat, one jump, flat again: the jump breaks flags at i and i + 14
        let mut values = vec![80.0; 20];
        values.extend(vec![82.0; 20]);
        let plateaus = plateau_periods(&daily(&values), 14, 0.2);
        assert_eq!(plateaus.len(), 2);
        assert_eq!(plateaus[0].end, date(2024, 1, 20));
        assert_eq!(plateaus[1].start, date(2024, 1, 21));
    }

    #[test]
    fn test_plateau_short_series() {
        assert!(plateau_periods(&daily(&[80.0; 14]), 14, 0.2).is_empty());
        assert!(plateau_periods(&daily(&[80.0; 20]), 0, 0.2).is_empty());
    }

    // === Consistency ===

    #[test]
    fn test_consistency_score() {
        assert!(approx_eq(consistency_score(&daily(&[1.0; 10])), 100.0, 1e-9));

        let sparse = on_days(&[0, 2, 4, 6, 8, 10, 12], 80.0);
        assert!(approx_eq(consistency_score(&sparse), 700.0 / 13.0, 1e-9));

        assert_eq!(consistency_score(&Series::default()), 0.0);
    }

    // === Summary ===

    #[test]
    fn test_summarize_insufficient_data() {
        let result = summarize(&daily(&[80.0; 6]), None, &TrendConfig::default());
        assert_eq!(
            result.unwrap_err(),
            TrendError::InsufficientData {
                available: 6,
                required: 7
            }
        );
    }

    #[test]
    fn test_summarize_weight_loss() {
        let values: Vec<f64> = (0..14).map(|i| 80.0 - 0.1 * i as f64).collect();
        let summary = summarize(
            &daily(&values),
            Some(StreakGoal::AtMost(79.45)),
            &TrendConfig::default(),
        )
        .unwrap();

        assert_eq!(summary.observations, 14);
        assert_eq!(summary.first_date, date(2024, 1, 1));
        assert_eq!(summary.last_date, date(2024, 1, 14));
        assert!(approx_eq(summary.trend.unwrap().slope, -0.1, 1e-9));
        assert!(approx_eq(summary.weekly_rate.unwrap(), -0.7, 1e-9));
        assert!(approx_eq(summary.monthly_rate.unwrap(), -3.0, 1e-9));
        // 80 - 0.1 × (13 + 30)
        assert!(approx_eq(summary.predicted_30d.unwrap(), 75.7, 1e-9));
        assert!(approx_eq(summary.predicted_90d.unwrap(), 69.7, 1e-9));
        assert!(approx_eq(summary.consistency_score, 100.0, 1e-9));
        assert_eq!(summary.streaks, Streaks { current: 8, longest: 8 });
        assert!(summary.moving_average.is_some());
        assert!(summary.plateaus.is_empty());
    }

    #[test]
    fn test_summarize_without_goal_counts_logged_days() {
        let summary = summarize(&daily(&[80.0; 10]), None, &TrendConfig::default()).unwrap();
        assert_eq!(summary.streaks, Streaks { current: 10, longest: 10 });
        assert!(summary.trend.unwrap().r_squared.is_nan());
    }

    #[test]
    fn test_analyze_metrics() {
        let mut series = HashMap::new();
        series.insert(Metric::Weight, daily(&[80.0; 14]));
        series.insert(Metric::Steps, daily(&[9000.0, 11000.0, 10000.0]));

        let mut goals = HashMap::new();
        goals.insert(Metric::Steps, StreakGoal::AtLeast(10_000.0));

        let results = analyze_metrics(&series, &goals, &TrendConfig::default());
        assert_eq!(results.len(), 2);
        assert!(results[&Metric::Weight].is_ok());
        assert!(matches!(
            results[&Metric::Steps],
            Err(TrendError::InsufficientData { available: 3, .. })
        ));
        assert!(!results.contains_key(&Metric::Calories));
    }

    #[test]
    fn test_analyze_metrics_uses_metric_threshold() {
        // Intake drifts 3 kcal/day: 42 kcal over the window is a plateau at the
        // 50 kcal calorie threshold, but not at the 0.2 weight threshold
        let values: Vec<f64> = (0..20).map(|i| 2000.0 + 3.0 * i as f64).collect();
        let mut series = HashMap::new();
        series.insert(Metric::Calories, daily(&values));
        series.insert(Metric::Weight, daily(&values));

        let results = analyze_metrics(&series, &HashMap::new(), &TrendConfig::default());
        let calories = results[&Metric::Calories].as_ref().unwrap();
        assert_eq!(calories.plateaus.len(), 1);
        let weight = results[&Metric::Weight].as_ref().unwrap();
        assert!(weight.plateaus.is_empty());
    }

    #[test]
    fn test_analyze_metrics_honors_configured_calorie_threshold() {
        let values: Vec<f64> = (0..20).map(|i| 2000.0 + 3.0 * i as f64).collect();
        let mut series = HashMap::new();
        series.insert(Metric::Calories, daily(&values));

        // 42 kcal drift over the window exceeds a 30 kcal threshold
        let config = TrendConfig {
            calorie_plateau_threshold: 30.0,
            ..TrendConfig::default()
        };
        let results = analyze_metrics(&series, &HashMap::new(), &config);
        assert!(results[&Metric::Calories].as_ref().unwrap().plateaus.is_empty());
    }
}
