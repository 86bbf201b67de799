//! Body composition estimates from circumference measurements.
//!
//! The US Navy method gives a body fat percentage that can feed the
//! Katch–McArdle branch of the BMR calculation. Dated measurement series can
//! be matched into a body fat series for trend analysis.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::{Observation, Series, Sex};

/// Navy formula coefficients for men.
mod navy_male {
    pub const BASE: f64 = 1.0324;
    pub const CIRCUMFERENCE: f64 = 0.19077;
    pub const HEIGHT: f64 = 0.15456;
}

/// Navy formula coefficients for women.
mod navy_female {
    pub const BASE: f64 = 1.29579;
    pub const CIRCUMFERENCE: f64 = 0.35004;
    pub const HEIGHT: f64 = 0.22100;
}

/// Calculates body fat percentage using the US Navy formula.
///
/// Formula (measurements in cm):
/// ```text
/// men:   BF% = 495 / (1.0324 - 0.19077 × log10(waist - neck) + 0.15456 × log10(height)) - 450
/// women: BF% = 495 / (1.29579 - 0.35004 × log10(waist + hip - neck) + 0.22100 × log10(height)) - 450
/// ```
///
/// Returns None when the circumference difference or the denominator is not
/// positive, or when a woman's hip measurement is missing.
pub fn navy_body_fat_pct(
    sex: Sex,
    height_cm: f64,
    waist_cm: f64,
    neck_cm: f64,
    hip_cm: Option<f64>,
) -> Option<f64> {
    if height_cm <= 0.0 {
        return None;
    }

    let (d, base, circumference, height) = match sex {
        Sex::Male => (
            waist_cm - neck_cm,
            navy_male::BASE,
            navy_male::CIRCUMFERENCE,
            navy_male::HEIGHT,
        ),
        Sex::Female => (
            waist_cm + hip_cm? - neck_cm,
            navy_female::BASE,
            navy_female::CIRCUMFERENCE,
            navy_female::HEIGHT,
        ),
    };
    if d <= 0.0 {
        return None;
    }

    let a = base - circumference * d.log10() + height * height_cm.log10();
    if a <= 0.0 {
        return None;
    }

    Some(495.0 / a - 450.0)
}

/// Calculates Lean Body Mass from bodyweight and body fat percentage.
///
/// Formula:
/// ```text
/// LBM = bodyweight × (1 - BF% / 100)
/// ```
pub fn lean_body_mass(bodyweight_kg: f64, body_fat_pct: f64) -> f64 {
    bodyweight_kg * (1.0 - body_fat_pct / 100.0)
}

/// Builds a body fat series from dated circumference measurements.
///
/// Only dates with a waist and a neck measurement (and a hip measurement for
/// women) produce a point. When a date repeats, the last measurement wins.
pub fn body_fat_series(
    sex: Sex,
    height_cm: f64,
    waist: &Series,
    neck: &Series,
    hip: Option<&Series>,
) -> Series {
    let neck_by_date = by_date(neck);
    let hip_by_date = hip.map(by_date).unwrap_or_default();

    let points = waist
        .iter()
        .filter_map(|w| {
            let neck_cm = *neck_by_date.get(&w.date)?;
            let hip_cm = hip_by_date.get(&w.date).copied();
            navy_body_fat_pct(sex, height_cm, w.value, neck_cm, hip_cm)
                .map(|bf| Observation::new(w.date, bf))
        })
        .collect();

    Series::new(points)
}

fn by_date(series: &Series) -> HashMap<NaiveDate, f64> {
    series.iter().map(|o| (o.date, o.value)).collect()
}
