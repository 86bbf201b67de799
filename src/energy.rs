//! Energy expenditure formulas: BMR, base maintenance, NEAT and total maintenance.
//!
//! None of these functions validate their inputs. Negative or non-finite
//! values propagate through the arithmetic (as NaN or nonsense figures) and
//! must be rejected upstream, e.g. with [`Profile::validate`].

use serde::Serialize;

use crate::domain::{Profile, Sex};

/// Energy burned per step (kcal).
pub const CALORIES_PER_STEP: f64 = 0.045;

/// Energy density of body mass change (kcal per kg).
pub const CALORIES_PER_KG: f64 = 7700.0;

/// Multiplier adding the thermic effect of food on top of BMR.
pub const BASE_MAINTENANCE_MULTIPLIER: f64 = 1.1;

/// Katch–McArdle coefficients.
mod katch_mcardle {
    pub const INTERCEPT: f64 = 370.0;
    pub const LEAN_MASS_FACTOR: f64 = 21.6;
}

/// Mifflin–St Jeor coefficients.
mod mifflin_st_jeor {
    pub const WEIGHT: f64 = 10.0;
    pub const HEIGHT: f64 = 6.25;
    pub const AGE: f64 = 5.0;
    pub const MALE_OFFSET: f64 = 5.0;
    pub const FEMALE_OFFSET: f64 = -161.0;
}

/// Which BMR equation produced a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BmrFormula {
    MifflinStJeor,
    KatchMcArdle,
}

/// Returns the formula [`calculate_bmr`] uses for the given body fat input.
///
/// Katch–McArdle applies only to a finite percentage strictly inside (0, 100).
pub fn bmr_formula(body_fat_pct: Option<f64>) -> BmrFormula {
    match body_fat_pct {
        Some(bf) if bf.is_finite() && bf > 0.0 && bf < 100.0 => BmrFormula::KatchMcArdle,
        _ => BmrFormula::MifflinStJeor,
    }
}

/// Calculates basal metabolic rate (kcal/day).
///
/// With a usable body fat percentage:
/// ```text
/// BMR = 370 + 21.6 × weight × (1 - BF% / 100)
/// ```
/// Otherwise:
/// ```text
/// BMR = 10 × weight + 6.25 × height - 5 × age + (5 male | -161 female)
/// ```
///
/// # Arguments
/// * `weight_kg` - Current bodyweight in kilograms
/// * `height_cm` - Height in centimetres
/// * `age` - Age in years
/// * `sex` - Selects the Mifflin–St Jeor offset
/// * `body_fat_pct` - Optional body fat percentage
pub fn calculate_bmr(
    weight_kg: f64,
    height_cm: f64,
    age: u32,
    sex: Sex,
    body_fat_pct: Option<f64>,
) -> f64 {
    match (bmr_formula(body_fat_pct), body_fat_pct) {
        (BmrFormula::KatchMcArdle, Some(bf)) => {
            let lean_mass = weight_kg * (1.0 - bf / 100.0);
            katch_mcardle::INTERCEPT + katch_mcardle::LEAN_MASS_FACTOR * lean_mass
        }
        _ => {
            let base = mifflin_st_jeor::WEIGHT * weight_kg + mifflin_st_jeor::HEIGHT * height_cm
                - mifflin_st_jeor::AGE * f64::from(age);
            match sex {
                Sex::Male => base + mifflin_st_jeor::MALE_OFFSET,
                Sex::Female => base + mifflin_st_jeor::FEMALE_OFFSET,
            }
        }
    }
}

/// Calculates BMR for a profile.
pub fn profile_bmr(profile: &Profile) -> f64 {
    calculate_bmr(
        profile.weight_kg,
        profile.height_cm,
        profile.age,
        profile.sex,
        profile.body_fat_pct,
    )
}

/// Base maintenance: BMR plus the thermic effect of food, rounded to whole kcal.
pub fn calculate_base_maintenance(bmr: f64) -> f64 {
    (bmr * BASE_MAINTENANCE_MULTIPLIER).round()
}

/// Non-exercise activity thermogenesis from a daily step count, rounded to whole kcal.
///
/// Negative steps are not clamped.
pub fn calculate_neat(steps: f64) -> f64 {
    (steps * CALORIES_PER_STEP).round()
}

/// Total maintenance calories for a profile walking `steps` per day.
pub fn total_maintenance(profile: &Profile, steps: f64) -> f64 {
    calculate_base_maintenance(profile_bmr(profile)) + calculate_neat(steps)
}

/// Full maintenance breakdown for a profile and step count.
#[derive(Debug, Clone, Serialize)]
pub struct EnergyBreakdown {
    pub formula: BmrFormula,
    pub bmr: f64,
    pub base_maintenance: f64,
    pub steps: f64,
    pub neat: f64,
    pub total_maintenance: f64,
}

impl EnergyBreakdown {
    pub fn new(profile: &Profile, steps: f64) -> Self {
        let bmr = profile_bmr(profile);
        let base_maintenance = calculate_base_maintenance(bmr);
        let neat = calculate_neat(steps);

        Self {
            formula: bmr_formula(profile.body_fat_pct),
            bmr,
            base_maintenance,
            steps,
            neat,
            total_maintenance: base_maintenance + neat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    fn reference_profile() -> Profile {
        Profile::new(Sex::Male, 30, 180.0, 80.0, None)
    }

    #[test]
    fn test_bmr_mifflin_male() {
        // 10×80 + 6.25×180 − 5×30 + 5 = 800 + 1125 − 150 + 5
        assert_eq!(calculate_bmr(80.0, 180.0, 30, Sex::Male, None), 1780.0);
    }

    #[test]
    fn test_bmr_mifflin_female() {
        // 10×60 + 6.25×165 − 5×25 − 161 = 600 + 1031.25 − 125 − 161
        assert_eq!(calculate_bmr(60.0, 165.0, 25, Sex::Female, None), 1345.25);
    }

    #[test]
    fn test_bmr_katch_mcardle() {
        // Lean mass 80 × 0.8 = 64 → 370 + 21.6 × 64 = 1752.4
        let bmr = calculate_bmr(80.0, 180.0, 30, Sex::Male, Some(20.0));
        assert!(approx_eq(bmr, 1752.4, 1e-9));

        // Sex, height and age do not matter for Katch–McArdle
        let other = calculate_bmr(80.0, 150.0, 70, Sex::Female, Some(20.0));
        assert!(approx_eq(bmr, other, 1e-9));
    }

    #[test]
    fn test_bmr_invalid_body_fat_falls_back() {
        let mifflin = calculate_bmr(80.0, 180.0, 30, Sex::Male, None);
        assert_eq!(calculate_bmr(80.0, 180.0, 30, Sex::Male, Some(0.0)), mifflin);
        assert_eq!(calculate_bmr(80.0, 180.0, 30, Sex::Male, Some(100.0)), mifflin);
        assert_eq!(calculate_bmr(80.0, 180.0, 30, Sex::Male, Some(f64::NAN)), mifflin);
        assert_eq!(
            calculate_bmr(80.0, 180.0, 30, Sex::Male, Some(f64::INFINITY)),
            mifflin
        );
    }

    #[test]
    fn test_bmr_branch_switch_is_discontinuous() {
        let without = calculate_bmr(80.0, 180.0, 30, Sex::Male, None);
        let barely = calculate_bmr(80.0, 180.0, 30, Sex::Male, Some(0.001));
        // Katch–McArdle at ~0% fat: 370 + 21.6 × 80 ≈ 2098, far from 1780
        assert!((barely - without).abs() > 100.0);
    }

    #[test]
    fn test_bmr_propagates_nan() {
        assert!(calculate_bmr(f64::NAN, 180.0, 30, Sex::Male, None).is_nan());
        assert!(calculate_base_maintenance(f64::NAN).is_nan());
    }

    #[test]
    fn test_base_maintenance() {
        assert_eq!(calculate_base_maintenance(1780.0), 1958.0);
    }

    #[test]
    fn test_neat() {
        assert_eq!(calculate_neat(0.0), 0.0);
        assert_eq!(calculate_neat(8000.0), 360.0);
        assert_eq!(calculate_neat(10.0), 0.0);
        assert_eq!(calculate_neat(12.0), 1.0);
        // Negative steps are passed through
        assert_eq!(calculate_neat(-1000.0), -45.0);
    }

    #[test]
    fn test_neat_monotonic() {
        let mut previous = calculate_neat(0.0);
        for steps in (0..40_000).step_by(37) {
            let neat = calculate_neat(steps as f64);
            assert!(neat >= previous, "NEAT decreased at {} steps", steps);
            previous = neat;
        }
    }

    #[test]
    fn test_total_maintenance_reference_profile() {
        assert_eq!(total_maintenance(&reference_profile(), 8000.0), 2318.0);
    }

    #[test]
    fn test_energy_breakdown() {
        let breakdown = EnergyBreakdown::new(&reference_profile(), 8000.0);
        assert_eq!(breakdown.formula, BmrFormula::MifflinStJeor);
        assert_eq!(breakdown.bmr, 1780.0);
        assert_eq!(breakdown.base_maintenance, 1958.0);
        assert_eq!(breakdown.neat, 360.0);
        assert_eq!(breakdown.total_maintenance, 2318.0);

        let lean = Profile {
            body_fat_pct: Some(15.0),
            ..reference_profile()
        };
        assert_eq!(
            EnergyBreakdown::new(&lean, 0.0).formula,
            BmrFormula::KatchMcArdle
        );
    }
}
