//! Macronutrient split for a daily calorie target.

use serde::Serialize;

use crate::domain::GoalPolicy;

/// Energy density of protein and carbohydrate (kcal/g).
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;

/// Energy density of fat (kcal/g).
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Share of calories assigned to fat.
pub const FAT_SHARE: f64 = 0.25;

/// Daily macronutrient targets in grams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacroSplit {
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
}

impl MacroSplit {
    /// Calories implied by the gram targets.
    pub fn calories(&self) -> f64 {
        self.protein_g * KCAL_PER_G_PROTEIN
            + self.fat_g * KCAL_PER_G_FAT
            + self.carbs_g * KCAL_PER_G_CARBS
    }
}

/// Protein target per kg of bodyweight for a goal.
///
/// Higher during a deficit to protect lean mass.
pub fn protein_per_kg(policy: &GoalPolicy) -> f64 {
    match policy {
        GoalPolicy::Deficit { .. } => 2.0,
        GoalPolicy::Surplus { .. } => 1.8,
        GoalPolicy::Maintenance | GoalPolicy::Custom { .. } => 1.6,
    }
}

/// Splits a calorie target into protein, fat and carbohydrate grams.
///
/// Protein comes from bodyweight, fat from a fixed 25% share, and carbs take
/// whatever is left (never below zero). Grams are rounded to whole numbers.
pub fn plan_macros(calories: f64, weight_kg: f64, policy: &GoalPolicy) -> MacroSplit {
    let protein_g = (weight_kg * protein_per_kg(policy)).round();
    let fat_g = (calories * FAT_SHARE / KCAL_PER_G_FAT).round();
    let remaining = calories - protein_g * KCAL_PER_G_PROTEIN - fat_g * KCAL_PER_G_FAT;
    let carbs_g = (remaining / KCAL_PER_G_CARBS).round().max(0.0);

    MacroSplit {
        protein_g,
        fat_g,
        carbs_g,
    }
}
