use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use weightplan::body_composition::{lean_body_mass, navy_body_fat_pct};
use weightplan::config::{PlannerConfig, ReconcilerConfig, TrendConfig};
use weightplan::domain::{GoalPolicy, Metric, Profile, Series, Sex};
use weightplan::energy::EnergyBreakdown;
use weightplan::macros::{MacroSplit, plan_macros};
use weightplan::reconciler::{Axis, CalorieBounds, Reconciliation, TargetReconciler, TargetState};
use weightplan::tdee::{TdeeResult, calculate_tdee};
use weightplan::trend::{StreakGoal, TrendSummary, summarize};

/// Daily calorie and step planner with trend analytics.
#[derive(Parser, Debug)]
#[command(name = "weightplan")]
#[command(about = "Plan daily calorie and step targets for a weight goal")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    tuning: Tuning,

    /// Print JSON instead of a text report.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Planner settings. Each can also be set through its environment variable.
#[derive(Args, Debug)]
struct Tuning {
    /// Upper bound of the steps slider.
    #[arg(long, global = true, env = "WEIGHTPLAN_MAX_STEPS", default_value_t = 30_000)]
    max_steps: i32,

    /// Calorie slider granularity (kcal).
    #[arg(long, global = true, env = "WEIGHTPLAN_CALORIE_STEP", default_value_t = 50)]
    calorie_step: i32,

    /// Steps slider granularity.
    #[arg(long, global = true, env = "WEIGHTPLAN_STEP_STEP", default_value_t = 100)]
    step_step: i32,

    /// Plateau comparison distance in observations.
    #[arg(long, global = true, env = "WEIGHTPLAN_PLATEAU_WINDOW", default_value_t = 14)]
    plateau_window: usize,

    /// Plateau threshold for weight (kg).
    #[arg(long, global = true, env = "WEIGHTPLAN_PLATEAU_THRESHOLD", default_value_t = 0.2)]
    plateau_threshold: f64,
}

impl Tuning {
    fn planner_config(&self) -> Result<PlannerConfig> {
        if self.max_steps <= 0 {
            bail!("--max-steps must be positive, got {}", self.max_steps);
        }
        if self.calorie_step <= 0 || self.step_step <= 0 {
            bail!(
                "Slider granularity must be positive, got {} kcal / {} steps",
                self.calorie_step,
                self.step_step
            );
        }

        Ok(PlannerConfig {
            reconciler: ReconcilerConfig {
                max_steps: self.max_steps,
                calorie_step: self.calorie_step,
                step_step: self.step_step,
                ..ReconcilerConfig::default()
            },
            trend: TrendConfig {
                plateau_window: self.plateau_window,
                plateau_threshold: self.plateau_threshold,
                ..TrendConfig::default()
            },
        })
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show recommended calorie and step targets for a goal.
    Targets {
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Replay slider moves against the recommended targets.
    Adjust {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Slider move as AXIS=VALUE, e.g. calories=2100 or steps=9000.
        /// Applied in order, each followed by a pointer release.
        #[arg(long = "move", value_name = "AXIS=VALUE", required = true)]
        moves: Vec<SliderMove>,
    },
    /// Summarize a daily metric series.
    Trend {
        #[arg(long)]
        metric: Metric,

        /// Date of the first value.
        #[arg(long)]
        start: NaiveDate,

        /// Comma-separated daily values. Use `nan` for a missing day.
        #[arg(long, value_delimiter = ',', required = true)]
        values: Vec<f64>,

        /// Count days at or below this value towards the streak.
        #[arg(long, conflicts_with = "at_least")]
        at_most: Option<f64>,

        /// Count days at or above this value towards the streak.
        #[arg(long)]
        at_least: Option<f64>,
    },
    /// Estimate body fat from circumference measurements (cm).
    BodyFat {
        #[arg(long)]
        sex: Sex,
        #[arg(long)]
        height: f64,
        #[arg(long)]
        waist: f64,
        #[arg(long)]
        neck: f64,
        /// Required for women.
        #[arg(long)]
        hip: Option<f64>,
        /// Bodyweight (kg) for a lean mass estimate.
        #[arg(long)]
        weight: Option<f64>,
    },
    /// Estimate maintenance from logged intake and weigh-ins.
    Tdee {
        /// Date of the first value in both series.
        #[arg(long)]
        start: NaiveDate,

        /// Comma-separated daily intake (kcal). Use `nan` for a missing day.
        #[arg(long, value_delimiter = ',', required = true)]
        calories: Vec<f64>,

        /// Comma-separated daily weigh-ins (kg). Use `nan` for a missing day.
        #[arg(long, value_delimiter = ',', required = true)]
        weights: Vec<f64>,

        /// End of the 28-day window. Defaults to the last weigh-in.
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GoalKind {
    #[value(alias = "lose")]
    Deficit,
    #[value(alias = "gain")]
    Surplus,
    #[value(alias = "maintain")]
    Maintenance,
    Custom,
}

#[derive(Args, Debug)]
struct ProfileArgs {
    /// Bodyweight (kg).
    #[arg(long)]
    weight: f64,

    /// Height (cm).
    #[arg(long)]
    height: f64,

    /// Age (years).
    #[arg(long)]
    age: u32,

    #[arg(long)]
    sex: Sex,

    /// Body fat percentage. Switches BMR to Katch-McArdle.
    #[arg(long)]
    body_fat: Option<f64>,

    #[arg(long, value_enum, default_value_t = GoalKind::Maintenance)]
    goal: GoalKind,

    /// Weekly weight change (kg/week) for deficit and surplus goals.
    #[arg(long, default_value_t = 0.35)]
    rate: f64,

    /// Daily calories for custom goals.
    #[arg(long, required_if_eq("goal", "custom"))]
    calories: Option<i32>,

    /// Daily steps for custom goals.
    #[arg(long, required_if_eq("goal", "custom"))]
    steps: Option<i32>,
}

impl ProfileArgs {
    fn profile(&self) -> Result<Profile> {
        let profile = Profile::new(self.sex, self.age, self.height, self.weight, self.body_fat);
        profile.validate().context("Invalid profile")?;
        Ok(profile)
    }

    fn policy(&self) -> Result<GoalPolicy> {
        let policy = match self.goal {
            GoalKind::Deficit => GoalPolicy::Deficit {
                weekly_rate_kg: self.weekly_rate()?,
            },
            GoalKind::Surplus => GoalPolicy::Surplus {
                weekly_rate_kg: self.weekly_rate()?,
            },
            GoalKind::Maintenance => GoalPolicy::Maintenance,
            GoalKind::Custom => GoalPolicy::Custom {
                calories: self
                    .calories
                    .context("--calories is required for custom goals")?,
                steps: self.steps.context("--steps is required for custom goals")?,
            },
        };
        Ok(policy)
    }

    fn weekly_rate(&self) -> Result<f64> {
        if !(self.rate.is_finite() && self.rate > 0.0) {
            bail!("--rate must be a positive number, got {}", self.rate);
        }
        Ok(self.rate)
    }

    fn reconciler(&self, config: ReconcilerConfig) -> Result<TargetReconciler> {
        Ok(TargetReconciler::new(self.profile()?, self.policy()?, config))
    }
}

/// One slider move on the command line.
#[derive(Debug, Clone, Copy, Serialize)]
struct SliderMove {
    axis: Axis,
    value: i32,
}

impl FromStr for SliderMove {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (axis, value) = s
            .split_once('=')
            .with_context(|| format!("Expected AXIS=VALUE, got '{}'", s))?;
        let axis = match axis.trim().to_lowercase().as_str() {
            "calories" | "kcal" => Axis::Calories,
            "steps" => Axis::Steps,
            other => bail!("Unknown slider '{}'", other),
        };
        let value = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid slider value '{}'", value))?;
        Ok(Self { axis, value })
    }
}

// === Reports ===

#[derive(Debug, Serialize)]
struct TargetsReport {
    profile: Profile,
    policy: GoalPolicy,
    state: TargetState,
    bounds: CalorieBounds,
    max_steps: i32,
    target_daily_change: f64,
    energy_balance: f64,
    weekly_rate_kg: f64,
    energy: EnergyBreakdown,
    macros: MacroSplit,
}

impl TargetsReport {
    fn new(reconciler: &TargetReconciler) -> Self {
        let state = *reconciler.state();
        let profile = reconciler.profile().clone();
        let policy = *reconciler.policy();

        Self {
            energy: EnergyBreakdown::new(&profile, f64::from(state.steps)),
            macros: plan_macros(f64::from(state.calories), profile.weight_kg, &policy),
            profile,
            policy,
            state,
            bounds: reconciler.bounds(),
            max_steps: reconciler.max_steps(),
            target_daily_change: reconciler.target_daily_change(),
            energy_balance: reconciler.energy_balance(),
            weekly_rate_kg: reconciler.weekly_rate_kg(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AdjustStep {
    slider: SliderMove,
    outcome: Reconciliation,
    /// State before the pointer release, so lock flags are visible.
    state: TargetState,
}

#[derive(Debug, Serialize)]
struct AdjustReport {
    steps: Vec<AdjustStep>,
    result: TargetsReport,
}

#[derive(Debug, Serialize)]
struct TrendReport {
    metric: Metric,
    unit: &'static str,
    summary: TrendSummary,
}

#[derive(Debug, Serialize)]
struct BodyFatReport {
    body_fat_pct: f64,
    lean_body_mass_kg: Option<f64>,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.tuning.planner_config()?;

    match &cli.command {
        Command::Targets { profile } => {
            let reconciler = profile.reconciler(config.reconciler)?;
            let report = TargetsReport::new(&reconciler);
            if cli.json {
                print_json(&report)?;
            } else {
                print_targets(&report);
            }
        }
        Command::Adjust { profile, moves } => {
            let mut reconciler = profile.reconciler(config.reconciler)?;
            let steps = moves
                .iter()
                .map(|&slider| {
                    let outcome = match slider.axis {
                        Axis::Calories => reconciler.on_calories_change(slider.value),
                        Axis::Steps => reconciler.on_steps_change(slider.value),
                    };
                    let state = *reconciler.state();
                    reconciler.on_pointer_release();
                    AdjustStep {
                        slider,
                        outcome,
                        state,
                    }
                })
                .collect();
            let report = AdjustReport {
                steps,
                result: TargetsReport::new(&reconciler),
            };
            if cli.json {
                print_json(&report)?;
            } else {
                print_adjust(&report);
            }
        }
        Command::Trend {
            metric,
            start,
            values,
            at_most,
            at_least,
        } => {
            let series = Series::daily(*start, values);
            let goal = match (at_most, at_least) {
                (Some(target), _) => Some(StreakGoal::AtMost(*target)),
                (None, Some(target)) => Some(StreakGoal::AtLeast(*target)),
                (None, None) => None,
            };
            let trend_config = TrendConfig {
                plateau_threshold: config.trend.plateau_threshold_for(*metric),
                ..config.trend.clone()
            };
            let summary = summarize(&series, goal, &trend_config)
                .with_context(|| format!("Cannot summarize {}", metric))?;
            let report = TrendReport {
                metric: *metric,
                unit: metric.unit(),
                summary,
            };
            if cli.json {
                print_json(&report)?;
            } else {
                print_trend(&report);
            }
        }
        Command::BodyFat {
            sex,
            height,
            waist,
            neck,
            hip,
            weight,
        } => {
            let body_fat_pct = navy_body_fat_pct(*sex, *height, *waist, *neck, *hip)
                .context("Measurements do not give a body fat estimate (women need --hip)")?;
            let report = BodyFatReport {
                body_fat_pct,
                lean_body_mass_kg: weight.map(|w| lean_body_mass(w, body_fat_pct)),
            };
            if cli.json {
                print_json(&report)?;
            } else {
                println!("Body fat: {:.1}%", report.body_fat_pct);
                if let Some(lbm) = report.lean_body_mass_kg {
                    println!("Lean mass: {:.1} kg", lbm);
                }
            }
        }
        Command::Tdee {
            start,
            calories,
            weights,
            today,
        } => {
            let calories = Series::daily(*start, calories);
            let weights = Series::daily(*start, weights);
            let today = today
                .or_else(|| weights.date_range().map(|(_, last)| last))
                .unwrap_or_else(|| Local::now().date_naive());
            let result = calculate_tdee(&calories, &weights, today)
                .context("Not enough data for an empirical TDEE")?;
            if cli.json {
                print_json(&result)?;
            } else {
                print_tdee(&result);
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

fn print_targets(report: &TargetsReport) {
    println!("=== Daily Targets ===");
    println!();
    println!("Calories:  {:>6} kcal", report.state.calories);
    println!("Steps:     {:>6}", report.state.steps);
    println!(
        "Range:     {}-{} kcal, 0-{} steps",
        report.bounds.min, report.bounds.max, report.max_steps
    );
    println!();
    println!("=== Energy ===");
    println!();
    let energy = &report.energy;
    println!("BMR:              {:>6.0} kcal ({:?})", energy.bmr, energy.formula);
    println!("Base maintenance: {:>6.0} kcal", energy.base_maintenance);
    println!("NEAT:             {:>6.0} kcal", energy.neat);
    println!("Total:            {:>6.0} kcal", energy.total_maintenance);
    println!(
        "Balance:          {:>+6.0} kcal/day ({:+.2} kg/week)",
        report.energy_balance, report.weekly_rate_kg
    );
    println!();
    println!("=== Macros ===");
    println!();
    println!("Protein: {:>4.0} g", report.macros.protein_g);
    println!("Fat:     {:>4.0} g", report.macros.fat_g);
    println!("Carbs:   {:>4.0} g", report.macros.carbs_g);
}

fn print_adjust(report: &AdjustReport) {
    for step in &report.steps {
        let axis = match step.slider.axis {
            Axis::Calories => "calories",
            Axis::Steps => "steps",
        };
        let outcome = match step.outcome {
            Reconciliation::Committed => "committed".to_string(),
            Reconciliation::Unchanged => "unchanged".to_string(),
            Reconciliation::Ignored => "ignored (locked)".to_string(),
            Reconciliation::Rejected { locked } => format!("rejected, {:?} locked", locked),
        };
        println!(
            "{:>8} -> {:<6} {:<24} {} kcal / {} steps",
            axis, step.slider.value, outcome, step.state.calories, step.state.steps
        );
    }
    println!();
    print_targets(&report.result);
}

fn print_trend(report: &TrendReport) {
    let s = &report.summary;
    let unit = report.unit;

    println!("=== {} Trend ===", report.metric);
    println!();
    println!(
        "Observations: {} ({} to {})",
        s.observations, s.first_date, s.last_date
    );
    println!("Latest:       {:.2} {}", s.latest_value, unit);
    println!("Average:      {:.2} {}", s.average, unit);
    if let Some(trend) = &s.trend {
        println!(
            "Trend:        {:+.3} {}/day (R² {:.2})",
            trend.slope, unit, trend.r_squared
        );
    }
    println!("Weekly rate:  {}", format_optional(s.weekly_rate, unit));
    println!("Monthly rate: {}", format_optional(s.monthly_rate, unit));
    println!("In 30 days:   {}", format_optional(s.predicted_30d, unit));
    println!("In 90 days:   {}", format_optional(s.predicted_90d, unit));
    println!("Moving avg:   {}", format_optional(s.moving_average, unit));
    println!("Consistency:  {:.0}%", s.consistency_score);
    println!(
        "Streaks:      current {}, longest {}",
        s.streaks.current, s.streaks.longest
    );
    println!(
        "Weekday/end:  {:.2} / {:.2} {} ({:+.2})",
        s.weekday_split.weekday_average,
        s.weekday_split.weekend_average,
        unit,
        s.weekday_split.difference
    );

    if !s.plateaus.is_empty() {
        println!();
        println!("Plateaus:");
        for plateau in &s.plateaus {
            println!(
                "  {} to {} ({} days)",
                plateau.start, plateau.end, plateau.duration_days
            );
        }
    }
}

fn print_tdee(result: &TdeeResult) {
    println!("=== Empirical TDEE ===");
    println!();
    println!("Window:       {} to {}", result.window_start, result.window_end);
    println!("TDEE:         {:.0} kcal", result.tdee);
    println!(
        "Avg intake:   {:.0} kcal ({} days)",
        result.avg_calories, result.pairs_used
    );
    println!(
        "Weight:       {:.2} -> {:.2} kg ({:+.2})",
        result.ema_start, result.ema_end, result.weight_change_kg
    );
}

fn format_optional(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.2} {}", v, unit),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_slider_move_parse() {
        let m: SliderMove = "calories=2100".parse().unwrap();
        assert_eq!(m.axis, Axis::Calories);
        assert_eq!(m.value, 2100);

        let m: SliderMove = " Steps = 9000 ".parse().unwrap();
        assert_eq!(m.axis, Axis::Steps);
        assert_eq!(m.value, 9000);

        assert!("calories".parse::<SliderMove>().is_err());
        assert!("protein=100".parse::<SliderMove>().is_err());
        assert!("steps=lots".parse::<SliderMove>().is_err());
    }

    #[test]
    fn test_custom_goal_requires_targets() {
        let cli = Cli::try_parse_from([
            "weightplan", "targets", "--weight", "80", "--height", "180", "--age", "30", "--sex",
            "male", "--goal", "custom",
        ]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_targets_args_build_reconciler() {
        let cli = Cli::try_parse_from([
            "weightplan", "targets", "--weight", "80", "--height", "180", "--age", "30", "--sex",
            "male", "--goal", "lose", "--rate", "0.5",
        ])
        .unwrap();
        let config = cli.tuning.planner_config().unwrap();
        let Command::Targets { profile } = &cli.command else {
            panic!("expected targets subcommand");
        };
        let reconciler = profile.reconciler(config.reconciler).unwrap();
        assert!(reconciler.target_daily_change() < 0.0);
        assert!(reconciler.bounds().contains(reconciler.state().calories));
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let cli = Cli::try_parse_from([
            "weightplan", "targets", "--weight", "80", "--height", "180", "--age", "10", "--sex",
            "female",
        ])
        .unwrap();
        let Command::Targets { profile } = &cli.command else {
            panic!("expected targets subcommand");
        };
        assert!(profile.profile().is_err());
    }
}
