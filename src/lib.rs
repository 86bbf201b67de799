//! Energy-balance planning: daily calorie and step targets that meet a weight
//! goal, plus trend analytics over logged weight, intake and activity.

pub mod body_composition;
pub mod config;
pub mod domain;
pub mod energy;
pub mod error;
pub mod macros;
pub mod reconciler;
pub mod tdee;
pub mod trend;
