//! First-half goal-distribution engine.
//!
//! Pure, stateless computation: two team statistical profiles go in, a
//! Poisson distribution over total first-half goals plus derived over/under
//! market probabilities come out. No I/O, no shared state; handlers may
//! call into this module concurrently without coordination.

pub mod distribution;
pub mod lambda;

pub use distribution::{compute_match_distribution, DistributionResult, MarketProbabilities};
pub use lambda::{team_lambda, ModelParams};

use serde::{Deserialize, Serialize};

/// A team's first-half scoring statistics for one calculation.
///
/// All four rates are season or recent-window *averages* and must be
/// non-negative and finite. The engine does not re-validate them; the
/// persistence boundary rejects bad rows before they get here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    /// Season average goals scored in the first half.
    pub goals_scored_rate: f64,
    /// Season average goals conceded in the first half.
    pub goals_conceded_rate: f64,
    /// Goals scored over the recent-form window.
    pub recent_form_scored_rate: f64,
    /// Goals conceded over the recent-form window.
    pub recent_form_conceded_rate: f64,
}
