//! Poisson distribution over total first-half goals.
//!
//! Home and away goal counts are modeled as independent Poisson variables, so
//! their sum is Poisson with the summed parameter (exact, not an
//! approximation). The over/under market probabilities are derived from the
//! same probability masses as the exact-score table, never re-estimated.

use serde::{Deserialize, Serialize};

use super::lambda::{team_lambda, ModelParams};
use super::TeamProfile;

/// Highest goal count listed in the exact-score table by default.
pub const DEFAULT_MAX_GOALS: usize = 5;

/// Probability of one exact total-goal count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalCountProbability {
    pub goals: u32,
    pub probability: f64,
}

/// Over/under probabilities for the standard first-half thresholds.
///
/// Each `over_*`/`under_*` pair at the same boundary partitions the outcome
/// space and sums to exactly 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketProbabilities {
    pub under_0_5: f64,
    pub over_0_5: f64,
    pub under_1_5: f64,
    pub over_1_5: f64,
    pub over_2_5: f64,
}

/// Full result of one match query. Built fresh per invocation, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionResult {
    pub home_lambda: f64,
    pub away_lambda: f64,
    pub total_lambda: f64,
    /// P(total goals = k) for k = 0..=max_goals, in order. Sums to 1 minus
    /// the tail mass beyond `max_goals`.
    pub exact_score_probabilities: Vec<GoalCountProbability>,
    pub market_probabilities: MarketProbabilities,
}

/// Poisson pmf values P(k; λ) for k = 0..=max_k via the multiplicative
/// recurrence p(k) = p(k−1)·λ/k. No tail folding: the entries are the true
/// masses and deliberately sum to less than 1 for any positive λ.
fn poisson_pmf(lambda: f64, max_k: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(max_k + 1);
    out.push((-lambda).exp());
    for k in 1..=max_k {
        let prev = out[k - 1];
        out.push(prev * lambda / k as f64);
    }
    out
}

/// Compute the first-half goal distribution for a home/away pairing.
///
/// `home` receives the home-advantage multiplier; each side's lambda is
/// computed against the other side's conceded rate. Pure and deterministic:
/// identical inputs always produce an identical result.
pub fn compute_match_distribution(
    home: &TeamProfile,
    away: &TeamProfile,
    max_goals: usize,
    params: &ModelParams,
) -> DistributionResult {
    let home_lambda = team_lambda(home, away, true, params);
    let away_lambda = team_lambda(away, home, false, params);
    let total_lambda = home_lambda + away_lambda;

    let pmf = poisson_pmf(total_lambda, max_goals.max(2));

    // Cumulative masses at the market boundaries. The over side is the exact
    // complement so each pair sums to 1 by construction.
    let under_0_5 = pmf[0];
    let under_1_5 = pmf[0] + pmf[1];
    let under_2_5 = pmf[0] + pmf[1] + pmf[2];

    let market_probabilities = MarketProbabilities {
        under_0_5,
        over_0_5: 1.0 - under_0_5,
        under_1_5,
        over_1_5: 1.0 - under_1_5,
        over_2_5: 1.0 - under_2_5,
    };

    let exact_score_probabilities = pmf
        .iter()
        .take(max_goals + 1)
        .enumerate()
        .map(|(k, &p)| GoalCountProbability {
            goals: k as u32,
            probability: p,
        })
        .collect();

    DistributionResult {
        home_lambda,
        away_lambda,
        total_lambda,
        exact_score_probabilities,
        market_probabilities,
    }
}
