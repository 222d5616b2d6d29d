//! Expected-goals ("lambda") calculator.
//!
//! A team's lambda blends its season scoring rate with its recent form,
//! averages that attack strength against the opponent's conceded rate, and
//! applies a multiplicative home-field boost. The result is the parameter of
//! the Poisson distribution used downstream.

use super::TeamProfile;

/// Default weight given to recent form vs the season average.
pub const DEFAULT_FORM_WEIGHT: f64 = 0.3;
/// Default multiplicative boost for the home team.
pub const DEFAULT_HOME_ADVANTAGE: f64 = 1.15;
/// Default lambda floor. A zero Poisson parameter degenerates to a point
/// mass at zero goals, which downstream modeling treats as invalid.
pub const DEFAULT_MIN_LAMBDA: f64 = 0.1;

/// Tunable constants of the expected-goals model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    /// Weight of the recent-form rate in the blend, in [0, 1].
    pub form_weight: f64,
    /// Multiplier applied to the home team's lambda, ≥ 1.
    pub home_advantage: f64,
    /// Strictly positive floor on the returned lambda.
    pub min_lambda: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams {
            form_weight: DEFAULT_FORM_WEIGHT,
            home_advantage: DEFAULT_HOME_ADVANTAGE,
            min_lambda: DEFAULT_MIN_LAMBDA,
        }
    }
}

/// Expected first-half goals for one team against a given opponent.
///
/// Steps:
/// 1. `blended = scored·(1−w) + form_scored·w`
/// 2. `lambda = (blended + opponent_conceded) / 2`
/// 3. `× home_advantage` when `is_home`
/// 4. clamp to `min_lambda`
///
/// Infallible for non-negative finite inputs. Negative or non-finite rates
/// are a caller bug and produce unspecified output.
pub fn team_lambda(
    own: &TeamProfile,
    opponent: &TeamProfile,
    is_home: bool,
    params: &ModelParams,
) -> f64 {
    debug_assert!(
        (0.0..=1.0).contains(&params.form_weight),
        "form_weight out of range"
    );
    debug_assert!(params.home_advantage >= 1.0, "home_advantage below 1");
    debug_assert!(params.min_lambda > 0.0, "min_lambda must be positive");

    let blended_scored = own.goals_scored_rate * (1.0 - params.form_weight)
        + own.recent_form_scored_rate * params.form_weight;

    let attack_strength = blended_scored;
    let defense_weakness = opponent.goals_conceded_rate;

    let mut lambda = (attack_strength + defense_weakness) / 2.0;
    if is_home {
        lambda *= params.home_advantage;
    }

    lambda.max(params.min_lambda)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn profile(gs: f64, gc: f64, fgs: f64, fgc: f64) -> TeamProfile {
        TeamProfile {
            goals_scored_rate: gs,
            goals_conceded_rate: gc,
            recent_form_scored_rate: fgs,
            recent_form_conceded_rate: fgc,
        }
    }

    #[test]
    fn blends_season_and_form_rates() {
        let own = profile(1.0, 0.5, 2.0, 0.5);
        let opp = profile(0.0, 1.0, 0.0, 1.0);
        // blended = 1.0*0.7 + 2.0*0.3 = 1.3; lambda = (1.3 + 1.0)/2 = 1.15
        let lambda = team_lambda(&own, &opp, false, &ModelParams::default());
        assert_relative_eq!(lambda, 1.15, epsilon = 1e-12);
    }

    #[test]
    fn home_team_gets_advantage_multiplier() {
        let own = profile(0.9, 0.4, 1.0, 0.3);
        let opp = profile(0.7, 0.6, 0.8, 0.5);
        let params = ModelParams::default();
        let away = team_lambda(&own, &opp, false, &params);
        let home = team_lambda(&own, &opp, true, &params);
        // Away value is well above the floor, so the exact ratio must hold.
        assert!(away > params.min_lambda);
        assert_relative_eq!(home, away * params.home_advantage, epsilon = 1e-12);
    }

    #[test]
    fn floor_applies_to_degenerate_inputs() {
        let own = profile(0.0, 0.0, 0.0, 0.0);
        let opp = profile(0.0, 0.0, 0.0, 0.0);
        let params = ModelParams::default();
        assert_relative_eq!(
            team_lambda(&own, &opp, false, &params),
            params.min_lambda,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            team_lambda(&own, &opp, true, &params),
            params.min_lambda,
            epsilon = 1e-12
        );
    }

    #[test]
    fn result_never_below_floor() {
        let params = ModelParams::default();
        for gs in [0.0, 0.01, 0.5, 1.2, 3.0] {
            for gc in [0.0, 0.2, 1.5] {
                let own = profile(gs, gc, gs, gc);
                let opp = profile(gc, gs * 0.1, gc, gs * 0.1);
                let lambda = team_lambda(&own, &opp, false, &params);
                assert!(lambda >= params.min_lambda, "lambda {lambda} below floor");
            }
        }
    }

    #[test]
    fn monotone_in_own_scored_rate() {
        let opp = profile(0.7, 0.6, 0.8, 0.5);
        let params = ModelParams::default();
        let mut prev = 0.0;
        for gs in [0.0, 0.3, 0.6, 0.9, 1.5, 3.0] {
            let own = profile(gs, 0.4, 0.8, 0.3);
            let lambda = team_lambda(&own, &opp, true, &params);
            assert!(lambda >= prev, "lambda decreased when scored rate rose");
            prev = lambda;
        }
    }

    #[test]
    fn zero_form_weight_ignores_recent_form() {
        let params = ModelParams {
            form_weight: 0.0,
            ..ModelParams::default()
        };
        let opp = profile(0.5, 0.5, 0.5, 0.5);
        let a = team_lambda(&profile(1.0, 0.4, 0.0, 0.0), &opp, false, &params);
        let b = team_lambda(&profile(1.0, 0.4, 9.9, 9.9), &opp, false, &params);
        assert_relative_eq!(a, b, epsilon = 1e-12);
    }
}
