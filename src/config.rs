use clap::Parser;

use crate::model::ModelParams;

/// FootballPro first-half goals prediction dashboard
#[derive(Parser, Debug, Clone)]
#[command(name = "footballpro-analytics", version, about)]
pub struct Config {
    /// Dashboard listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "footballpro.db")]
    pub database_path: String,

    /// Weight given to recent form vs the season average (0.0–1.0)
    #[arg(long, env = "FORM_WEIGHT", default_value = "0.3")]
    pub form_weight: f64,

    /// Multiplicative expected-goals boost for the home team (≥ 1.0)
    #[arg(long, env = "HOME_ADVANTAGE", default_value = "1.15")]
    pub home_advantage: f64,

    /// Floor on each team's expected-goals parameter (must be > 0)
    #[arg(long, env = "MIN_LAMBDA", default_value = "0.1")]
    pub min_lambda: f64,

    /// Highest goal count listed in the exact-score table (1–15)
    #[arg(long, env = "MAX_GOALS", default_value = "5")]
    pub max_goals: usize,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.form_weight) {
            anyhow::bail!("form_weight must be between 0.0 and 1.0");
        }
        if self.home_advantage < 1.0 {
            anyhow::bail!("home_advantage must be at least 1.0");
        }
        if !(self.min_lambda > 0.0) || !self.min_lambda.is_finite() {
            anyhow::bail!("min_lambda must be a positive finite number");
        }
        if !(1..=15).contains(&self.max_goals) {
            anyhow::bail!("max_goals must be between 1 and 15");
        }
        Ok(())
    }

    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            form_weight: self.form_weight,
            home_advantage: self.home_advantage,
            min_lambda: self.min_lambda,
        }
    }
}
