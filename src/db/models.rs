use anyhow::{ensure, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::TeamProfile;

/// A team from the seeded catalogue with its first-half scoring statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Option<i64>,
    pub name: String,
    pub league: String,
    pub goals_scored_rate: f64,
    pub goals_conceded_rate: f64,
    pub recent_form_scored_rate: f64,
    pub recent_form_conceded_rate: f64,
}

impl Team {
    /// Strongly-typed engine input, validated here at the persistence
    /// boundary. The engine itself assumes non-negative finite rates.
    pub fn profile(&self) -> Result<TeamProfile> {
        let rates = [
            self.goals_scored_rate,
            self.goals_conceded_rate,
            self.recent_form_scored_rate,
            self.recent_form_conceded_rate,
        ];
        ensure!(
            rates.iter().all(|r| r.is_finite() && *r >= 0.0),
            "team '{}' has a negative or non-finite rate",
            self.name
        );
        Ok(TeamProfile {
            goals_scored_rate: self.goals_scored_rate,
            goals_conceded_rate: self.goals_conceded_rate,
            recent_form_scored_rate: self.recent_form_scored_rate,
            recent_form_conceded_rate: self.recent_form_conceded_rate,
        })
    }
}

/// Subscription tiers and their daily prediction quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Daily,
    Package,
    Pro,
    Premium,
}

impl SubscriptionTier {
    /// Predictions allowed per UTC day; `None` means unlimited.
    pub fn daily_limit(self) -> Option<u32> {
        match self {
            SubscriptionTier::Free => Some(0),
            SubscriptionTier::Daily | SubscriptionTier::Package => Some(5),
            SubscriptionTier::Pro => Some(50),
            SubscriptionTier::Premium => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Daily => "daily",
            SubscriptionTier::Package => "package",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Premium => "premium",
        }
    }

    /// Unknown tier strings in the database fall back to `Free` rather than
    /// failing the whole query.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "daily" => SubscriptionTier::Daily,
            "package" => SubscriptionTier::Package,
            "pro" => SubscriptionTier::Pro,
            "premium" => SubscriptionTier::Premium,
            _ => SubscriptionTier::Free,
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    /// Hex-encoded SHA-256 digest. Never serialized to API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub subscription_tier: SubscriptionTier,
    /// Predictions consumed since `last_reset`.
    pub predictions_used: u32,
    /// UTC day the usage counter was last reset on.
    pub last_reset: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Audit log row for one served prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Option<i64>,
    pub user_email: String,
    pub home_team: String,
    pub away_team: String,
    pub home_lambda: f64,
    pub away_lambda: f64,
    pub total_lambda: f64,
    pub over_0_5: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(gs: f64) -> Team {
        Team {
            id: None,
            name: "T".into(),
            league: "L".into(),
            goals_scored_rate: gs,
            goals_conceded_rate: 0.4,
            recent_form_scored_rate: 0.9,
            recent_form_conceded_rate: 0.3,
        }
    }

    #[test]
    fn profile_rejects_negative_rate() {
        assert!(team(-0.1).profile().is_err());
    }

    #[test]
    fn profile_rejects_non_finite_rate() {
        assert!(team(f64::NAN).profile().is_err());
        assert!(team(f64::INFINITY).profile().is_err());
    }

    #[test]
    fn profile_accepts_valid_rates() {
        let p = team(0.8).profile().unwrap();
        assert_eq!(p.goals_scored_rate, 0.8);
        assert_eq!(p.recent_form_conceded_rate, 0.3);
    }

    #[test]
    fn tier_parse_round_trips() {
        for tier in [
            SubscriptionTier::Free,
            SubscriptionTier::Daily,
            SubscriptionTier::Package,
            SubscriptionTier::Pro,
            SubscriptionTier::Premium,
        ] {
            assert_eq!(SubscriptionTier::parse(tier.as_str()), tier);
        }
    }

    #[test]
    fn unknown_tier_defaults_to_free() {
        assert_eq!(SubscriptionTier::parse("gold"), SubscriptionTier::Free);
        assert_eq!(SubscriptionTier::parse(""), SubscriptionTier::Free);
    }

    #[test]
    fn tier_limits_match_plans() {
        assert_eq!(SubscriptionTier::Free.daily_limit(), Some(0));
        assert_eq!(SubscriptionTier::Daily.daily_limit(), Some(5));
        assert_eq!(SubscriptionTier::Package.daily_limit(), Some(5));
        assert_eq!(SubscriptionTier::Pro.daily_limit(), Some(50));
        assert_eq!(SubscriptionTier::Premium.daily_limit(), None);
    }
}
