//! Account registration, login, and subscription quota tracking.
//!
//! Deliberately simple: hex-encoded SHA-256 digests and a per-day usage
//! counter reset lazily when the UTC date advances. Session handling and
//! credential hardening belong to a fronting layer, not here.

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::db::models::User;
use crate::db::Database;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
    #[error("email must not be empty")]
    InvalidEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no account registered for this email")]
    UnknownUser,
    #[error("daily prediction limit reached for the '{tier}' plan")]
    QuotaExceeded { tier: &'static str },
    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

/// Hex-encoded SHA-256 digest of the password.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Account operations over the shared database handle.
#[derive(Clone)]
pub struct Accounts {
    db: Database,
}

impl Accounts {
    pub fn new(db: Database) -> Self {
        Accounts { db }
    }

    /// Create a new account on the free tier.
    pub fn register(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AccountError::InvalidEmail);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AccountError::WeakPassword);
        }
        if self.db.get_user(email)?.is_some() {
            return Err(AccountError::EmailTaken);
        }
        self.db
            .insert_user(email, &hash_password(password))
            .map_err(AccountError::Db)?;
        info!("Registered account {email}");
        self.db.get_user(email)?.ok_or(AccountError::UnknownUser)
    }

    /// Verify credentials and return the account.
    pub fn login(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let user = self
            .db
            .get_user(email.trim())?
            .ok_or(AccountError::InvalidCredentials)?;
        if user.password_hash != hash_password(password) {
            return Err(AccountError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Check the account's daily quota and consume one prediction from it.
    ///
    /// The usage counter resets the first time the account is seen on a new
    /// UTC day; no background job is involved.
    pub fn consume_prediction(&self, email: &str) -> Result<User, AccountError> {
        let mut user = self
            .db
            .get_user(email.trim())?
            .ok_or(AccountError::UnknownUser)?;

        let today = Utc::now().date_naive();
        if today > user.last_reset {
            user.predictions_used = 0;
            user.last_reset = today;
        }

        if let Some(limit) = user.subscription_tier.daily_limit() {
            if user.predictions_used >= limit {
                return Err(AccountError::QuotaExceeded {
                    tier: user.subscription_tier.as_str(),
                });
            }
        }

        user.predictions_used += 1;
        self.db
            .update_user_usage(&user.email, user.predictions_used, user.last_reset)?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SubscriptionTier;
    use chrono::Days;

    fn accounts() -> Accounts {
        Accounts::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn hash_is_deterministic_hex_sha256() {
        let h = hash_password("secret1");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_password("secret1"));
        assert_ne!(h, hash_password("secret2"));
    }

    #[test]
    fn register_then_login() {
        let accounts = accounts();
        let user = accounts.register("a@example.com", "secret1").unwrap();
        assert_eq!(user.subscription_tier, SubscriptionTier::Free);
        assert!(accounts.login("a@example.com", "secret1").is_ok());
        assert!(matches!(
            accounts.login("a@example.com", "wrong"),
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[test]
    fn register_validations() {
        let accounts = accounts();
        assert!(matches!(
            accounts.register("", "secret1"),
            Err(AccountError::InvalidEmail)
        ));
        assert!(matches!(
            accounts.register("a@example.com", "short"),
            Err(AccountError::WeakPassword)
        ));
        accounts.register("a@example.com", "secret1").unwrap();
        assert!(matches!(
            accounts.register("a@example.com", "secret1"),
            Err(AccountError::EmailTaken)
        ));
    }

    #[test]
    fn free_tier_has_no_quota() {
        let accounts = accounts();
        accounts.register("a@example.com", "secret1").unwrap();
        assert!(matches!(
            accounts.consume_prediction("a@example.com"),
            Err(AccountError::QuotaExceeded { tier: "free" })
        ));
    }

    #[test]
    fn daily_tier_allows_five_per_day() {
        let accounts = accounts();
        accounts.register("a@example.com", "secret1").unwrap();
        accounts
            .db
            .set_user_tier("a@example.com", SubscriptionTier::Daily)
            .unwrap();
        for used in 1..=5 {
            let user = accounts.consume_prediction("a@example.com").unwrap();
            assert_eq!(user.predictions_used, used);
        }
        assert!(matches!(
            accounts.consume_prediction("a@example.com"),
            Err(AccountError::QuotaExceeded { tier: "daily" })
        ));
    }

    #[test]
    fn premium_tier_is_unlimited() {
        let accounts = accounts();
        accounts.register("a@example.com", "secret1").unwrap();
        accounts
            .db
            .set_user_tier("a@example.com", SubscriptionTier::Premium)
            .unwrap();
        for _ in 0..100 {
            accounts.consume_prediction("a@example.com").unwrap();
        }
    }

    #[test]
    fn usage_resets_on_a_new_day() {
        let accounts = accounts();
        accounts.register("a@example.com", "secret1").unwrap();
        accounts
            .db
            .set_user_tier("a@example.com", SubscriptionTier::Daily)
            .unwrap();

        // Exhaust today's quota, then backdate the reset marker.
        for _ in 0..5 {
            accounts.consume_prediction("a@example.com").unwrap();
        }
        let yesterday = Utc::now().date_naive().checked_sub_days(Days::new(1)).unwrap();
        accounts
            .db
            .update_user_usage("a@example.com", 5, yesterday)
            .unwrap();

        let user = accounts.consume_prediction("a@example.com").unwrap();
        assert_eq!(user.predictions_used, 1);
        assert_eq!(user.last_reset, Utc::now().date_naive());
    }

    #[test]
    fn unknown_user_cannot_consume() {
        let accounts = accounts();
        assert!(matches!(
            accounts.consume_prediction("ghost@example.com"),
            Err(AccountError::UnknownUser)
        ));
    }
}
