use anyhow::{ensure, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;

pub mod models;
use models::*;

/// Thread-safe SQLite handle (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::from_connection(conn)
    }

    /// In-memory database for unit tests
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Teams ────────────────────────────────────────────────────────────────

    /// Seed the sample team catalogue if the table is empty. Idempotent.
    pub fn seed_sample_teams(&self) -> Result<usize> {
        self.seed_teams(&SAMPLE_TEAMS)
    }

    fn seed_teams(&self, rows: &[(&str, &str, f64, f64, f64, f64)]) -> Result<usize> {
        let count: i64 = {
            let conn = self.conn.lock().unwrap();
            conn.query_row("SELECT COUNT(*) FROM teams", [], |r| r.get(0))?
        };
        if count > 0 {
            return Ok(0);
        }
        // Same invariant `Team::profile` enforces on the way out: rates that
        // reach the engine must be finite and non-negative.
        for &(name, _, gs, gc, fgs, fgc) in rows {
            ensure!(
                [gs, gc, fgs, fgc].iter().all(|r| r.is_finite() && *r >= 0.0),
                "seed row for '{}' has a negative or non-finite rate",
                name
            );
        }
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "INSERT INTO teams (name, league, goals_scored_1h, goals_conceded_1h,
                                recent_form_gs, recent_form_gc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for &(name, league, gs, gc, fgs, fgc) in rows {
            stmt.execute(params![name, league, gs, gc, fgs, fgc])?;
        }
        info!("Seeded {} sample teams", rows.len());
        Ok(rows.len())
    }

    /// List all teams ordered by league, then name
    pub fn list_teams(&self) -> Result<Vec<Team>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, league, goals_scored_1h, goals_conceded_1h,
                    recent_form_gs, recent_form_gc
             FROM teams ORDER BY league, name",
        )?;
        let teams = stmt
            .query_map([], map_team)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(teams)
    }

    /// Look up a single team by name
    pub fn get_team(&self, name: &str) -> Result<Option<Team>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, league, goals_scored_1h, goals_conceded_1h,
                    recent_form_gs, recent_form_gc
             FROM teams WHERE name = ?1",
        )?;
        let mut rows = stmt.query_map(params![name], map_team)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    // ── Users ────────────────────────────────────────────────────────────────

    /// Insert a new account. Fails on duplicate email (UNIQUE constraint).
    pub fn insert_user(&self, email: &str, password_hash: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (email, password_hash, subscription_tier,
                                predictions_used, last_reset, created_at)
             VALUES (?1, ?2, 'free', 0, ?3, ?4)",
            params![email, password_hash, Utc::now().date_naive(), Utc::now()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_user(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, email, password_hash, subscription_tier,
                    predictions_used, last_reset, created_at
             FROM users WHERE email = ?1",
        )?;
        let mut rows = stmt.query_map(params![email], map_user)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Overwrite the usage counter and its reset day for one account
    pub fn update_user_usage(
        &self,
        email: &str,
        predictions_used: u32,
        last_reset: NaiveDate,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET predictions_used = ?1, last_reset = ?2 WHERE email = ?3",
            params![predictions_used, last_reset, email],
        )?;
        Ok(())
    }

    /// Change an account's subscription tier
    pub fn set_user_tier(&self, email: &str, tier: SubscriptionTier) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET subscription_tier = ?1 WHERE email = ?2",
            params![tier.as_str(), email],
        )?;
        Ok(())
    }

    // ── Predictions ──────────────────────────────────────────────────────────

    /// Log a served prediction
    pub fn insert_prediction(&self, rec: &PredictionRecord) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO predictions (user_email, home_team, away_team,
                                      home_lambda, away_lambda, total_lambda,
                                      over_0_5, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                rec.user_email,
                rec.home_team,
                rec.away_team,
                rec.home_lambda,
                rec.away_lambda,
                rec.total_lambda,
                rec.over_0_5,
                rec.created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List recent predictions, newest first
    pub fn list_recent_predictions(&self, limit: i64) -> Result<Vec<PredictionRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_email, home_team, away_team,
                    home_lambda, away_lambda, total_lambda, over_0_5, created_at
             FROM predictions ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], map_prediction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ── Stats ────────────────────────────────────────────────────────────────

    /// Aggregate counts for the dashboard header
    pub fn get_stats(&self) -> Result<Stats> {
        let conn = self.conn.lock().unwrap();
        let teams: i64 = conn
            .query_row("SELECT COUNT(*) FROM teams", [], |r| r.get(0))
            .unwrap_or(0);
        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap_or(0);
        let predictions_served: i64 = conn
            .query_row("SELECT COUNT(*) FROM predictions", [], |r| r.get(0))
            .unwrap_or(0);
        Ok(Stats {
            teams,
            users,
            predictions_served,
        })
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_team(row: &rusqlite::Row) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        league: row.get(2)?,
        goals_scored_rate: row.get(3)?,
        goals_conceded_rate: row.get(4)?,
        recent_form_scored_rate: row.get(5)?,
        recent_form_conceded_rate: row.get(6)?,
    })
}

fn map_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let tier: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        subscription_tier: SubscriptionTier::parse(&tier),
        predictions_used: row.get(4)?,
        last_reset: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_prediction(row: &rusqlite::Row) -> rusqlite::Result<PredictionRecord> {
    Ok(PredictionRecord {
        id: row.get(0)?,
        user_email: row.get(1)?,
        home_team: row.get(2)?,
        away_team: row.get(3)?,
        home_lambda: row.get(4)?,
        away_lambda: row.get(5)?,
        total_lambda: row.get(6)?,
        over_0_5: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS teams (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    name              TEXT    NOT NULL UNIQUE,
    league            TEXT    NOT NULL,
    goals_scored_1h   REAL    NOT NULL,
    goals_conceded_1h REAL    NOT NULL,
    recent_form_gs    REAL    NOT NULL,
    recent_form_gc    REAL    NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    email             TEXT    NOT NULL UNIQUE,
    password_hash     TEXT    NOT NULL,
    subscription_tier TEXT    NOT NULL DEFAULT 'free',
    predictions_used  INTEGER NOT NULL DEFAULT 0,
    last_reset        TEXT    NOT NULL,
    created_at        TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS predictions (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_email   TEXT    NOT NULL,
    home_team    TEXT    NOT NULL,
    away_team    TEXT    NOT NULL,
    home_lambda  REAL    NOT NULL,
    away_lambda  REAL    NOT NULL,
    total_lambda REAL    NOT NULL,
    over_0_5     REAL    NOT NULL,
    created_at   TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_predictions_email ON predictions(user_email);
CREATE INDEX IF NOT EXISTS idx_predictions_created ON predictions(created_at);
"#;

/// Sample first-half statistics shipped with the app so the dashboard works
/// out of the box.
const SAMPLE_TEAMS: [(&str, &str, f64, f64, f64, f64); 20] = [
    ("Arsenal", "Premier League", 0.95, 0.27, 1.1, 0.2),
    ("Chelsea", "Premier League", 0.86, 0.71, 0.9, 0.8),
    ("Manchester City", "Premier League", 1.2, 0.15, 1.3, 0.1),
    ("Liverpool", "Premier League", 1.1, 0.3, 1.2, 0.25),
    ("Tottenham", "Premier League", 0.86, 0.73, 0.8, 0.9),
    ("Manchester United", "Premier League", 0.73, 0.58, 0.7, 0.6),
    ("Newcastle", "Premier League", 0.65, 0.45, 0.7, 0.4),
    ("Brighton", "Premier League", 0.58, 0.52, 0.6, 0.5),
    ("Fulham", "Premier League", 0.73, 0.53, 0.8, 0.5),
    ("Leicester City", "Premier League", 0.44, 0.94, 0.4, 1.0),
    ("Barcelona", "La Liga", 1.15, 0.25, 1.2, 0.2),
    ("Real Madrid", "La Liga", 1.08, 0.31, 1.1, 0.3),
    ("Atletico Madrid", "La Liga", 0.72, 0.38, 0.7, 0.4),
    ("Sevilla", "La Liga", 0.64, 0.47, 0.6, 0.5),
    ("Valencia", "La Liga", 0.51, 0.68, 0.5, 0.7),
    ("Inter Milan", "Serie A", 0.89, 0.34, 0.9, 0.3),
    ("AC Milan", "Serie A", 0.83, 0.41, 0.8, 0.4),
    ("Juventus", "Serie A", 0.71, 0.48, 0.7, 0.5),
    ("Napoli", "Serie A", 0.95, 0.38, 1.0, 0.35),
    ("Roma", "Serie A", 0.67, 0.55, 0.65, 0.6),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub teams: i64,
    pub users: i64,
    pub predictions_served: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.seed_sample_teams().unwrap();
        db
    }

    #[test]
    fn seed_rejects_invalid_rates() {
        let db = Database::open_in_memory().unwrap();
        assert!(db
            .seed_teams(&[("Bad FC", "League", -0.1, 0.4, 0.5, 0.3)])
            .is_err());
        assert!(db
            .seed_teams(&[("NaN FC", "League", f64::NAN, 0.4, 0.5, 0.3)])
            .is_err());
        assert!(db.list_teams().unwrap().is_empty());
    }

    #[test]
    fn seed_is_idempotent() {
        let db = db();
        assert_eq!(db.seed_sample_teams().unwrap(), 0);
        assert_eq!(db.list_teams().unwrap().len(), 20);
    }

    #[test]
    fn get_team_by_name() {
        let db = db();
        let arsenal = db.get_team("Arsenal").unwrap().unwrap();
        assert_eq!(arsenal.league, "Premier League");
        assert_eq!(arsenal.goals_scored_rate, 0.95);
        assert!(db.get_team("No Such FC").unwrap().is_none());
    }

    #[test]
    fn seeded_rows_convert_to_profiles() {
        let db = db();
        for team in db.list_teams().unwrap() {
            team.profile().unwrap();
        }
    }

    #[test]
    fn user_round_trip_and_usage_update() {
        let db = db();
        db.insert_user("a@example.com", "deadbeef").unwrap();
        let user = db.get_user("a@example.com").unwrap().unwrap();
        assert_eq!(user.subscription_tier, SubscriptionTier::Free);
        assert_eq!(user.predictions_used, 0);

        let day = Utc::now().date_naive();
        db.update_user_usage("a@example.com", 3, day).unwrap();
        db.set_user_tier("a@example.com", SubscriptionTier::Pro)
            .unwrap();
        let user = db.get_user("a@example.com").unwrap().unwrap();
        assert_eq!(user.predictions_used, 3);
        assert_eq!(user.last_reset, day);
        assert_eq!(user.subscription_tier, SubscriptionTier::Pro);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = db();
        db.insert_user("a@example.com", "x").unwrap();
        assert!(db.insert_user("a@example.com", "y").is_err());
    }

    #[test]
    fn prediction_log_round_trip() {
        let db = db();
        let rec = PredictionRecord {
            id: None,
            user_email: "a@example.com".into(),
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            home_lambda: 0.98,
            away_lambda: 0.57,
            total_lambda: 1.55,
            over_0_5: 0.79,
            created_at: Utc::now(),
        };
        db.insert_prediction(&rec).unwrap();
        let rows = db.list_recent_predictions(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home_team, "Arsenal");
        assert_eq!(rows[0].total_lambda, 1.55);
    }

    #[test]
    fn stats_count_rows() {
        let db = db();
        db.insert_user("a@example.com", "x").unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.teams, 20);
        assert_eq!(stats.users, 1);
        assert_eq!(stats.predictions_served, 0);
    }
}
