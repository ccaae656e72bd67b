use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::session::Session;
use crate::types::{GuessRecord, Outcome, Symbol};

/// Row of the `sessions` table. `day` is `YYYY-MM-DD`, `guesses` a JSON array.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub player_id: String,
    pub day: String,
    pub secret: String,
    pub max_attempts: i64,
    pub outcome: String,
    pub guesses: String,
    pub attempts: i64,
    pub updated_at: i64,
}

impl SessionRow {
    pub fn from_session(session: &Session, updated_at: i64) -> Result<Self> {
        Ok(Self {
            player_id: session.player_id().to_string(),
            day: session.day().to_string(),
            secret: session.secret().to_string(),
            max_attempts: i64::from(session.max_attempts()),
            outcome: session.outcome().to_string(),
            guesses: serde_json::to_string(session.guesses())?,
            attempts: i64::from(session.attempts_used()),
            updated_at,
        })
    }

    pub fn into_session(self) -> Result<Session> {
        let corrupt = |what: String| AppError::Bootstrap(format!("session {}/{}: {what}", self.player_id, self.day));

        let day = NaiveDate::parse_from_str(&self.day, "%Y-%m-%d").map_err(|e| corrupt(e.to_string()))?;
        let secret = Symbol::parse(&self.secret).map_err(|e| corrupt(e.to_string()))?;
        let outcome: Outcome = self.outcome.parse().map_err(corrupt)?;
        let max_attempts = u32::try_from(self.max_attempts).map_err(|e| corrupt(e.to_string()))?;
        let guesses: Vec<GuessRecord> = serde_json::from_str(&self.guesses)?;

        Session::restore(self.player_id.clone(), day, secret, max_attempts, outcome, guesses).map_err(corrupt)
    }
}

/// Aggregates over one day's persisted sessions.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct DaySummaryRow {
    pub started: i64,
    pub won: i64,
    pub lost: i64,
    pub in_progress: i64,
    pub avg_guesses_won: Option<f64>,
}
