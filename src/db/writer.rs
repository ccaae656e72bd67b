use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::api::health::HealthState;
use crate::db::models::SessionRow;
use crate::error::Result;
use crate::session::Session;

/// Receives session snapshots from the store and upserts them into SQLite.
/// Runs as a dedicated background task so requests never wait on disk.
pub struct DbWriter {
    pool: sqlx::SqlitePool,
    session_rx: mpsc::Receiver<Session>,
    health: Arc<HealthState>,
}

impl DbWriter {
    pub fn new(pool: sqlx::SqlitePool, session_rx: mpsc::Receiver<Session>, health: Arc<HealthState>) -> Self {
        Self { pool, session_rx, health }
    }

    pub async fn run(mut self) {
        while let Some(session) = self.session_rx.recv().await {
            if let Err(e) = upsert_session(&self.pool, &session).await {
                self.health.inc_db_write_errors();
                error!(player_id = %session.player_id(), day = %session.day(), "DB write error: {e}");
            }
        }
        debug!("Session channel closed, DB writer exiting");
    }
}

pub async fn upsert_session(pool: &sqlx::SqlitePool, session: &Session) -> Result<()> {
    let row = SessionRow::from_session(session, now_ns() as i64)?;

    sqlx::query(
        r#"
        INSERT INTO sessions (player_id, day, secret, max_attempts, outcome, guesses, attempts, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (player_id, day) DO UPDATE SET
            outcome    = excluded.outcome,
            guesses    = excluded.guesses,
            attempts   = excluded.attempts,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&row.player_id)
    .bind(&row.day)
    .bind(&row.secret)
    .bind(row.max_attempts)
    .bind(&row.outcome)
    .bind(&row.guesses)
    .bind(row.attempts)
    .bind(row.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
