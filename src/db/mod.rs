pub mod models;
pub mod writer;

use std::str::FromStr;

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, warn};

use crate::db::models::{DaySummaryRow, SessionRow};
use crate::error::Result;
use crate::session::Session;

pub use writer::DbWriter;

/// Open (creating if needed) the database file and apply migrations.
pub async fn connect(db_path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(4).connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {db_path}");
    Ok(pool)
}

/// Sessions persisted for `day`. Rows that fail to restore are skipped.
pub async fn load_sessions(pool: &SqlitePool, day: NaiveDate) -> Result<Vec<Session>> {
    let rows: Vec<SessionRow> = sqlx::query_as(
        r#"
        SELECT player_id, day, secret, max_attempts, outcome, guesses, attempts, updated_at
        FROM sessions
        WHERE day = ?
        "#,
    )
    .bind(day.to_string())
    .fetch_all(pool)
    .await?;

    let sessions = rows
        .into_iter()
        .filter_map(|row| match row.into_session() {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Skipping unreadable session row: {e}");
                None
            }
        })
        .collect();
    Ok(sessions)
}

pub async fn day_summary(pool: &SqlitePool, day: NaiveDate) -> Result<DaySummaryRow> {
    let summary: DaySummaryRow = sqlx::query_as(
        r#"
        SELECT COUNT(*)                                                  AS started,
               COALESCE(SUM(CASE WHEN outcome = 'won' THEN 1 ELSE 0 END), 0)         AS won,
               COALESCE(SUM(CASE WHEN outcome = 'lost' THEN 1 ELSE 0 END), 0)        AS lost,
               COALESCE(SUM(CASE WHEN outcome = 'in_progress' THEN 1 ELSE 0 END), 0) AS in_progress,
               AVG(CASE WHEN outcome = 'won' THEN CAST(attempts AS REAL) END)        AS avg_guesses_won
        FROM sessions
        WHERE day = ?
        "#,
    )
    .bind(day.to_string())
    .fetch_one(pool)
    .await?;
    Ok(summary)
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}
