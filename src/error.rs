use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::types::{Attribute, TerminalResult};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Quote API error: {0}")]
    QuoteApi(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bootstrap error: {0}")]
    Bootstrap(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        error!("Request failed: {self}");
        let body = Json(json!({
            "ok": false,
            "error": { "code": "INTERNAL", "message": "internal error" },
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Player-facing failures of the game operations. Every variant is local to one
/// (player, day) session and leaves other sessions untouched.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid or unresolvable symbol. The attempt is not consumed.
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    /// The session is terminal; carries its result so callers can re-render it.
    #[error("Session already finished")]
    SessionAlreadyFinished(TerminalResult),

    /// The secret's snapshot cannot be compared against (zero, negative, non-finite).
    #[error("Invalid attribute {attribute}: {reason}")]
    InvalidAttribute { attribute: Attribute, reason: String },

    /// Attribute lookup failed or timed out. Session state is unchanged.
    #[error("Attribute lookup unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("No session for player {player_id} on {day}")]
    NoSession { player_id: String, day: NaiveDate },

    #[error("Invalid player id")]
    InvalidPlayer,

    /// Request body missing, not JSON, or of the wrong shape.
    #[error("Malformed request: {0}")]
    BadRequest(String),
}

impl GameError {
    pub fn code(&self) -> &'static str {
        match self {
            GameError::UnknownTicker(_) => "UNKNOWN_TICKER",
            GameError::SessionAlreadyFinished(_) => "SESSION_ALREADY_FINISHED",
            GameError::InvalidAttribute { .. } => "INTERNAL",
            GameError::DependencyUnavailable(_) => "DEPENDENCY_UNAVAILABLE",
            GameError::NoSession { .. } => "NO_SESSION",
            GameError::InvalidPlayer => "INVALID_PLAYER",
            GameError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GameError::UnknownTicker(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GameError::SessionAlreadyFinished(_) => StatusCode::CONFLICT,
            GameError::InvalidAttribute { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GameError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GameError::NoSession { .. } => StatusCode::NOT_FOUND,
            GameError::InvalidPlayer | GameError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

pub type GameResult<T> = std::result::Result<T, GameError>;

impl From<JsonRejection> for GameError {
    fn from(rejection: JsonRejection) -> Self {
        GameError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            // Details stay in the log; they may describe the secret's data.
            GameError::InvalidAttribute { .. } => {
                error!("Session failed on corrupt attribute data: {self}");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "ok": false,
            "error": { "code": self.code(), "message": message },
        });
        if let GameError::SessionAlreadyFinished(result) = &self {
            body["result"] = json!(result);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;

    #[test]
    fn codes_and_statuses() {
        let unknown = GameError::UnknownTicker("ZZZZ".into());
        assert_eq!(unknown.code(), "UNKNOWN_TICKER");
        assert_eq!(unknown.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let corrupt = GameError::InvalidAttribute {
            attribute: Attribute::Price,
            reason: "secret value is zero".into(),
        };
        assert_eq!(corrupt.code(), "INTERNAL");
        assert_eq!(corrupt.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let down = GameError::DependencyUnavailable("timeout".into());
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);

        let malformed = GameError::BadRequest("expected a string".into());
        assert_eq!(malformed.code(), "BAD_REQUEST");
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn finished_error_displays_without_secret() {
        let err = GameError::SessionAlreadyFinished(TerminalResult {
            win: false,
            total_guesses: 5,
            secret_ticker: Symbol::parse("AAPL").unwrap(),
        });
        assert_eq!(err.to_string(), "Session already finished");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
