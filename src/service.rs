//! Game orchestration: validate, resolve attributes, compare, advance the
//! session, persist. The secret ticker only leaves this module inside a
//! `TerminalResult`.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::{HintThresholds, MAX_PLAYER_ID_LEN};
use crate::daily::{Clock, DailyTickerPicker};
use crate::error::{GameError, GameResult};
use crate::fetcher::AttributeSource;
use crate::hints;
use crate::session::{GuessOutcome, Session};
use crate::state::{SessionKey, SessionStore};
use crate::types::{AttributeSnapshot, Outcome, Symbol, TerminalResult};

#[derive(Debug, Clone, Copy)]
pub struct GameSettings {
    pub max_attempts: u32,
    pub hint_thresholds: HintThresholds,
    pub lookup_timeout: Duration,
}

/// Result of `start`. Never carries the secret.
#[derive(Debug, Clone, PartialEq)]
pub struct StartOutcome {
    pub day: NaiveDate,
    pub max_attempts: u32,
    pub attempts_remaining: u32,
    pub outcome: Outcome,
    pub created: bool,
}

pub struct GameService<S> {
    store: Arc<SessionStore>,
    source: S,
    picker: DailyTickerPicker,
    clock: Box<dyn Clock>,
    settings: GameSettings,
    latency: Arc<LatencyStats>,
    health: Arc<HealthState>,
}

impl<S: AttributeSource> GameService<S> {
    pub fn new(
        store: Arc<SessionStore>,
        source: S,
        picker: DailyTickerPicker,
        clock: Box<dyn Clock>,
        settings: GameSettings,
        latency: Arc<LatencyStats>,
        health: Arc<HealthState>,
    ) -> Self {
        Self { store, source, picker, clock, settings, latency, health }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn hint_thresholds(&self) -> &HintThresholds {
        &self.settings.hint_thresholds
    }

    /// Create today's session for `player_id` if it does not exist yet.
    #[instrument(skip(self))]
    pub fn start(&self, player_id: &str) -> GameResult<StartOutcome> {
        let key = self.key(player_id)?;
        let day = key.day;
        let (session, created) = self.store.get_or_create(key, || {
            let secret = self.picker.pick(day);
            debug!(%day, secret = %secret, "Selected secret for new session");
            Session::new(player_id.trim(), day, secret, self.settings.max_attempts)
        });

        if created {
            info!(player_id, %day, "Session started");
        }

        Ok(StartOutcome {
            day,
            max_attempts: session.max_attempts(),
            attempts_remaining: session.attempts_remaining(),
            outcome: session.outcome(),
            created,
        })
    }

    /// Evaluate one guess against today's secret.
    #[instrument(skip(self))]
    pub async fn guess(&self, player_id: &str, raw_ticker: &str) -> GameResult<GuessOutcome> {
        let key = self.key(player_id)?;
        let session = self.store.get(&key).ok_or_else(|| no_session(&key))?;
        session.ensure_in_progress()?;

        let ticker = Symbol::parse(raw_ticker).map_err(|e| {
            debug!(raw_ticker, "Rejected malformed ticker: {e}");
            GameError::UnknownTicker(raw_ticker.trim().to_string())
        })?;

        let secret = session.secret().clone();
        let secret_attrs = self
            .resolve(&secret)
            .await?
            .ok_or_else(|| {
                warn!(day = %key.day, "Secret ticker did not resolve");
                GameError::DependencyUnavailable("secret attributes unavailable".to_string())
            })?;
        let guessed_attrs = if ticker == secret {
            secret_attrs
        } else {
            self.resolve(&ticker)
                .await?
                .ok_or_else(|| GameError::UnknownTicker(ticker.to_string()))?
        };

        let hints = hints::compare(&secret_attrs, &guessed_attrs)?;

        let outcome = self
            .store
            .update(&key, |s| s.submit_guess(ticker.clone(), hints))
            .ok_or_else(|| no_session(&key))??;

        info!(
            player_id = %key.player_id,
            day = %key.day,
            ticker = %ticker,
            attempts_remaining = outcome.attempts_remaining,
            outcome = %outcome.outcome,
            "Guess evaluated",
        );
        Ok(outcome)
    }

    /// Give up today's session. Idempotent on terminal sessions.
    #[instrument(skip(self))]
    pub fn end(&self, player_id: &str) -> GameResult<TerminalResult> {
        let key = self.key(player_id)?;
        self.store
            .update(&key, |s| Ok(s.end()))
            .ok_or_else(|| no_session(&key))?
    }

    /// Today's session for `player_id`. Callers must not expose the secret
    /// unless the session is terminal.
    pub fn session(&self, player_id: &str) -> GameResult<Session> {
        let key = self.key(player_id)?;
        self.store.get(&key).ok_or_else(|| no_session(&key))
    }

    fn key(&self, player_id: &str) -> GameResult<SessionKey> {
        let player_id = validate_player_id(player_id)?;
        Ok(SessionKey::new(player_id, self.today()))
    }

    /// Attribute lookup bounded by the configured timeout. Any failure maps to
    /// `DependencyUnavailable` and leaves session state alone.
    async fn resolve(&self, symbol: &Symbol) -> GameResult<Option<AttributeSnapshot>> {
        let started = Instant::now();
        let result = tokio::time::timeout(self.settings.lookup_timeout, self.source.lookup(symbol)).await;
        self.latency.record(started.elapsed());

        let resolved = match result {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(e)) => {
                warn!(%symbol, "Attribute lookup failed: {e}");
                Err(GameError::DependencyUnavailable(e.to_string()))
            }
            Err(_) => {
                warn!(%symbol, timeout_ms = self.settings.lookup_timeout.as_millis() as u64, "Attribute lookup timed out");
                Err(GameError::DependencyUnavailable("attribute lookup timed out".to_string()))
            }
        };
        self.health.record_lookup(resolved.is_ok(), now_ns());
        resolved
    }
}

fn validate_player_id(raw: &str) -> GameResult<&str> {
    let id = raw.trim();
    if id.is_empty() || id.len() > MAX_PLAYER_ID_LEN || id.chars().any(char::is_control) {
        return Err(GameError::InvalidPlayer);
    }
    Ok(id)
}

fn no_session(key: &SessionKey) -> GameError {
    GameError::NoSession { player_id: key.player_id.clone(), day: key.day }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
