use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::db;
use crate::error::{AppError, GameError};
use crate::fetcher::AttributeSource;
use crate::hints::{label_all, HintLabel};
use crate::service::GameService;
use crate::session::GuessOutcome;
use crate::state::SessionStore;
use crate::types::{Attribute, HintVector, Outcome, Symbol, TerminalResult};

pub struct ApiState<S> {
    pub service: Arc<GameService<S>>,
    pub store: Arc<SessionStore>,
    pub pool: sqlx::SqlitePool,
    pub latency: Arc<LatencyStats>,
    pub health: Arc<HealthState>,
}

impl<S> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            store: Arc::clone(&self.store),
            pool: self.pool.clone(),
            latency: Arc::clone(&self.latency),
            health: Arc::clone(&self.health),
        }
    }
}

pub fn router<S: AttributeSource + 'static>(state: ApiState<S>) -> Router {
    Router::new()
        .route("/start", post(post_start::<S>))
        .route("/guess", post(post_guess::<S>))
        .route("/end", post(post_end::<S>))
        .route("/session/:player_id", get(get_session::<S>))
        .route("/health", get(get_health::<S>))
        .route("/stats/summary", get(get_stats_summary::<S>))
        .route("/stats/latency", get(get_stats_latency::<S>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// JSON body whose rejections render as a `BAD_REQUEST` game error.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(GameError))]
pub struct ApiJson<T>(pub T);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    #[serde(default)]
    pub player_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    #[serde(default)]
    pub player_id: String,
    #[serde(default)]
    pub ticker: String,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub ok: bool,
    pub started: bool,
    pub day: NaiveDate,
    pub max_attempts: u32,
    pub attempts_remaining: u32,
    pub outcome: Outcome,
}

/// `status` tells the client whether to keep guessing.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PlayResponse {
    #[serde(rename_all = "camelCase")]
    Continue {
        hints: HintVector,
        labels: BTreeMap<Attribute, HintLabel>,
        attempts_remaining: u32,
    },
    #[serde(rename_all = "camelCase")]
    Finished {
        win: bool,
        total_guesses: u32,
        secret_ticker: Symbol,
    },
}

impl From<TerminalResult> for PlayResponse {
    fn from(r: TerminalResult) -> Self {
        PlayResponse::Finished {
            win: r.win,
            total_guesses: r.total_guesses,
            secret_ticker: r.secret_ticker,
        }
    }
}

#[derive(Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    fn ok(body: T) -> Json<Self> {
        Json(Self { ok: true, body })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessView {
    pub ticker: Symbol,
    pub attempt_index: u32,
    pub hints: HintVector,
    pub labels: BTreeMap<Attribute, HintLabel>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub ok: bool,
    pub day: NaiveDate,
    pub max_attempts: u32,
    pub attempts_remaining: u32,
    pub outcome: Outcome,
    pub guesses: Vec<GuessView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TerminalResult>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub quote_api_ok: bool,
    pub last_lookup_at_ns: u64,
    pub lookup_failures: u64,
    pub db_write_errors: u64,
    pub live_sessions: usize,
    pub in_progress: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub day: NaiveDate,
    pub started: i64,
    pub won: i64,
    pub lost: i64,
    pub in_progress: i64,
    pub avg_guesses_won: Option<f64>,
    pub win_rate: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn post_start<S: AttributeSource + 'static>(
    State(state): State<ApiState<S>>,
    ApiJson(req): ApiJson<PlayerRequest>,
) -> Result<Json<StartResponse>, GameError> {
    let started = state.service.start(&req.player_id)?;
    Ok(Json(StartResponse {
        ok: true,
        started: true,
        day: started.day,
        max_attempts: started.max_attempts,
        attempts_remaining: started.attempts_remaining,
        outcome: started.outcome,
    }))
}

async fn post_guess<S: AttributeSource + 'static>(
    State(state): State<ApiState<S>>,
    ApiJson(req): ApiJson<GuessRequest>,
) -> Result<Json<Envelope<PlayResponse>>, GameError> {
    let outcome = state.service.guess(&req.player_id, &req.ticker).await?;
    Ok(Envelope::ok(play_response(outcome, &state.service)))
}

async fn post_end<S: AttributeSource + 'static>(
    State(state): State<ApiState<S>>,
    ApiJson(req): ApiJson<PlayerRequest>,
) -> Result<Json<Envelope<PlayResponse>>, GameError> {
    let result = state.service.end(&req.player_id)?;
    Ok(Envelope::ok(result.into()))
}

async fn get_session<S: AttributeSource + 'static>(
    State(state): State<ApiState<S>>,
    Path(player_id): Path<String>,
) -> Result<Json<SessionView>, GameError> {
    let session = state.service.session(&player_id)?;
    let thresholds = state.service.hint_thresholds();

    let guesses = session
        .guesses()
        .iter()
        .map(|g| GuessView {
            ticker: g.ticker.clone(),
            attempt_index: g.attempt_index,
            labels: label_all(&g.hints, thresholds),
            hints: g.hints.clone(),
        })
        .collect();

    Ok(Json(SessionView {
        ok: true,
        day: session.day(),
        max_attempts: session.max_attempts(),
        attempts_remaining: session.attempts_remaining(),
        outcome: session.outcome(),
        guesses,
        result: session.terminal_result(),
    }))
}

async fn get_health<S: AttributeSource + 'static>(State(state): State<ApiState<S>>) -> Json<HealthResponse> {
    let h = &state.health;
    // No lookups yet counts as healthy.
    let quote_ok = h.last_lookup_at_ns() == 0 || h.quote_api_ok();
    Json(HealthResponse {
        status: if quote_ok && h.db_write_errors() == 0 { "ok" } else { "degraded" },
        quote_api_ok: quote_ok,
        last_lookup_at_ns: h.last_lookup_at_ns(),
        lookup_failures: h.lookup_failures(),
        db_write_errors: h.db_write_errors(),
        live_sessions: state.store.len(),
        in_progress: state.store.in_progress_count(),
    })
}

async fn get_stats_summary<S: AttributeSource + 'static>(
    State(state): State<ApiState<S>>,
) -> Result<Json<SummaryResponse>, AppError> {
    let day = state.service.today();
    let row = db::day_summary(&state.pool, day).await?;
    let finished = row.won + row.lost;
    let win_rate = (finished > 0).then(|| row.won as f64 / finished as f64);

    Ok(Json(SummaryResponse {
        day,
        started: row.started,
        won: row.won,
        lost: row.lost,
        in_progress: row.in_progress,
        avg_guesses_won: row.avg_guesses_won,
        win_rate,
    }))
}

async fn get_stats_latency<S: AttributeSource + 'static>(State(state): State<ApiState<S>>) -> Json<LatencyResponse> {
    let (p50_us, p95_us, p99_us) = state.latency.percentiles();
    Json(LatencyResponse { samples: state.latency.len(), p50_us, p95_us, p99_us })
}

fn play_response<S: AttributeSource>(outcome: GuessOutcome, service: &GameService<S>) -> PlayResponse {
    match outcome.terminal {
        Some(result) => result.into(),
        None => PlayResponse::Continue {
            labels: label_all(&outcome.hints, service.hint_thresholds()),
            hints: outcome.hints,
            attempts_remaining: outcome.attempts_remaining,
        },
    }
}
