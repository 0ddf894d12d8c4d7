// HTTP API routes (formations, squads, ratings, queue status, replays).

pub mod ws;

use std::time::Duration;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::cards::CardCatalog;
use crate::formation::{all_formations, DEFAULT_FORMATION};
use crate::lobby::{LobbyError, MatchMode, MatchService};
use crate::metrics;
use crate::rating::RatingError;
use crate::squad::SquadError;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SetFormationRequest {
    pub formation: String,
}

#[derive(Deserialize)]
pub struct SetSlotRequest {
    pub card_id: String,
}

#[derive(Deserialize)]
pub struct AutoFillRequest {
    pub formation: Option<String>,
}

#[derive(Deserialize)]
pub struct ReplayRequest {
    pub scope: String,
    pub home: String,
    pub away: String,
    pub seed: u32,
}

#[derive(Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub matches: MatchService,
    pub reveal_interval: Duration,
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "error": msg })))
}

fn internal_error(e: impl std::fmt::Display) -> impl IntoResponse {
    tracing::error!("Database error: {e}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn squad_error(e: SquadError) -> axum::response::Response {
    let status = match &e {
        SquadError::Database(_) => None,
        SquadError::CardUnknown { .. } => Some(StatusCode::NOT_FOUND),
        SquadError::PlayerAlreadyFielded { .. } | SquadError::InsufficientDuplicates { .. } => {
            Some(StatusCode::CONFLICT)
        }
        SquadError::SlotInvalid { .. }
        | SquadError::CardNotOwned { .. }
        | SquadError::PositionMismatch { .. } => Some(StatusCode::BAD_REQUEST),
    };
    match status {
        Some(status) => json_error(status, &e.to_string()).into_response(),
        None => internal_error(e).into_response(),
    }
}

fn lobby_error(e: LobbyError) -> axum::response::Response {
    match e {
        LobbyError::IncompleteLineup { .. } => {
            json_error(StatusCode::CONFLICT, &e.to_string()).into_response()
        }
        LobbyError::Squad(inner) => squad_error(inner),
    }
}

fn rating_error(e: RatingError) -> axum::response::Response {
    match e {
        RatingError::SamePlayer(_) => {
            json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response()
        }
        RatingError::Database(inner) => internal_error(inner).into_response(),
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Catalog
        .route("/api/formations", get(list_formations))
        .route("/api/cards", get(list_cards))
        // Squads
        .route(
            "/api/squads/{scope}/{player}",
            get(get_squad).delete(clear_squad),
        )
        .route(
            "/api/squads/{scope}/{player}/formation",
            put(set_formation),
        )
        .route(
            "/api/squads/{scope}/{player}/slots/{slot}",
            put(set_slot).delete(remove_slot),
        )
        .route("/api/squads/{scope}/{player}/auto-fill", post(auto_fill))
        // Ratings
        .route("/api/ratings/{player}", get(get_rating))
        .route("/api/leaderboard", get(leaderboard))
        // Matches
        .route("/api/queue/status", get(queue_status))
        .route("/api/matches/replay", post(replay_match))
        // WebSocket
        .route("/ws/match", get(ws::ws_match))
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "matchday-backend" }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        metrics::gather_metrics(),
    )
}

// ── Catalog handlers ──────────────────────────────────────────────────

async fn list_formations() -> impl IntoResponse {
    Json(json!({
        "default": DEFAULT_FORMATION,
        "formations": all_formations(),
    }))
}

async fn list_cards(State(state): State<AppState>) -> impl IntoResponse {
    let cards = state.matches.squads().catalog().all();
    Json(json!(cards))
}

// ── Squad handlers ────────────────────────────────────────────────────

async fn get_squad(
    State(state): State<AppState>,
    Path((scope, player)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.matches.squads().hydrate(&scope, &player).await {
        Ok(lineup) => (
            StatusCode::OK,
            Json(json!({
                "lineup": lineup,
                "complete": lineup.is_complete(),
            })),
        )
            .into_response(),
        Err(e) => squad_error(e),
    }
}

async fn set_formation(
    State(state): State<AppState>,
    Path((scope, player)): Path<(String, String)>,
    Json(req): Json<SetFormationRequest>,
) -> impl IntoResponse {
    let squads = state.matches.squads();
    if let Err(e) = squads.set_formation(&scope, &player, &req.formation).await {
        return squad_error(e);
    }
    match squads.hydrate(&scope, &player).await {
        Ok(lineup) => (StatusCode::OK, Json(json!(lineup))).into_response(),
        Err(e) => squad_error(e),
    }
}

async fn set_slot(
    State(state): State<AppState>,
    Path((scope, player, slot)): Path<(String, String, String)>,
    Json(req): Json<SetSlotRequest>,
) -> impl IntoResponse {
    let squads = state.matches.squads();
    if let Err(e) = squads.set_slot(&scope, &player, &slot, &req.card_id).await {
        return squad_error(e);
    }
    match squads.hydrate(&scope, &player).await {
        Ok(lineup) => (StatusCode::OK, Json(json!(lineup))).into_response(),
        Err(e) => squad_error(e),
    }
}

async fn remove_slot(
    State(state): State<AppState>,
    Path((scope, player, slot)): Path<(String, String, String)>,
) -> impl IntoResponse {
    match state.matches.squads().remove_slot(&scope, &player, &slot).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => squad_error(e),
    }
}

async fn clear_squad(
    State(state): State<AppState>,
    Path((scope, player)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.matches.squads().clear_squad(&scope, &player).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => squad_error(e),
    }
}

async fn auto_fill(
    State(state): State<AppState>,
    Path((scope, player)): Path<(String, String)>,
    Json(req): Json<AutoFillRequest>,
) -> impl IntoResponse {
    let formation = req.formation.as_deref().unwrap_or(DEFAULT_FORMATION);
    match state.matches.squads().auto_fill(&scope, &player, formation).await {
        Ok(lineup) => (
            StatusCode::OK,
            Json(json!({
                "lineup": lineup,
                "complete": lineup.is_complete(),
            })),
        )
            .into_response(),
        Err(e) => squad_error(e),
    }
}

// ── Rating handlers ───────────────────────────────────────────────────

async fn get_rating(
    State(state): State<AppState>,
    Path(player): Path<String>,
) -> impl IntoResponse {
    match state.matches.ratings().profile(&player).await {
        Ok(profile) => (StatusCode::OK, Json(json!(profile))).into_response(),
        Err(e) => rating_error(e),
    }
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(20);
    match state.matches.ratings().leaderboard(limit).await {
        Ok(rows) => (StatusCode::OK, Json(json!(rows))).into_response(),
        Err(e) => rating_error(e),
    }
}

// ── Match handlers ────────────────────────────────────────────────────

async fn queue_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "timeout_secs": state.matches.queue().timeout().as_secs(),
        "queues": state.matches.queue().status(),
    }))
}

/// Re-run a match from its seed against the current lineups. Never rated.
async fn replay_match(
    State(state): State<AppState>,
    Json(req): Json<ReplayRequest>,
) -> impl IntoResponse {
    match state
        .matches
        .play_seeded(&req.scope, MatchMode::Friendly, &req.home, &req.away, req.seed)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(json!(report.result))).into_response(),
        Err(e) => lobby_error(e),
    }
}
