//! HTTP routes.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use dicebound_domain::{Seat, SessionId};
use dicebound_shared::{
    AddBotResponse, CreateMatchRequest, GatewayConfigUpdate, GatewaySnapshot, JoinQueueRequest,
    JoinQueueResponse, LeaveQueueResponse, MatchListQuery, MatchSummary, QueueStatusResponse,
    SessionDto, TurnChoiceRequest,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{ApiError, Caller};
use crate::app::App;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        // Queue
        .route("/queue/join", post(join_queue))
        .route("/queue/leave", delete(leave_queue))
        .route("/queue/status", get(queue_status))
        // Matches
        .route("/matches", get(list_matches).post(create_match))
        .route("/matches/{id}", get(get_match))
        .route("/matches/{id}/add-bot", post(add_bot))
        .route("/matches/{id}/complete", post(complete_match))
        // Turn decider
        .route("/matches/{id}/turn-decider/begin", post(begin_turn_decider))
        .route("/matches/{id}/turn-decider/rolling", post(mark_rolling))
        .route("/matches/{id}/turn-decider/choice", post(submit_choice))
        .route("/matches/{id}/turn-decider/reset", post(reset_turn_decider))
        // Admin
        .route("/admin/gateway", get(gateway_snapshot))
        .route("/admin/gateway-config", put(update_gateway_config))
}

async fn health() -> &'static str {
    "OK"
}

// =============================================================================
// Queue
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaveParams {
    session_id: Option<Uuid>,
}

async fn join_queue(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Json(req): Json<JoinQueueRequest>,
) -> Result<Json<JoinQueueResponse>, ApiError> {
    let resp = app
        .use_cases
        .matchmaking
        .join
        .execute(&caller, req.game_mode)
        .await?;
    Ok(Json(resp))
}

async fn leave_queue(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Query(params): Query<LeaveParams>,
) -> Result<Json<LeaveQueueResponse>, ApiError> {
    let resp = app
        .use_cases
        .matchmaking
        .leave
        .execute(&caller, params.session_id.map(SessionId::from_uuid))
        .await?;
    Ok(Json(resp))
}

async fn queue_status(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
) -> Result<Json<QueueStatusResponse>, ApiError> {
    let resp = app.use_cases.matchmaking.status.execute(&caller).await?;
    Ok(Json(resp))
}

// =============================================================================
// Matches
// =============================================================================

async fn list_matches(
    State(app): State<Arc<App>>,
    Query(query): Query<MatchListQuery>,
) -> Result<Json<Vec<MatchSummary>>, ApiError> {
    let matches = app.use_cases.matchmaking.matches.list(query).await?;
    Ok(Json(matches))
}

async fn create_match(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Json(req): Json<CreateMatchRequest>,
) -> Result<Json<SessionDto>, ApiError> {
    let session = app
        .use_cases
        .matchmaking
        .matches
        .create(&caller, req.game_mode)
        .await?;
    Ok(Json(session))
}

async fn get_match(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDto>, ApiError> {
    let session = app
        .use_cases
        .matchmaking
        .matches
        .get(SessionId::from_uuid(id))
        .await?;
    Ok(Json(session))
}

async fn add_bot(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<AddBotResponse>, ApiError> {
    let resp = app
        .use_cases
        .matchmaking
        .add_bot
        .execute(&caller, SessionId::from_uuid(id))
        .await?;
    Ok(Json(resp))
}

async fn complete_match(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDto>, ApiError> {
    let session = app
        .use_cases
        .matchmaking
        .matches
        .complete(&caller, SessionId::from_uuid(id))
        .await?;
    Ok(Json(session))
}

// =============================================================================
// Turn decider
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ResetParams {
    seat: Option<Seat>,
}

async fn begin_turn_decider(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDto>, ApiError> {
    let session = app
        .use_cases
        .turn_decider
        .begin(&caller, SessionId::from_uuid(id))
        .await?;
    Ok(Json(session))
}

async fn mark_rolling(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDto>, ApiError> {
    let session = app
        .use_cases
        .turn_decider
        .mark_rolling(&caller, SessionId::from_uuid(id))
        .await?;
    Ok(Json(session))
}

async fn submit_choice(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<TurnChoiceRequest>,
) -> Result<Json<SessionDto>, ApiError> {
    let session = app
        .use_cases
        .turn_decider
        .submit_choice(&caller, SessionId::from_uuid(id), req.choice)
        .await?;
    Ok(Json(session))
}

async fn reset_turn_decider(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ResetParams>,
) -> Result<Json<SessionDto>, ApiError> {
    let session = app
        .use_cases
        .turn_decider
        .reset(SessionId::from_uuid(id), params.seat)
        .await?;
    Ok(Json(session))
}

// =============================================================================
// Admin
// =============================================================================

async fn gateway_snapshot(State(app): State<Arc<App>>) -> Json<GatewaySnapshot> {
    Json(app.gateway.snapshot())
}

async fn update_gateway_config(
    State(app): State<Arc<App>>,
    Json(update): Json<GatewayConfigUpdate>,
) -> Result<Json<GatewaySnapshot>, ApiError> {
    if let Some(endpoint) = update.endpoint_base.as_deref() {
        let trimmed = endpoint.trim();
        if !trimmed.is_empty() && !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ApiError::BadRequest(
                "endpointBase must be an http(s) URL".to_string(),
            ));
        }
    }
    app.gateway.config().apply_update(update);
    Ok(Json(app.gateway.snapshot()))
}
