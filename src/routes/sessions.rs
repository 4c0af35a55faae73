use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::session::{ActiveSessionsResponse, AddTimeRequest, CheckinRequest, SessionStatusDto},
    error::AppError,
    state::SharedState,
};

/// Wristband session endpoints used by the entrance and the play area.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions/checkin", post(checkin))
        .route("/sessions/active", get(list_active))
        .route("/sessions/{barcode_id}", get(get_status))
        .route("/sessions/{barcode_id}/play", post(play))
        .route("/sessions/{barcode_id}/pause", post(pause))
        .route("/sessions/{barcode_id}/time", post(add_time))
}

/// Register a wristband, creating an empty balance on first scan.
#[utoipa::path(
    post,
    path = "/sessions/checkin",
    tag = "sessions",
    request_body = CheckinRequest,
    responses(
        (status = 200, description = "Balance of the scanned wristband", body = SessionStatusDto),
        (status = 400, description = "Malformed barcode"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn checkin(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CheckinRequest>>,
) -> Result<Json<SessionStatusDto>, AppError> {
    let ledger = state.ledger().await?;
    let balance = ledger.get_or_create(&payload.barcode_id).await?;
    let snapshot = ledger.get_status(&balance.barcode_id).await?;
    Ok(Json(snapshot.into()))
}

/// List every wristband that still has time left.
#[utoipa::path(
    get,
    path = "/sessions/active",
    tag = "sessions",
    responses(
        (status = 200, description = "Sessions with remaining time", body = ActiveSessionsResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn list_active(
    State(state): State<SharedState>,
) -> Result<Json<ActiveSessionsResponse>, AppError> {
    let ledger = state.ledger().await?;
    let sessions = ledger
        .get_all_active()
        .await?
        .into_iter()
        .map(SessionStatusDto::from)
        .collect();
    Ok(Json(ActiveSessionsResponse { sessions }))
}

/// Current balance and status of a wristband. Expires a clock that ran out.
#[utoipa::path(
    get,
    path = "/sessions/{barcode_id}",
    tag = "sessions",
    params(("barcode_id" = String, Path, description = "Wristband barcode (case-insensitive)")),
    responses(
        (status = 200, description = "Balance and derived status", body = SessionStatusDto),
        (status = 404, description = "Unknown wristband")
    )
)]
pub async fn get_status(
    State(state): State<SharedState>,
    Path(barcode_id): Path<String>,
) -> Result<Json<SessionStatusDto>, AppError> {
    let ledger = state.ledger().await?;
    Ok(Json(ledger.status_with_expiry(&barcode_id).await?.into()))
}

/// Start the play clock.
#[utoipa::path(
    post,
    path = "/sessions/{barcode_id}/play",
    tag = "sessions",
    params(("barcode_id" = String, Path, description = "Wristband barcode (case-insensitive)")),
    responses(
        (status = 200, description = "Clock running", body = SessionStatusDto),
        (status = 409, description = "No time left on the wristband")
    )
)]
pub async fn play(
    State(state): State<SharedState>,
    Path(barcode_id): Path<String>,
) -> Result<Json<SessionStatusDto>, AppError> {
    let ledger = state.ledger().await?;
    let balance = ledger.play(&barcode_id).await?;
    Ok(Json(ledger.get_status(&balance.barcode_id).await?.into()))
}

/// Stop the play clock and bank the elapsed time.
#[utoipa::path(
    post,
    path = "/sessions/{barcode_id}/pause",
    tag = "sessions",
    params(("barcode_id" = String, Path, description = "Wristband barcode (case-insensitive)")),
    responses(
        (status = 200, description = "Clock stopped", body = SessionStatusDto),
        (status = 404, description = "Unknown wristband")
    )
)]
pub async fn pause(
    State(state): State<SharedState>,
    Path(barcode_id): Path<String>,
) -> Result<Json<SessionStatusDto>, AppError> {
    let ledger = state.ledger().await?;
    let balance = ledger.pause(&barcode_id).await?;
    Ok(Json(ledger.get_status(&balance.barcode_id).await?.into()))
}

/// Credit play time to a wristband, creating it when unknown.
#[utoipa::path(
    post,
    path = "/sessions/{barcode_id}/time",
    tag = "sessions",
    params(("barcode_id" = String, Path, description = "Wristband barcode (case-insensitive)")),
    request_body = AddTimeRequest,
    responses(
        (status = 200, description = "Updated balance", body = SessionStatusDto),
        (status = 400, description = "Seconds must be positive")
    )
)]
pub async fn add_time(
    State(state): State<SharedState>,
    Path(barcode_id): Path<String>,
    Valid(Json(payload)): Valid<Json<AddTimeRequest>>,
) -> Result<Json<SessionStatusDto>, AppError> {
    let ledger = state.ledger().await?;
    let balance = ledger.add_time(&barcode_id, payload.seconds).await?;
    Ok(Json(ledger.get_status(&balance.barcode_id).await?.into()))
}
