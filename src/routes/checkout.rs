use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::checkout::{CheckoutRequest, CheckoutResponse},
    error::AppError,
    services::checkout_service,
    state::SharedState,
};

/// Point-of-sale endpoint.
pub fn router() -> Router<SharedState> {
    Router::new().route("/checkout", post(checkout))
}

/// Record a sale, crediting purchased play time to the given wristband.
#[utoipa::path(
    post,
    path = "/checkout",
    tag = "checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Sale recorded", body = CheckoutResponse),
        (status = 400, description = "Empty cart or play time sold without a wristband"),
        (status = 404, description = "Unknown or inactive product")
    )
)]
pub async fn checkout(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CheckoutRequest>>,
) -> Result<Json<CheckoutResponse>, AppError> {
    Ok(Json(checkout_service::checkout(&state, payload).await?))
}
