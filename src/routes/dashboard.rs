use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::dashboard::DashboardSummary, error::AppError, services::dashboard_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/dashboard/summary",
    tag = "dashboard",
    responses(
        (status = 200, description = "Live counters", body = DashboardSummary),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Live session and sales counters for the operations screen.
pub async fn summary(State(state): State<SharedState>) -> Result<Json<DashboardSummary>, AppError> {
    Ok(Json(dashboard_service::summary(&state).await?))
}

/// Configure the dashboard routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/dashboard/summary", get(summary))
}
