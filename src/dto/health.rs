use serde::Serialize;
use utoipa::ToSchema;

const STATUS_OK: &str = "ok";
const STATUS_DEGRADED: &str = "degraded";

/// Body returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while the storage backend is unreachable.
    pub status: String,
}

impl HealthResponse {
    /// Pick the status matching the degraded flag.
    pub fn for_degraded(degraded: bool) -> Self {
        let status = if degraded { STATUS_DEGRADED } else { STATUS_OK };
        Self {
            status: status.to_string(),
        }
    }
}
