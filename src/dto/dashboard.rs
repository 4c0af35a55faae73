use serde::Serialize;
use utoipa::ToSchema;

/// Live counters shown on the operations dashboard.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Wristbands with time left.
    pub active_sessions: usize,
    pub playing: usize,
    pub paused: usize,
    pub waiting: usize,
    pub total_remaining_seconds: u64,
    /// Sales recorded since UTC midnight.
    pub sales_today: usize,
    pub revenue_today_cents: i64,
    pub granted_seconds_today: i64,
    pub degraded: bool,
}
