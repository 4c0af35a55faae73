use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::VisitorBalanceEntity,
    dto::{format_system_time, validation::validate_barcode},
    services::ledger::{SessionSnapshot, SessionStatus},
};

/// Payload sent when a wristband is scanned at the entrance.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    #[validate(custom(function = "validate_barcode"))]
    pub barcode_id: String,
}

/// Payload used by operators to credit play time manually.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddTimeRequest {
    /// Seconds to add, from one second up to a year.
    #[validate(range(min = 1, max = 31_536_000))]
    pub seconds: u64,
}

/// Stored balance of a wristband.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub id: Uuid,
    pub barcode_id: String,
    pub total_allowed_seconds: i64,
    pub accumulated_seconds: i64,
    pub is_active: bool,
    /// RFC 3339 timestamp of the running span start.
    pub last_start_at: Option<String>,
    /// Advisory projection of when the balance runs out.
    pub expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<VisitorBalanceEntity> for SessionDto {
    fn from(balance: VisitorBalanceEntity) -> Self {
        Self {
            id: balance.id,
            barcode_id: balance.barcode_id,
            total_allowed_seconds: balance.total_allowed_seconds,
            accumulated_seconds: balance.accumulated_seconds,
            is_active: balance.is_active,
            last_start_at: balance.last_start_at.map(format_system_time),
            expires_at: balance.expires_at.map(format_system_time),
            created_at: format_system_time(balance.created_at),
            updated_at: format_system_time(balance.updated_at),
        }
    }
}

/// Balance together with the values derived from it when the request was served.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusDto {
    #[serde(flatten)]
    pub session: SessionDto,
    pub remaining_seconds: u64,
    pub remaining_minutes: u64,
    pub status: SessionStatus,
}

impl From<SessionSnapshot> for SessionStatusDto {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            session: snapshot.balance.into(),
            remaining_seconds: snapshot.remaining_seconds,
            remaining_minutes: snapshot.remaining_minutes,
            status: snapshot.status,
        }
    }
}

/// Response listing every wristband that still has time left.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActiveSessionsResponse {
    pub sessions: Vec<SessionStatusDto>,
}
