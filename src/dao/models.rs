use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::SystemTime;
use uuid::Uuid;

/// Time balance attached to a visitor wristband, stored once per barcode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitorBalanceEntity {
    /// Stable identifier for the balance record.
    pub id: Uuid,
    /// Canonical (trimmed, lowercase) barcode printed on the wristband.
    pub barcode_id: String,
    /// Seconds granted to the visitor so far. Only ever increases.
    pub total_allowed_seconds: i64,
    /// Seconds consumed by previous play spans, frozen every time the clock stops.
    pub accumulated_seconds: i64,
    /// Whether the play clock is currently running.
    pub is_active: bool,
    /// Instant the clock was last started; cleared when it stops.
    pub last_start_at: Option<SystemTime>,
    /// Informational projection of when the balance runs out. Never read back.
    pub expires_at: Option<SystemTime>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the record was written.
    pub updated_at: SystemTime,
}

impl VisitorBalanceEntity {
    /// Fresh record with zero counters and a stopped clock.
    pub fn new(barcode_id: String, now: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            barcode_id,
            total_allowed_seconds: 0,
            accumulated_seconds: 0,
            is_active: false,
            last_start_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Kind of mutation recorded in the action log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Checkin,
    Play,
    Pause,
    TimeAdded,
    AutoExpire,
}

/// Append-only audit entry written for every balance mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionLogEntity {
    /// Identifier of the log entry.
    pub id: Uuid,
    /// Balance record the action applies to.
    pub visitor_balance_id: Uuid,
    /// What happened.
    pub action: ActionKind,
    /// Free-form payload kept for auditing.
    pub data: Value,
    /// When the action was recorded.
    pub created_at: SystemTime,
}

impl ActionLogEntity {
    /// Build a log entry for `balance_id` stamped at `now`.
    pub fn new(balance_id: Uuid, action: ActionKind, data: Value, now: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            visitor_balance_id: balance_id,
            action,
            data,
            created_at: now,
        }
    }
}

/// Catalog entry sold at the counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductEntity {
    /// Stable identifier for the product.
    pub id: Uuid,
    /// Display name shown on the point-of-sale screen.
    pub name: String,
    /// Unit price in cents.
    pub price_cents: i64,
    /// Play time granted per unit; `None` for regular merchandise.
    pub time_seconds: Option<i64>,
    /// Inactive products stay in the catalog but cannot be sold.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the product was updated.
    pub updated_at: SystemTime,
}

/// One line of a recorded sale, with the product data frozen at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleLineEntity {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub time_seconds: Option<i64>,
}

/// Completed checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleEntity {
    /// Identifier of the sale.
    pub id: Uuid,
    /// Wristband the sale was attached to, if any.
    pub barcode_id: Option<String>,
    /// Purchased lines.
    pub lines: Vec<SaleLineEntity>,
    /// Sum of `unit_price_cents * quantity` over all lines.
    pub total_cents: i64,
    /// Play seconds credited to the wristband by this sale.
    pub granted_seconds: i64,
    /// When the sale was recorded.
    pub created_at: SystemTime,
}
