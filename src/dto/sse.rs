use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{checkout::SaleDto, product::ProductDto, session::SessionDto};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE channel.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast on `session:play`, `session:pause` and `session:updated`.
pub struct SessionEventPayload {
    pub barcode_id: String,
    pub session: SessionDto,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once a checkout has been recorded.
pub struct SaleCompletedEvent {
    pub sale: SaleDto,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a catalog entry is created or modified.
pub struct ProductUpdatedEvent {
    pub product: ProductDto,
}
