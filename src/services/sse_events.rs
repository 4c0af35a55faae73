use serde::Serialize;
use tracing::warn;

use crate::{
    dao::models::{ProductEntity, SaleEntity},
    dto::sse::{
        ProductUpdatedEvent, SaleCompletedEvent, ServerEvent, SessionEventPayload, SystemStatus,
    },
    services::ledger::{SessionEvent, SessionNotifier},
    state::SseHub,
};

const EVENT_SALE_COMPLETED: &str = "sale:completed";
const EVENT_PRODUCT_UPDATED: &str = "product:updated";
const EVENT_SYSTEM_STATUS: &str = "system:status";

impl SessionNotifier for SseHub {
    fn notify(&self, event: SessionEvent) {
        let payload = SessionEventPayload {
            barcode_id: event.balance.barcode_id.clone(),
            session: event.balance.into(),
        };
        send_event(self, event.kind.name(), &payload);
    }
}

/// Broadcast a freshly recorded sale.
pub fn broadcast_sale_completed(hub: &SseHub, sale: SaleEntity) {
    let payload = SaleCompletedEvent { sale: sale.into() };
    send_event(hub, EVENT_SALE_COMPLETED, &payload);
}

/// Broadcast a created or modified catalog entry.
pub fn broadcast_product_updated(hub: &SseHub, product: ProductEntity) {
    let payload = ProductUpdatedEvent {
        product: product.into(),
    };
    send_event(hub, EVENT_PRODUCT_UPDATED, &payload);
}

/// Broadcast whether the backend currently runs without storage.
pub fn broadcast_system_status(hub: &SseHub, degraded: bool) {
    send_event(hub, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_event<T: Serialize>(hub: &SseHub, event: &str, payload: &T) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(message) => hub.broadcast(message),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use serde_json::Value;

    use super::*;
    use crate::{
        dao::models::VisitorBalanceEntity,
        services::ledger::SessionEventKind,
    };

    #[tokio::test]
    async fn session_events_carry_barcode_and_session() {
        let hub = SseHub::new(8);
        let mut receiver = hub.subscribe();
        let balance = VisitorBalanceEntity::new("zx-01".into(), SystemTime::UNIX_EPOCH);

        hub.notify(SessionEvent {
            kind: SessionEventKind::Pause,
            balance,
        });

        let message = receiver.recv().await.unwrap();
        assert_eq!(message.event.as_deref(), Some("session:pause"));
        let data: Value = serde_json::from_str(&message.data).unwrap();
        assert_eq!(data["barcodeId"], "zx-01");
        assert_eq!(data["session"]["barcodeId"], "zx-01");
        assert_eq!(data["session"]["createdAt"], "1970-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn system_status_is_broadcast() {
        let hub = SseHub::new(8);
        let mut receiver = hub.subscribe();

        broadcast_system_status(&hub, true);

        let message = receiver.recv().await.unwrap();
        assert_eq!(message.event.as_deref(), Some("system:status"));
        assert_eq!(message.data, r#"{"degraded":true}"#);
    }
}
