use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Zona Xtreme backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::event_stream,
        crate::routes::sessions::checkin,
        crate::routes::sessions::list_active,
        crate::routes::sessions::get_status,
        crate::routes::sessions::play,
        crate::routes::sessions::pause,
        crate::routes::sessions::add_time,
        crate::routes::products::list_products,
        crate::routes::products::create_product,
        crate::routes::products::update_product,
        crate::routes::checkout::checkout,
        crate::routes::dashboard::summary,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CheckinRequest,
            crate::dto::session::AddTimeRequest,
            crate::dto::session::SessionDto,
            crate::dto::session::SessionStatusDto,
            crate::dto::session::ActiveSessionsResponse,
            crate::services::ledger::SessionStatus,
            crate::dto::product::ProductDto,
            crate::dto::product::CreateProductRequest,
            crate::dto::product::UpdateProductRequest,
            crate::dto::product::ProductListResponse,
            crate::dto::checkout::CheckoutRequest,
            crate::dto::checkout::CheckoutItem,
            crate::dto::checkout::CheckoutResponse,
            crate::dto::checkout::SaleDto,
            crate::dto::checkout::SaleLineDto,
            crate::dto::dashboard::DashboardSummary,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::SessionEventPayload,
            crate::dto::sse::SaleCompletedEvent,
            crate::dto::sse::ProductUpdatedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events stream"),
        (name = "sessions", description = "Wristband time balances and play clock"),
        (name = "products", description = "Product catalog"),
        (name = "checkout", description = "Point of sale"),
        (name = "dashboard", description = "Operations counters"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/healthcheck",
            "/sse/events",
            "/sessions/checkin",
            "/sessions/active",
            "/sessions/{barcode_id}",
            "/sessions/{barcode_id}/play",
            "/sessions/{barcode_id}/pause",
            "/sessions/{barcode_id}/time",
            "/products",
            "/products/{id}",
            "/checkout",
            "/dashboard/summary",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
