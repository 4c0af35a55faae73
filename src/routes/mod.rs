use axum::Router;

use crate::state::SharedState;

pub mod checkout;
pub mod dashboard;
pub mod docs;
pub mod health;
pub mod products;
pub mod sessions;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(sessions::router())
        .merge(products::router())
        .merge(checkout::router())
        .merge(dashboard::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
