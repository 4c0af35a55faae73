use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    config::CatalogSeed,
    dao::{models::ProductEntity, storage::StorageResult, venue_store::VenueStore},
    dto::product::{CreateProductRequest, ProductDto, UpdateProductRequest},
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Products sorted by name; inactive entries only when asked for.
pub async fn list_products(
    state: &SharedState,
    include_inactive: bool,
) -> Result<Vec<ProductDto>, ServiceError> {
    let store = state.require_venue_store().await?;
    let mut products = store.list_products().await?;
    products.retain(|product| include_inactive || product.active);
    products.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(products.into_iter().map(ProductDto::from).collect())
}

/// Add an active product to the catalog.
pub async fn create_product(
    state: &SharedState,
    request: CreateProductRequest,
) -> Result<ProductDto, ServiceError> {
    let store = state.require_venue_store().await?;
    let now = state.clock().now();
    let product = ProductEntity {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        price_cents: request.price_cents,
        time_seconds: request.time_seconds,
        active: true,
        created_at: now,
        updated_at: now,
    };
    store.save_product(product.clone()).await?;
    info!(product_id = %product.id, name = %product.name, "product created");

    sse_events::broadcast_product_updated(state.sse(), product.clone());
    Ok(product.into())
}

/// Apply a partial update to an existing product.
pub async fn update_product(
    state: &SharedState,
    id: Uuid,
    request: UpdateProductRequest,
) -> Result<ProductDto, ServiceError> {
    let store = state.require_venue_store().await?;
    let mut product = store
        .find_product(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("product `{id}` not found")))?;

    if let Some(name) = request.name {
        product.name = name.trim().to_string();
    }
    if let Some(price_cents) = request.price_cents {
        product.price_cents = price_cents;
    }
    if let Some(time_seconds) = request.time_seconds {
        product.time_seconds = time_seconds;
    }
    if let Some(active) = request.active {
        product.active = active;
    }
    product.updated_at = state.clock().now();

    store.save_product(product.clone()).await?;
    info!(product_id = %product.id, active = product.active, "product updated");

    sse_events::broadcast_product_updated(state.sse(), product.clone());
    Ok(product.into())
}

/// Insert `seeds` when the catalog is empty. Returns how many products were written.
pub async fn seed_catalog(
    store: &dyn VenueStore,
    seeds: &[CatalogSeed],
    now: SystemTime,
) -> StorageResult<usize> {
    if !store.list_products().await?.is_empty() {
        return Ok(0);
    }

    for seed in seeds {
        store
            .save_product(ProductEntity {
                id: Uuid::new_v4(),
                name: seed.name.clone(),
                price_cents: seed.price_cents,
                time_seconds: seed.time_seconds,
                active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }
    if !seeds.is_empty() {
        info!(products = seeds.len(), "seeded empty product catalog");
    }
    Ok(seeds.len())
}
