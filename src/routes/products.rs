use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::product::{
        CreateProductRequest, ProductDto, ProductListQuery, ProductListResponse,
        UpdateProductRequest,
    },
    error::AppError,
    services::catalog_service,
    state::SharedState,
};

/// Catalog management endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", put(update_product))
}

/// List catalog entries sorted by name.
#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    params(ProductListQuery),
    responses((status = 200, description = "Catalog entries", body = ProductListResponse))
)]
pub async fn list_products(
    State(state): State<SharedState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ProductListResponse>, AppError> {
    let products = catalog_service::list_products(&state, query.include_inactive).await?;
    Ok(Json(ProductListResponse { products }))
}

/// Add a product to the catalog.
#[utoipa::path(
    post,
    path = "/products",
    tag = "products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductDto),
        (status = 400, description = "Invalid product definition")
    )
)]
pub async fn create_product(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateProductRequest>>,
) -> Result<(StatusCode, Json<ProductDto>), AppError> {
    let product = catalog_service::create_product(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update name, price, play time or availability of a product.
#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product identifier")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductDto),
        (status = 404, description = "Unknown product")
    )
)]
pub async fn update_product(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<UpdateProductRequest>>,
) -> Result<Json<ProductDto>, AppError> {
    Ok(Json(
        catalog_service::update_product(&state, id, payload).await?,
    ))
}
