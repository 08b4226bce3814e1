use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AdminUser,
    errors::ServiceError,
    handlers::common::{created_response, success_response, validate_input},
    services::catalog::CreateProductInput,
    AppState, ListQuery, PaginatedResponse,
};

/// Creates the router for catalog endpoints
pub fn products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/{id}", get(get_product))
}

/// List catalog products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses((status = 200, description = "Paginated products")),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (products, total) = state
        .services
        .catalog
        .list_products(query.page, query.limit)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        products, total, &query,
    )))
}

/// Get a single product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    responses(
        (status = 200, description = "Product"),
        (status = 404, description = "No such product")
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(product))
}

/// Create a catalog product (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 403, description = "Caller is not an administrator")
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .create_product(CreateProductInput {
            name: payload.name,
            price: payload.price,
            images: payload.images,
        })
        .await?;
    Ok(created_response(product))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
}
