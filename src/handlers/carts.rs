use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    handlers::common::{success_response, validate_input},
    services::carts::{AddItemInput, CartOwner, RemoveItemInput, UpdateQuantityInput},
    AppState,
};

/// Creates the router for cart endpoints.
///
/// Guest carts carry no authenticated identity, so the owner key travels in
/// the request itself rather than in an auth extractor.
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route(
            "/items",
            post(add_item).put(update_quantity).delete(remove_item),
        )
        .route("/clear", post(clear_cart))
}

/// Get the owner's cart, creating an empty one when absent
#[utoipa::path(
    get,
    path = "/api/v1/carts",
    params(OwnerQuery),
    responses(
        (status = 200, description = "Cart with items"),
        (status = 400, description = "Neither user_id nor guest_id supplied")
    ),
    tag = "carts"
)]
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = CartOwner::from_parts(query.user_id, query.guest_id)?;
    let cart = state.services.carts.get_cart(&owner).await?;
    Ok(success_response(cart))
}

/// Add an item to the cart, merging equal (product, size, color) lines
#[utoipa::path(
    post,
    path = "/api/v1/carts/items",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart"),
        (status = 400, description = "Invalid owner or quantity"),
        (status = 404, description = "Product not in catalog")
    ),
    tag = "carts"
)]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let owner = CartOwner::from_parts(payload.user_id, payload.guest_id)?;

    let cart = state
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: payload.product_id,
                quantity: payload.quantity,
                size: payload.size,
                color: payload.color,
            },
        )
        .await?;
    Ok(success_response(cart))
}

/// Set a line's quantity outright; zero removes the line
#[utoipa::path(
    put,
    path = "/api/v1/carts/items",
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Updated cart"),
        (status = 404, description = "No matching line")
    ),
    tag = "carts"
)]
pub async fn update_quantity(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = CartOwner::from_parts(payload.user_id, payload.guest_id)?;

    let cart = state
        .services
        .carts
        .update_quantity(
            &owner,
            UpdateQuantityInput {
                product_id: payload.product_id,
                quantity: payload.quantity,
                size: payload.size,
                color: payload.color,
            },
        )
        .await?;
    Ok(success_response(cart))
}

/// Remove the matching line from the cart
#[utoipa::path(
    delete,
    path = "/api/v1/carts/items",
    params(RemoveItemQuery),
    responses(
        (status = 200, description = "Updated cart"),
        (status = 404, description = "No matching line")
    ),
    tag = "carts"
)]
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RemoveItemQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = CartOwner::from_parts(query.user_id, query.guest_id)?;

    let cart = state
        .services
        .carts
        .remove_item(
            &owner,
            RemoveItemInput {
                product_id: query.product_id,
                size: query.size,
                color: query.color,
            },
        )
        .await?;
    Ok(success_response(cart))
}

/// Empty the cart and zero its total
#[utoipa::path(
    post,
    path = "/api/v1/carts/clear",
    params(OwnerQuery),
    responses((status = 200, description = "Cleared cart")),
    tag = "carts"
)]
pub async fn clear_cart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = CartOwner::from_parts(query.user_id, query.guest_id)?;
    let cart = state.services.carts.clear(&owner).await?;
    Ok(success_response(cart))
}

// Request DTOs

#[derive(Debug, Deserialize, IntoParams)]
pub struct OwnerQuery {
    pub user_id: Option<Uuid>,
    pub guest_id: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddItemRequest {
    pub user_id: Option<Uuid>,
    pub guest_id: Option<String>,
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub user_id: Option<Uuid>,
    pub guest_id: Option<String>,
    pub product_id: Uuid,
    /// Absolute quantity; zero or less removes the line.
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RemoveItemQuery {
    pub user_id: Option<Uuid>,
    pub guest_id: Option<String>,
    pub product_id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
}
