use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{AdminUser, AuthenticatedUser},
    entities::OrderStatus,
    errors::ServiceError,
    handlers::common::success_response,
    AppState, ListQuery, PaginatedResponse,
};

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_orders))
        .route("/mine", get(list_my_orders))
        .route("/{id}", get(get_order))
        .route("/{id}/status", put(update_order_status))
}

/// List all orders (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Paginated orders"),
        (status = 403, description = "Caller is not an administrator")
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (orders, total) = state
        .services
        .orders
        .list_orders(query.page, query.limit)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        orders, total, &query,
    )))
}

/// List the caller's own orders
#[utoipa::path(
    get,
    path = "/api/v1/orders/mine",
    responses((status = 200, description = "Paginated orders")),
    tag = "orders"
)]
pub async fn list_my_orders(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (orders, total) = state
        .services
        .orders
        .list_orders_for_user(user.user_id, query.page, query.limit)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        orders, total, &query,
    )))
}

/// Get one of the caller's orders with its items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    responses(
        (status = 200, description = "Order with items"),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "No such order")
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .get_order_for_user(id, user.user_id)
        .await?;
    Ok(success_response(order))
}

/// Transition an order's status (admin only)
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated order"),
        (status = 400, description = "Status is not a known value"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "No such order")
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    // Validate against the enum before any mutation.
    let status = OrderStatus::from_str(&payload.status).map_err(|_| {
        ServiceError::Validation(format!(
            "invalid status '{}'; expected one of Processing, Shipped, Delivered, Cancelled, Returned",
            payload.status
        ))
    })?;

    let order = state.services.orders.set_status(id, status).await?;
    Ok(success_response(order))
}

// Request DTOs

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}
