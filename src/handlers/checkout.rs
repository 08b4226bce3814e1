use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthenticatedUser,
    entities::{PaymentMethod, ShippingAddress},
    errors::ServiceError,
    handlers::common::{created_response, success_response, validate_input},
    services::checkouts::{CheckoutItemInput, ConfirmPaymentInput, OpenCheckoutInput},
    AppState,
};

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(open_checkout))
        .route("/{id}", get(get_checkout))
        .route("/{id}/pay", put(confirm_payment))
        .route("/{id}/finalize", post(finalize_checkout))
}

/// Open a checkout from a snapshot of cart lines
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = OpenCheckoutRequest,
    responses(
        (status = 201, description = "Checkout record created"),
        (status = 400, description = "Invalid items, address, total, or unknown product"),
        (status = 401, description = "Missing caller identity")
    ),
    tag = "checkout"
)]
pub async fn open_checkout(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<OpenCheckoutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let input = OpenCheckoutInput {
        items: payload
            .items
            .into_iter()
            .map(|item| CheckoutItemInput {
                product_id: item.product_id,
                name: item.name,
                image: item.image,
                unit_price: item.unit_price,
                quantity: item.quantity,
                size: item.size,
                color: item.color,
            })
            .collect(),
        shipping_address: payload.shipping_address,
        payment_method: payload.payment_method,
        total_price: payload.total_price,
    };

    let checkout = state.services.checkouts.open(user.user_id, input).await?;
    Ok(created_response(checkout))
}

/// Get one of the caller's checkout records
#[utoipa::path(
    get,
    path = "/api/v1/checkout/{id}",
    responses(
        (status = 200, description = "Checkout with snapshot lines"),
        (status = 403, description = "Checkout belongs to another user"),
        (status = 404, description = "No such checkout")
    ),
    tag = "checkout"
)]
pub async fn get_checkout(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let checkout = state
        .services
        .checkouts
        .get_checkout_for_user(id, user.user_id)
        .await?;
    Ok(success_response(checkout))
}

/// Apply a payment-gateway result to the checkout
#[utoipa::path(
    put,
    path = "/api/v1/checkout/{id}/pay",
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Checkout marked paid"),
        (status = 400, description = "Status token not accepted"),
        (status = 403, description = "Checkout belongs to another user"),
        (status = 404, description = "No such checkout"),
        (status = 409, description = "Checkout already finalized")
    ),
    tag = "checkout"
)]
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let checkout = state
        .services
        .checkouts
        .confirm_payment(
            id,
            user.user_id,
            ConfirmPaymentInput {
                payment_status: payload.payment_status,
                payment_details: payload.payment_details,
            },
        )
        .await?;
    Ok(success_response(checkout))
}

/// Finalize a paid checkout into an order
#[utoipa::path(
    post,
    path = "/api/v1/checkout/{id}/finalize",
    responses(
        (status = 201, description = "Order created", body = crate::services::checkouts::FinalizedOrder),
        (status = 400, description = "Empty checkout or invalid line items"),
        (status = 403, description = "Checkout belongs to another user"),
        (status = 404, description = "No such checkout"),
        (status = 409, description = "Checkout already finalized")
    ),
    tag = "checkout"
)]
pub async fn finalize_checkout(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.checkouts.finalize(id, user.user_id).await?;
    Ok(created_response(order))
}

// Request DTOs

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CheckoutItemRequest {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OpenCheckoutRequest {
    #[validate(length(min = 1, message = "at least one item is required"))]
    pub items: Vec<CheckoutItemRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub total_price: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmPaymentRequest {
    pub payment_status: String,
    #[schema(value_type = Object)]
    pub payment_details: Option<serde_json::Value>,
}
