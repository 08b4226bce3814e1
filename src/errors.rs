use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

fn current_request_id() -> Option<String> {
    crate::request_id::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error envelope returned to HTTP callers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Machine-readable failure kind (e.g., "line_not_found")
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No matching line in cart: {0}")]
    LineNotFound(String),

    #[error("Invalid cart owner: {0}")]
    InvalidOwner(String),

    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Unknown products in checkout: {0}")]
    UnknownProduct(String),

    #[error("Checkout has no items")]
    EmptyCheckout,

    #[error("Invalid line items: {0}")]
    InvalidLineItem(String),

    #[error("Invalid payment status: {0}")]
    InvalidPaymentStatus(String),

    #[error("Checkout {0} is already finalized")]
    AlreadyFinalized(Uuid),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl ServiceError {
    /// Machine-readable failure kind, stable across message wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::LineNotFound(_) => "line_not_found",
            Self::InvalidOwner(_) => "invalid_owner",
            Self::ProductNotFound(_) => "product_not_found",
            Self::UnknownProduct(_) => "unknown_product",
            Self::EmptyCheckout => "empty_checkout",
            Self::InvalidLineItem(_) => "invalid_line_item",
            Self::InvalidPaymentStatus(_) => "invalid_payment_status",
            Self::AlreadyFinalized(_) => "already_finalized",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Validation(_) => "validation_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::LineNotFound(_) | Self::ProductNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::InvalidOwner(_)
            | Self::UnknownProduct(_)
            | Self::EmptyCheckout
            | Self::InvalidLineItem(_)
            | Self::InvalidPaymentStatus(_)
            | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyFinalized(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message suitable for HTTP responses. Infrastructure failures collapse
    /// to a generic message so no internal detail leaks.
    pub fn response_message(&self) -> String {
        match self {
            Self::Database(_) => "Database error".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.kind().to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
