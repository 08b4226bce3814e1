use utoipa::OpenApi;

use crate::handlers;

/// OpenAPI document for the storefront API, served through Swagger UI at
/// `/docs`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = r#"
Backend for an e-commerce storefront: product catalog, carts, checkout
finalization, and order management.

## Authentication

An upstream gateway authenticates callers and forwards the subject on the
`x-user-id` header (plus `x-user-role` for administrative routes). Requests
without a forwarded identity are rejected with 401.

## Error Handling

Failures use a consistent envelope carrying a machine-readable `code`
alongside the human-readable message:

```json
{
  "error": "Conflict",
  "code": "already_finalized",
  "message": "Checkout ... is already finalized",
  "request_id": "req-abc123",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
"#
    ),
    paths(
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::carts::get_cart,
        handlers::carts::add_item,
        handlers::carts::update_quantity,
        handlers::carts::remove_item,
        handlers::carts::clear_cart,
        handlers::checkout::open_checkout,
        handlers::checkout::get_checkout,
        handlers::checkout::confirm_payment,
        handlers::checkout::finalize_checkout,
        handlers::orders::list_orders,
        handlers::orders::list_my_orders,
        handlers::orders::get_order,
        handlers::orders::update_order_status,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::ShippingAddress,
        crate::entities::PaymentDetails,
        crate::entities::PaymentMethod,
        crate::entities::PaymentStatus,
        crate::entities::OrderStatus,
        crate::services::checkouts::FinalizedOrder,
    )),
    tags(
        (name = "products", description = "Product catalog"),
        (name = "carts", description = "Shopping carts"),
        (name = "checkout", description = "Checkout lifecycle and finalization"),
        (name = "orders", description = "Orders and administrative transitions"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().expect("document serializes");
        assert!(json.contains("/api/v1/checkout/{id}/finalize"));
        assert!(json.contains("already_finalized") || json.contains("ErrorResponse"));
    }
}
