mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, USER_ID_HEADER, USER_ROLE_HEADER};
use serde_json::{json, Value};
use uuid::Uuid;

fn checkout_body(product_id: Uuid) -> Value {
    json!({
        "items": [{
            "product_id": product_id,
            "name": "Linen Shirt",
            "unit_price": "100.00",
            "quantity": 2
        }],
        "shipping_address": {
            "address": "1 Main St",
            "city": "Springfield",
            "postal_code": "12345",
            "country": "US"
        },
        "payment_method": "Paypal",
        "total_price": "200.00"
    })
}

#[tokio::test]
async fn checkout_requires_forwarded_identity() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(Method::POST, "/api/v1/checkout", &[], Some(checkout_body(Uuid::new_v4())))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn admin_routes_reject_plain_customers() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4().to_string();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/products",
            &[(USER_ID_HEADER, user_id.as_str())],
            Some(json!({ "name": "Tee", "price": "10.00", "images": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn cart_error_mapping_over_http() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4().to_string();

    // No owner key at all
    let (status, body) = app.request(Method::GET, "/api/v1/carts", &[], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_owner");

    // Unknown product on add
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/carts/items",
            &[],
            Some(json!({
                "user_id": user_id,
                "product_id": Uuid::new_v4(),
                "quantity": 1
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "product_not_found");

    // Removing a line that is not there
    let uri = format!(
        "/api/v1/carts/items?user_id={}&product_id={}",
        user_id,
        Uuid::new_v4()
    );
    let (status, body) = app.request(Method::DELETE, &uri, &[], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "line_not_found");
}

#[tokio::test]
async fn full_storefront_flow_over_http() {
    let app = TestApp::new().await;
    let admin_id = Uuid::new_v4().to_string();
    let user_id = Uuid::new_v4().to_string();

    // Admin seeds the catalog.
    let (status, product) = app
        .request(
            Method::POST,
            "/api/v1/products",
            &[
                (USER_ID_HEADER, admin_id.as_str()),
                (USER_ROLE_HEADER, "admin"),
            ],
            Some(json!({
                "name": "Linen Shirt",
                "price": "100.00",
                "images": ["https://cdn.example.com/shirt.jpg"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id: Uuid = serde_json::from_value(product["id"].clone()).unwrap();

    // Customer fills the cart.
    let (status, cart) = app
        .request(
            Method::POST,
            "/api/v1/carts/items",
            &[],
            Some(json!({
                "user_id": user_id,
                "product_id": product_id,
                "quantity": 2
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);

    // Checkout opens from the snapshot.
    let (status, checkout) = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            &[(USER_ID_HEADER, user_id.as_str())],
            Some(checkout_body(product_id)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let checkout_id = checkout["checkout"]["id"].as_str().unwrap().to_string();

    // Gateway callback marks it paid.
    let (status, paid) = app
        .request(
            Method::PUT,
            &format!("/api/v1/checkout/{}/pay", checkout_id),
            &[(USER_ID_HEADER, user_id.as_str())],
            Some(json!({
                "payment_status": "Paid",
                "payment_details": {
                    "transactionId": "txn_1",
                    "paymentGateway": "paypal",
                    "status": "COMPLETED"
                }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["is_paid"], true);
    assert_eq!(paid["payment_status"], "paid");

    // Finalize converts it into an order.
    let (status, outcome) = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/{}/finalize", checkout_id),
            &[(USER_ID_HEADER, user_id.as_str())],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["status"], "Processing");
    assert_eq!(outcome["items_count"], 1);
    let order_id = outcome["order_id"].as_str().unwrap().to_string();

    // A second finalize conflicts.
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/checkout/{}/finalize", checkout_id),
            &[(USER_ID_HEADER, user_id.as_str())],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_finalized");

    // The cart is gone.
    let (status, cart) = app
        .request(
            Method::GET,
            &format!("/api/v1/carts?user_id={}", user_id),
            &[],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cart["items"].as_array().unwrap().is_empty());

    // The customer sees the order; the admin can move it along.
    let (status, order) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            &[(USER_ID_HEADER, user_id.as_str())],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["order"]["status"], "Processing");

    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", order_id),
            &[
                (USER_ID_HEADER, admin_id.as_str()),
                (USER_ROLE_HEADER, "admin"),
            ],
            Some(json!({ "status": "Delivered" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "Delivered");
    assert_eq!(updated["is_delivered"], true);
}

#[tokio::test]
async fn unknown_order_status_is_rejected_before_mutation() {
    let app = TestApp::new().await;
    let admin_id = Uuid::new_v4().to_string();

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", Uuid::new_v4()),
            &[
                (USER_ID_HEADER, admin_id.as_str()),
                (USER_ROLE_HEADER, "admin"),
            ],
            Some(json!({ "status": "Archived" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn error_envelope_echoes_request_id() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::GET,
            "/api/v1/carts",
            &[("x-request-id", "req-test-77")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["request_id"], "req-test-77");
}
