mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::{
    entities::OrderStatus,
    errors::ServiceError,
    services::checkouts::{CheckoutItemInput, ConfirmPaymentInput, OpenCheckoutInput},
};
use storefront_api::entities::{PaymentMethod, ShippingAddress};
use uuid::Uuid;

async fn finalized_order(app: &TestApp, user_id: Uuid) -> Uuid {
    let product_id = app.seed_product("Tee", dec!(30.00), json!([])).await;
    let checkouts = &app.state.services.checkouts;

    let opened = checkouts
        .open(
            user_id,
            OpenCheckoutInput {
                items: vec![CheckoutItemInput {
                    product_id,
                    name: "Tee".to_string(),
                    image: None,
                    unit_price: dec!(30.00),
                    quantity: 1,
                    size: None,
                    color: None,
                }],
                shipping_address: ShippingAddress {
                    address: "1 Main St".to_string(),
                    city: "Springfield".to_string(),
                    postal_code: "12345".to_string(),
                    country: "US".to_string(),
                },
                payment_method: PaymentMethod::CreditCard,
                total_price: dec!(30.00),
            },
        )
        .await
        .unwrap();
    checkouts
        .confirm_payment(
            opened.checkout.id,
            user_id,
            ConfirmPaymentInput {
                payment_status: "paid".to_string(),
                payment_details: None,
            },
        )
        .await
        .unwrap();
    checkouts
        .finalize(opened.checkout.id, user_id)
        .await
        .unwrap()
        .order_id
}

#[tokio::test]
async fn set_status_on_missing_order_is_not_found() {
    let app = TestApp::new().await;
    let err = app
        .state
        .services
        .orders
        .set_status(Uuid::new_v4(), OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn set_status_updates_status_only() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let order_id = finalized_order(&app, user_id).await;

    let updated = app
        .state
        .services
        .orders
        .set_status(order_id, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert!(!updated.is_delivered);
    assert!(updated.delivered_at.is_none());
}

#[tokio::test]
async fn delivered_sets_delivery_stamp_once() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let order_id = finalized_order(&app, user_id).await;
    let orders = &app.state.services.orders;

    let delivered = orders
        .set_status(order_id, OrderStatus::Delivered)
        .await
        .unwrap();
    assert!(delivered.is_delivered);
    let first_stamp = delivered.delivered_at.expect("delivered_at set");

    // A repeated Delivered transition keeps the original stamp.
    let again = orders
        .set_status(order_id, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(again.delivered_at, Some(first_stamp));
}

#[tokio::test]
async fn user_listing_and_ownership_guard() {
    let app = TestApp::new().await;
    let user_id = Uuid::new_v4();
    let order_id = finalized_order(&app, user_id).await;
    let orders = &app.state.services.orders;

    let (mine, total) = orders.list_orders_for_user(user_id, 1, 20).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(mine[0].id, order_id);

    let (other, total) = orders
        .list_orders_for_user(Uuid::new_v4(), 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert!(other.is_empty());

    let err = orders
        .get_order_for_user(order_id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}
