use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        cart, cart_item, checkout, checkout_item, order, order_item, Cart, CartItem, Checkout,
        CheckoutItem, CheckoutItemModel, CheckoutModel, OrderStatus, PaymentMethod, PaymentStatus,
        Product, ProductModel, ShippingAddress,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog::ProductCatalogService,
    services::payments,
};

const MAX_LINE_QUANTITY: i32 = 1000;

/// Checkout lifecycle service: opens checkout records from cart snapshots,
/// applies payment confirmations, and finalizes paid checkouts into orders.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    catalog: Arc<ProductCatalogService>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        catalog: Arc<ProductCatalogService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            catalog,
        }
    }

    /// Opens a checkout from a snapshot of cart lines.
    ///
    /// The snapshot is independent from this point on: later cart mutations
    /// do not affect the record.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn open(
        &self,
        user_id: Uuid,
        input: OpenCheckoutInput,
    ) -> Result<CheckoutWithItems, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::EmptyCheckout);
        }
        for item in &input.items {
            if item.quantity < 1 {
                return Err(ServiceError::InvalidLineItem(format!(
                    "item {}: quantity must be positive",
                    item.product_id
                )));
            }
        }
        if !input.shipping_address.is_complete() {
            return Err(ServiceError::Validation(
                "complete shipping address is required".to_string(),
            ));
        }
        if input.total_price <= Decimal::ZERO {
            return Err(ServiceError::Validation(
                "total price must be greater than zero".to_string(),
            ));
        }

        // Every distinct product referenced by the snapshot must exist.
        let requested: BTreeSet<Uuid> = input.items.iter().map(|item| item.product_id).collect();
        let requested: Vec<Uuid> = requested.into_iter().collect();
        let resolved = self.catalog.find_by_ids(&requested).await?;
        if resolved.len() != requested.len() {
            let found: BTreeSet<Uuid> = resolved.iter().map(|p| p.id).collect();
            let missing: Vec<String> = requested
                .iter()
                .filter(|id| !found.contains(id))
                .map(Uuid::to_string)
                .collect();
            return Err(ServiceError::UnknownProduct(missing.join(", ")));
        }

        let txn = self.db.begin().await?;

        let checkout = checkout::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            shipping_address: Set(input.shipping_address),
            payment_method: Set(input.payment_method),
            total_price: Set(input.total_price),
            is_paid: Set(false),
            paid_at: Set(None),
            payment_status: Set(PaymentStatus::Pending),
            payment_details: Set(None),
            is_finalized: Set(false),
            finalized_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let checkout = checkout.insert(&txn).await?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in input.items {
            let row = checkout_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                checkout_id: Set(checkout.id),
                product_id: Set(item.product_id),
                name: Set(item.name),
                image: Set(item.image),
                unit_price: Set(item.unit_price),
                quantity: Set(item.quantity),
                size: Set(item.size),
                color: Set(item.color),
            };
            items.push(row.insert(&txn).await?);
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CheckoutOpened {
                checkout_id: checkout.id,
                user_id,
            })
            .await;

        info!("Checkout {} opened for user {}", checkout.id, user_id);
        Ok(CheckoutWithItems { checkout, items })
    }

    /// The caller's own checkout record with its snapshot lines.
    #[instrument(skip(self))]
    pub async fn get_checkout_for_user(
        &self,
        checkout_id: Uuid,
        caller_user_id: Uuid,
    ) -> Result<CheckoutWithItems, ServiceError> {
        let checkout = Checkout::find_by_id(checkout_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Checkout {} not found", checkout_id)))?;

        if checkout.user_id != caller_user_id {
            return Err(ServiceError::Forbidden(
                "not authorized to access this checkout".to_string(),
            ));
        }

        let items = CheckoutItem::find()
            .filter(checkout_item::Column::CheckoutId.eq(checkout_id))
            .all(&*self.db)
            .await?;
        Ok(CheckoutWithItems { checkout, items })
    }

    /// Applies a payment-gateway result to a checkout.
    ///
    /// The payload is normalized into the canonical detail shape before any
    /// decision is made; a rejected status leaves the record untouched.
    #[instrument(skip(self, input), fields(checkout_id = %checkout_id))]
    pub async fn confirm_payment(
        &self,
        checkout_id: Uuid,
        caller_user_id: Uuid,
        input: ConfirmPaymentInput,
    ) -> Result<CheckoutModel, ServiceError> {
        let checkout = Checkout::find_by_id(checkout_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Checkout {} not found", checkout_id)))?;

        if checkout.user_id != caller_user_id {
            return Err(ServiceError::Forbidden(
                "not authorized to update this checkout".to_string(),
            ));
        }
        if checkout.is_finalized {
            return Err(ServiceError::AlreadyFinalized(checkout_id));
        }

        let details = input
            .payment_details
            .as_ref()
            .map(payments::normalize)
            .unwrap_or_default();

        if !payments::is_approved(&input.payment_status, &details) {
            return Err(ServiceError::InvalidPaymentStatus(input.payment_status));
        }

        let transaction_id = details.transaction_id.clone();
        let mut active: checkout::ActiveModel = checkout.into();
        active.is_paid = Set(true);
        active.payment_status = Set(PaymentStatus::Paid);
        active.paid_at = Set(Some(Utc::now()));
        active.payment_details = Set(Some(details));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CheckoutPaid {
                checkout_id,
                transaction_id,
            })
            .await;

        info!("Checkout {} marked paid", checkout_id);
        Ok(updated)
    }

    /// Converts a checkout into an order: order insert, finalized flag, and
    /// cart deletion happen in one transaction, all three or none.
    ///
    /// The finalized flag is flipped with a guarded update inside the same
    /// transaction, so concurrent calls produce exactly one order.
    #[instrument(skip(self), fields(checkout_id = %checkout_id))]
    pub async fn finalize(
        &self,
        checkout_id: Uuid,
        caller_user_id: Uuid,
    ) -> Result<FinalizedOrder, ServiceError> {
        let txn = self.db.begin().await?;

        let checkout = Checkout::find_by_id(checkout_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Checkout {} not found", checkout_id)))?;

        if checkout.user_id != caller_user_id {
            return Err(ServiceError::Forbidden(
                "not authorized to finalize this checkout".to_string(),
            ));
        }
        if checkout.is_finalized {
            return Err(ServiceError::AlreadyFinalized(checkout_id));
        }

        let items = CheckoutItem::find()
            .filter(checkout_item::Column::CheckoutId.eq(checkout_id))
            .all(&txn)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::EmptyCheckout);
        }

        validate_line_items(&items)?;

        // Flip the finalized flag with a guarded update: the row lock makes a
        // concurrent finalize re-evaluate the predicate and hit zero rows, so
        // exactly one caller proceeds past this point.
        let flagged = Checkout::update_many()
            .col_expr(checkout::Column::IsFinalized, Expr::value(true))
            .col_expr(checkout::Column::FinalizedAt, Expr::value(Some(Utc::now())))
            .col_expr(checkout::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(checkout::Column::Id.eq(checkout_id))
            .filter(checkout::Column::IsFinalized.eq(false))
            .exec(&txn)
            .await?;
        if flagged.rows_affected == 0 {
            return Err(ServiceError::AlreadyFinalized(checkout_id));
        }

        // Catalog lookup for display images; the catalog may have lost a
        // product since the snapshot was taken, so misses fall back to the
        // snapshot image and then to "".
        let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        let products: HashMap<Uuid, ProductModel> = Product::find()
            .filter(crate::entities::product::Column::Id.is_in(product_ids))
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let order_id = Uuid::new_v4();
        let order_row = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(checkout.user_id),
            shipping_address: Set(checkout.shipping_address.clone()),
            payment_method: Set(checkout.payment_method),
            payment_details: Set(checkout.payment_details.clone()),
            total_price: Set(checkout.total_price),
            is_paid: Set(checkout.is_paid),
            paid_at: Set(checkout.paid_at),
            is_delivered: Set(false),
            delivered_at: Set(None),
            payment_status: Set(checkout.payment_status),
            status: Set(OrderStatus::Processing),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let created = order_row.insert(&txn).await?;

        let items_count = items.len();
        for item in items {
            let image = products
                .get(&item.product_id)
                .and_then(ProductModel::primary_image)
                .or_else(|| item.image.clone().filter(|img| !img.is_empty()))
                .unwrap_or_default();

            let row = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                name: Set(item.name),
                image: Set(image),
                unit_price: Set(item.unit_price),
                quantity: Set(item.quantity),
                size: Set(item.size),
                color: Set(item.color),
            };
            row.insert(&txn).await?;
        }

        // Drop the originating cart with its lines.
        if let Some(user_cart) = Cart::find()
            .filter(cart::Column::UserId.eq(Some(checkout.user_id)))
            .one(&txn)
            .await?
        {
            CartItem::delete_many()
                .filter(cart_item::Column::CartId.eq(user_cart.id))
                .exec(&txn)
                .await?;
            Cart::delete_by_id(user_cart.id).exec(&txn).await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CheckoutFinalized {
                checkout_id,
                order_id,
            })
            .await;
        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;

        info!(
            "Checkout {} finalized into order {} ({} items)",
            checkout_id, order_id, items_count
        );
        Ok(FinalizedOrder {
            order_id,
            status: created.status,
            total_price: created.total_price,
            items_count,
        })
    }
}

/// Every snapshot line must carry a name, a positive price, and a quantity
/// within bounds before it may become an order line.
fn validate_line_items(items: &[CheckoutItemModel]) -> Result<(), ServiceError> {
    let mut problems = Vec::new();
    for item in items {
        let mut missing = Vec::new();
        if item.name.trim().is_empty() {
            missing.push("name");
        }
        if item.unit_price <= Decimal::ZERO {
            missing.push("price");
        }
        if item.quantity < 1 || item.quantity > MAX_LINE_QUANTITY {
            missing.push("quantity");
        }
        if !missing.is_empty() {
            problems.push(format!("item {}: {}", item.product_id, missing.join(", ")));
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::InvalidLineItem(problems.join("; ")))
    }
}

/// One snapshot line handed to `open`
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutItemInput {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Input for opening a checkout
#[derive(Debug, Deserialize)]
pub struct OpenCheckoutInput {
    pub items: Vec<CheckoutItemInput>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub total_price: Decimal,
}

/// Input for confirming payment on a checkout
#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentInput {
    /// Caller-supplied status token; "paid" (any case) accepts.
    pub payment_status: String,
    /// Raw gateway callback payload, shape varies by provider.
    pub payment_details: Option<serde_json::Value>,
}

/// Checkout record with snapshot lines
#[derive(Debug, Serialize)]
pub struct CheckoutWithItems {
    pub checkout: CheckoutModel,
    pub items: Vec<CheckoutItemModel>,
}

/// Result of a successful finalization
#[derive(Debug, Serialize, ToSchema)]
pub struct FinalizedOrder {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub total_price: Decimal,
    pub items_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot_line(name: &str, price: Decimal, quantity: i32) -> CheckoutItemModel {
        CheckoutItemModel {
            id: Uuid::new_v4(),
            checkout_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            name: name.to_string(),
            image: None,
            unit_price: price,
            quantity,
            size: None,
            color: None,
        }
    }

    #[test]
    fn valid_lines_pass() {
        let items = vec![
            snapshot_line("Tee", dec!(19.99), 2),
            snapshot_line("Cap", dec!(9.50), 1000),
        ];
        assert!(validate_line_items(&items).is_ok());
    }

    #[test]
    fn invalid_lines_report_every_missing_field() {
        let bad = snapshot_line("", Decimal::ZERO, 0);
        let err = validate_line_items(&[bad.clone()]).unwrap_err();
        match err {
            ServiceError::InvalidLineItem(msg) => {
                assert!(msg.contains(&bad.product_id.to_string()));
                assert!(msg.contains("name"));
                assert!(msg.contains("price"));
                assert!(msg.contains("quantity"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn quantity_above_cap_is_invalid() {
        let oversized = snapshot_line("Tee", dec!(5.00), 1001);
        assert!(matches!(
            validate_line_items(&[oversized]),
            Err(ServiceError::InvalidLineItem(_))
        ));
    }

    #[test]
    fn one_bad_line_fails_the_whole_set() {
        let items = vec![
            snapshot_line("Tee", dec!(19.99), 1),
            snapshot_line("Cap", Decimal::ZERO, 1),
        ];
        assert!(validate_line_items(&items).is_err());
    }
}
