use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{order, order_item, Order, OrderItem, OrderItemModel, OrderModel, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Order service: retrieval plus the administrative status transition.
/// Orders are only ever created by checkout finalization.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        Ok(OrderWithItems { order, items })
    }

    /// Like [`Self::get_order`] but only for the order's owner.
    #[instrument(skip(self))]
    pub async fn get_order_for_user(
        &self,
        order_id: Uuid,
        caller_user_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        let with_items = self.get_order(order_id).await?;
        if with_items.order.user_id != caller_user_id {
            return Err(ServiceError::Forbidden(
                "not authorized to access this order".to_string(),
            ));
        }
        Ok(with_items)
    }

    /// A customer's orders, newest first.
    pub async fn list_orders_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// All orders, newest first (administrative listing).
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let paginator = Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// Administrative status transition. Moving to `Delivered` also stamps
    /// the delivery flag and time when not already set; nothing else changes.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn set_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        let already_delivered = order.is_delivered;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        if new_status == OrderStatus::Delivered && !already_delivered {
            active.is_delivered = Set(true);
            active.delivered_at = Set(Some(Utc::now()));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await;

        info!(
            "Order {} status changed from {} to {}",
            order_id, old_status, new_status
        );
        Ok(updated)
    }
}

/// Order with its line items
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}
