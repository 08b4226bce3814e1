use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{cart, cart_item, Cart, CartItem, CartItemModel, CartModel, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Identifies the owner of a cart: a registered user or an anonymous guest
/// session. Every cart operation is keyed by this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    User(Uuid),
    Guest(String),
}

impl CartOwner {
    /// Builds an owner key from the optional ids a request carries. A user
    /// id wins when both are present; neither present is `InvalidOwner`.
    pub fn from_parts(
        user_id: Option<Uuid>,
        guest_id: Option<String>,
    ) -> Result<Self, ServiceError> {
        if let Some(user_id) = user_id {
            return Ok(CartOwner::User(user_id));
        }
        match guest_id {
            Some(guest_id) if !guest_id.trim().is_empty() => Ok(CartOwner::Guest(guest_id)),
            _ => Err(ServiceError::InvalidOwner(
                "either user_id or guest_id is required".to_string(),
            )),
        }
    }
}

/// Shopping cart service: line-item merge, quantity updates, removal, and
/// derived-total maintenance. Every mutation persists the recomputed total
/// before returning.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Returns the owner's cart, creating an empty one when absent.
    #[instrument(skip(self))]
    pub async fn resolve(&self, owner: &CartOwner) -> Result<CartModel, ServiceError> {
        let txn = self.db.begin().await?;
        let cart = Self::resolve_in(&txn, owner).await?;
        txn.commit().await?;
        Ok(cart)
    }

    /// The owner's cart with its items, creating an empty cart when absent.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, owner: &CartOwner) -> Result<CartWithItems, ServiceError> {
        let cart = self.resolve(owner).await?;
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&*self.db)
            .await?;
        Ok(CartWithItems { cart, items })
    }

    /// Adds merchandise to the cart, merging into an existing
    /// (product, size, color) line when one exists.
    ///
    /// Price, name, and image come from the catalog at call time, never from
    /// the client.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        input: AddItemInput,
    ) -> Result<CartWithItems, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let cart = Self::resolve_in(&txn, owner).await?;

        let product = Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or(ServiceError::ProductNotFound(input.product_id))?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&txn)
            .await?;

        let existing = items.into_iter().find(|item| {
            item.matches(
                input.product_id,
                input.size.as_deref(),
                input.color.as_deref(),
            )
        });

        if let Some(item) = existing {
            let quantity = item.quantity + input.quantity;
            let unit_price = item.unit_price;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity);
            item.line_total = Set(unit_price * Decimal::from(quantity));
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?;
        } else {
            let line = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                name: Set(product.name.clone()),
                image: Set(product.primary_image().unwrap_or_default()),
                unit_price: Set(product.price),
                quantity: Set(input.quantity),
                size: Set(input.size),
                color: Set(input.color),
                line_total: Set(product.price * Decimal::from(input.quantity)),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            };
            line.insert(&txn).await?;
        }

        let cart = Self::recompute_total(&txn, cart.id).await?;
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&txn)
            .await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart.id))
            .await;

        info!(
            "Added product {} x{} to cart {}",
            input.product_id, input.quantity, cart.id
        );
        Ok(CartWithItems { cart, items })
    }

    /// Sets the quantity of a matching line outright; a quantity of zero or
    /// less removes the line.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        owner: &CartOwner,
        input: UpdateQuantityInput,
    ) -> Result<CartWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Self::find_cart(&txn, owner)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&txn)
            .await?;

        let line = items
            .into_iter()
            .find(|item| {
                item.matches(
                    input.product_id,
                    input.size.as_deref(),
                    input.color.as_deref(),
                )
            })
            .ok_or_else(|| {
                ServiceError::LineNotFound(format!("product {} not in cart", input.product_id))
            })?;

        if input.quantity <= 0 {
            CartItem::delete_by_id(line.id).exec(&txn).await?;
        } else {
            let unit_price = line.unit_price;
            let mut line: cart_item::ActiveModel = line.into();
            line.quantity = Set(input.quantity);
            line.line_total = Set(unit_price * Decimal::from(input.quantity));
            line.updated_at = Set(Utc::now());
            line.update(&txn).await?;
        }

        let cart = Self::recompute_total(&txn, cart.id).await?;
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&txn)
            .await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart.id))
            .await;

        Ok(CartWithItems { cart, items })
    }

    /// Removes the matching line. Removing nothing is `LineNotFound`, never a
    /// silent success.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        owner: &CartOwner,
        input: RemoveItemInput,
    ) -> Result<CartWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Self::find_cart(&txn, owner).await?.ok_or_else(|| {
            ServiceError::LineNotFound(format!("product {} not in cart", input.product_id))
        })?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&txn)
            .await?;

        let line = items
            .into_iter()
            .find(|item| {
                item.matches(
                    input.product_id,
                    input.size.as_deref(),
                    input.color.as_deref(),
                )
            })
            .ok_or_else(|| {
                ServiceError::LineNotFound(format!("product {} not in cart", input.product_id))
            })?;

        CartItem::delete_by_id(line.id).exec(&txn).await?;

        let cart = Self::recompute_total(&txn, cart.id).await?;
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&txn)
            .await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart.id))
            .await;

        Ok(CartWithItems { cart, items })
    }

    /// Empties the cart and zeroes its total. The cart row itself survives.
    #[instrument(skip(self))]
    pub async fn clear(&self, owner: &CartOwner) -> Result<CartModel, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Self::resolve_in(&txn, owner).await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        let mut active: cart::ActiveModel = cart.into();
        active.total_price = Set(Decimal::ZERO);
        active.updated_at = Set(Utc::now());
        let cart = active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartCleared(cart.id))
            .await;

        info!("Cleared cart: {}", cart.id);
        Ok(cart)
    }

    async fn find_cart(
        conn: &impl ConnectionTrait,
        owner: &CartOwner,
    ) -> Result<Option<CartModel>, ServiceError> {
        let query = match owner {
            CartOwner::User(user_id) => {
                Cart::find().filter(cart::Column::UserId.eq(Some(*user_id)))
            }
            CartOwner::Guest(guest_id) => {
                Cart::find().filter(cart::Column::GuestId.eq(Some(guest_id.clone())))
            }
        };
        Ok(query.one(conn).await?)
    }

    async fn resolve_in(
        conn: &impl ConnectionTrait,
        owner: &CartOwner,
    ) -> Result<CartModel, ServiceError> {
        if let Some(cart) = Self::find_cart(conn, owner).await? {
            return Ok(cart);
        }

        let (user_id, guest_id) = match owner {
            CartOwner::User(user_id) => (Some(*user_id), None),
            CartOwner::Guest(guest_id) => (None, Some(guest_id.clone())),
        };

        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            guest_id: Set(guest_id),
            total_price: Set(Decimal::ZERO),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let cart = cart.insert(conn).await?;
        info!("Created cart: {}", cart.id);
        Ok(cart)
    }

    /// Recomputes the derived total from the lines and persists it.
    async fn recompute_total(
        conn: &impl ConnectionTrait,
        cart_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(conn)
            .await?;

        let total: Decimal = items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum();

        let mut cart: cart::ActiveModel = Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?
            .into();
        cart.total_price = Set(total);
        cart.updated_at = Set(Utc::now());

        Ok(cart.update(conn).await?)
    }
}

/// Input for adding merchandise to a cart
#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Input for an absolute quantity update
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Input for removing a line
#[derive(Debug, Deserialize)]
pub struct RemoveItemInput {
    pub product_id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Cart with items
#[derive(Debug, Serialize)]
pub struct CartWithItems {
    pub cart: CartModel,
    pub items: Vec<CartItemModel>,
}
