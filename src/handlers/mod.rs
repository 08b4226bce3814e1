pub mod carts;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod products;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{CartService, CheckoutService, OrderService, ProductCatalogService};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<ProductCatalogService>,
    pub carts: Arc<CartService>,
    pub checkouts: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let catalog = Arc::new(ProductCatalogService::new(db.clone()));
        let carts = Arc::new(CartService::new(db.clone(), event_sender.clone()));
        let checkouts = Arc::new(CheckoutService::new(
            db.clone(),
            event_sender.clone(),
            catalog.clone(),
        ));
        let orders = Arc::new(OrderService::new(db, event_sender));

        Self {
            catalog,
            carts,
            checkouts,
            orders,
        }
    }
}
