// Core services
pub mod carts;
pub mod catalog;
pub mod checkouts;
pub mod orders;
pub mod payments;

pub use carts::{CartOwner, CartService};
pub use catalog::ProductCatalogService;
pub use checkouts::CheckoutService;
pub use orders::OrderService;
