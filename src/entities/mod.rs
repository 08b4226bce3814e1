/// Storefront entities module
pub mod cart;
pub mod cart_item;
pub mod checkout;
pub mod checkout_item;
pub mod order;
pub mod order_item;
pub mod product;

// Re-export entities
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use checkout::{
    Entity as Checkout, Model as CheckoutModel, PaymentDetails, PaymentMethod, PaymentStatus,
    ShippingAddress,
};
pub use checkout_item::{Entity as CheckoutItem, Model as CheckoutItemModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
