use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::checkout::{PaymentDetails, PaymentMethod, PaymentStatus, ShippingAddress};

/// Customer order. Created exactly once, from exactly one finalized
/// checkout; afterwards mutated only by administrative status transitions.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(column_type = "Json")]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[sea_orm(column_type = "Json", nullable)]
    pub payment_details: Option<PaymentDetails>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_price: Decimal,
    pub is_paid: bool,
    #[sea_orm(nullable)]
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    #[sea_orm(nullable)]
    pub delivered_at: Option<DateTime<Utc>>,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fulfillment status of an order
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum OrderStatus {
    #[sea_orm(string_value = "Processing")]
    Processing,
    #[sea_orm(string_value = "Shipped")]
    Shipped,
    #[sea_orm(string_value = "Delivered")]
    Delivered,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
    #[sea_orm(string_value = "Returned")]
    Returned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn order_status_parses_exact_names_only() {
        assert_eq!(
            OrderStatus::from_str("Delivered").unwrap(),
            OrderStatus::Delivered
        );
        assert_eq!(
            OrderStatus::from_str("Processing").unwrap(),
            OrderStatus::Processing
        );
        assert!(OrderStatus::from_str("delivered").is_err());
        assert!(OrderStatus::from_str("Archived").is_err());
    }

    #[test]
    fn order_status_round_trips_through_display() {
        for status in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Returned,
        ] {
            assert_eq!(OrderStatus::from_str(&status.to_string()).unwrap(), status);
        }
    }
}
