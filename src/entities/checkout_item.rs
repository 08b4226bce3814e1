use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Checkout line item: an immutable snapshot of a cart line, written once
/// when the checkout opens. Later cart mutations do not touch these rows.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "checkout_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub checkout_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    #[sea_orm(nullable)]
    pub image: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Decimal,
    pub quantity: i32,
    #[sea_orm(nullable)]
    pub size: Option<String>,
    #[sea_orm(nullable)]
    pub color: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::checkout::Entity",
        from = "Column::CheckoutId",
        to = "super::checkout::Column::Id"
    )]
    Checkout,
}

impl Related<super::checkout::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Checkout.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
