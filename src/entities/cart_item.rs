use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cart line item. Two lines are the same merchandise exactly when
/// (product_id, size, color) match, including absent size/color.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub image: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Decimal,
    pub quantity: i32,
    #[sea_orm(nullable)]
    pub size: Option<String>,
    #[sea_orm(nullable)]
    pub color: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub line_total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cart::Entity",
        from = "Column::CartId",
        to = "super::cart::Column::Id"
    )]
    Cart,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Merge-identity match. An omitted size/color matches only lines that
    /// have none set themselves.
    pub fn matches(&self, product_id: Uuid, size: Option<&str>, color: Option<&str>) -> bool {
        self.product_id == product_id
            && self.size.as_deref() == size
            && self.color.as_deref() == color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(product_id: Uuid, size: Option<&str>, color: Option<&str>) -> Model {
        Model {
            id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            product_id,
            name: "Tee".to_string(),
            image: String::new(),
            unit_price: dec!(10.00),
            quantity: 1,
            size: size.map(str::to_string),
            color: color.map(str::to_string),
            line_total: dec!(10.00),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn matches_on_full_identity() {
        let product_id = Uuid::new_v4();
        let item = line(product_id, Some("M"), Some("Black"));
        assert!(item.matches(product_id, Some("M"), Some("Black")));
        assert!(!item.matches(product_id, Some("L"), Some("Black")));
        assert!(!item.matches(product_id, Some("M"), None));
        assert!(!item.matches(Uuid::new_v4(), Some("M"), Some("Black")));
    }

    #[test]
    fn absent_variant_fields_only_match_absent() {
        let product_id = Uuid::new_v4();
        let bare = line(product_id, None, None);
        assert!(bare.matches(product_id, None, None));
        assert!(!bare.matches(product_id, Some("M"), None));

        let sized = line(product_id, Some("M"), None);
        assert!(!sized.matches(product_id, None, None));
    }
}
