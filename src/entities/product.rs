use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog product entity. Read-only from the cart/checkout/order flow.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    /// Ordered image URLs. Legacy catalog imports may carry `{ "url": ... }`
    /// objects instead of plain strings.
    #[sea_orm(column_type = "Json")]
    pub images: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// First usable image URL, if the catalog has one.
    pub fn primary_image(&self) -> Option<String> {
        let first = self.images.as_array()?.first()?;
        let url = match first {
            serde_json::Value::String(s) => s.as_str(),
            serde_json::Value::Object(map) => map.get("url")?.as_str()?,
            _ => return None,
        };
        if url.is_empty() {
            None
        } else {
            Some(url.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn product_with_images(images: serde_json::Value) -> Model {
        Model {
            id: Uuid::new_v4(),
            name: "Shirt".to_string(),
            price: dec!(25.00),
            images,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn primary_image_from_string_array() {
        let product = product_with_images(json!(["https://cdn.example.com/a.jpg", "b.jpg"]));
        assert_eq!(
            product.primary_image().as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
    }

    #[test]
    fn primary_image_from_object_entries() {
        let product = product_with_images(json!([{ "url": "https://cdn.example.com/o.jpg" }]));
        assert_eq!(
            product.primary_image().as_deref(),
            Some("https://cdn.example.com/o.jpg")
        );
    }

    #[test]
    fn primary_image_absent_for_empty_or_unusable_entries() {
        assert_eq!(product_with_images(json!([])).primary_image(), None);
        assert_eq!(product_with_images(json!([""])).primary_image(), None);
        assert_eq!(product_with_images(json!([42])).primary_image(), None);
        assert_eq!(product_with_images(json!([{ "src": "x" }])).primary_image(), None);
    }
}
