use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{product, Product, ProductModel},
    errors::ServiceError,
};

/// Product catalog service.
///
/// The catalog is read-only from the cart/checkout/order flow's point of
/// view; the only write path is the administrative `create_product`.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            price: Set(input.price),
            images: Set(serde_json::Value::from(input.images)),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        let product = product.insert(&*self.db).await?;
        info!("Created product: {}", product.id);
        Ok(product)
    }

    /// Looks up one product; `None` when the catalog has no such id.
    pub async fn find_by_id(&self, product_id: Uuid) -> Result<Option<ProductModel>, ServiceError> {
        Ok(Product::find_by_id(product_id).one(&*self.db).await?)
    }

    /// Like [`Self::find_by_id`] but failing with `NotFound` for HTTP reads.
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        self.find_by_id(product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Bulk lookup; returns only the subset of ids that exist.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ProductModel>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Product::find()
            .filter(product::Column::Id.is_in(ids.iter().copied()))
            .all(&*self.db)
            .await?)
    }

    /// Lists products, newest first.
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let paginator = Product::find()
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }
}

/// Input for creating a catalog product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub price: Decimal,
    pub images: Vec<String>,
}
