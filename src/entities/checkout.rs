use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Checkout record: a snapshot of cart contents staged for payment.
///
/// Never deleted; a finalized record stays behind as the audit trail of the
/// order it produced. `is_finalized = true` is terminal.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "checkouts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(column_type = "Json")]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_price: Decimal,
    pub is_paid: bool,
    #[sea_orm(nullable)]
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_status: PaymentStatus,
    #[sea_orm(column_type = "Json", nullable)]
    pub payment_details: Option<PaymentDetails>,
    pub is_finalized: bool,
    #[sea_orm(nullable)]
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::checkout_item::Entity")]
    CheckoutItems,
}

impl Related<super::checkout_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckoutItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Shipping destination captured at checkout time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    pub fn is_complete(&self) -> bool {
        !self.address.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.postal_code.trim().is_empty()
            && !self.country.trim().is_empty()
    }
}

/// Canonical payment details, normalized from whatever shape the gateway
/// callback delivered. The original payload is retained in `raw_response`
/// for audit; application logic never branches on it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct PaymentDetails {
    pub transaction_id: Option<String>,
    pub gateway: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub status: Option<String>,
    #[schema(value_type = Object)]
    pub raw_response: Option<serde_json::Value>,
}

/// Supported payment methods
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "Paypal")]
    Paypal,
    #[sea_orm(string_value = "Credit Card")]
    #[serde(rename = "Credit Card", alias = "CreditCard")]
    CreditCard,
    #[sea_orm(string_value = "Bank Transfer")]
    #[serde(rename = "Bank Transfer", alias = "BankTransfer")]
    BankTransfer,
}

/// Payment status of a checkout or order
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}
