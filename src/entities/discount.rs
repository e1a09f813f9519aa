use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

/// Promotional discount code.
///
/// `used_count` is mutated only by the payment-completion pipeline, with an
/// atomic in-database increment; validation never writes.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Code as entered at checkout, stored uppercased
    #[sea_orm(unique)]
    pub code: String,

    pub kind: DiscountKind,

    /// Percentage (0-100) or fixed amount in major currency units,
    /// depending on `kind`
    pub value: Decimal,

    /// Minimum cart subtotal required for the code to apply
    pub min_purchase: Option<Decimal>,

    /// Maximum number of redemptions; unlimited when absent
    pub usage_limit: Option<i32>,

    pub used_count: i32,

    pub expires_at: Option<DateTime<Utc>>,

    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.active {
                active_model.active = Set(true);
            }
            if let ActiveValue::NotSet = active_model.used_count {
                active_model.used_count = Set(0);
            }
            active_model.created_at = Set(Utc::now());
        }

        // Codes compare case-insensitively; normalize on every write.
        if let ActiveValue::Set(code) = &active_model.code {
            let upper = code.trim().to_uppercase();
            active_model.code = Set(upper);
        }

        active_model.updated_at = Set(Some(Utc::now()));

        Ok(active_model)
    }
}
