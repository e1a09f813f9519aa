use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::discount::{self, DiscountKind, Entity as Discount, Model as DiscountModel},
    errors::ServiceError,
};

/// Outcome of a successful validation: the matched record plus the
/// computed (clamped) discount amount.
#[derive(Debug, Clone)]
pub struct ValidatedDiscount {
    pub discount: DiscountModel,
    /// Discount amount in major currency units, clamped to the subtotal
    pub amount: Decimal,
    /// Same amount in integer minor currency units (floored)
    pub amount_cents: i64,
}

#[derive(Debug, Deserialize, Serialize, validator::Validate, utoipa::ToSchema)]
pub struct CreateDiscountRequest {
    #[validate(length(min = 1, max = 64, message = "Code must be between 1 and 64 characters"))]
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub min_purchase: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub expires_at: Option<chrono::DateTime<Utc>>,
}

/// Discount code evaluation and admin management.
#[derive(Clone)]
pub struct DiscountService {
    db: Arc<DatabaseConnection>,
}

impl DiscountService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Validates a code against a cart subtotal.
    ///
    /// Read-only and side-effect free: safe to call repeatedly while the
    /// buyer edits their cart. Every failure collapses into the same
    /// generic [`ServiceError::DiscountRejected`] so callers cannot probe
    /// for why a code failed.
    #[instrument(skip(self), fields(subtotal = %cart_subtotal))]
    pub async fn validate(
        &self,
        code: &str,
        cart_subtotal: Decimal,
    ) -> Result<ValidatedDiscount, ServiceError> {
        let normalized = code.trim().to_uppercase();

        let record = Discount::find()
            .filter(discount::Column::Code.eq(normalized.clone()))
            .filter(discount::Column::Active.eq(true))
            .one(&*self.db)
            .await?;

        let Some(record) = record else {
            debug!(code = %normalized, "No active discount matches code");
            return Err(ServiceError::DiscountRejected);
        };

        if let Some(expires_at) = record.expires_at {
            if expires_at < Utc::now() {
                debug!(code = %normalized, "Discount code expired");
                return Err(ServiceError::DiscountRejected);
            }
        }

        if let Some(limit) = record.usage_limit {
            if record.used_count >= limit {
                debug!(code = %normalized, "Discount usage limit reached");
                return Err(ServiceError::DiscountRejected);
            }
        }

        if let Some(min_purchase) = record.min_purchase {
            if cart_subtotal < min_purchase {
                debug!(code = %normalized, "Cart subtotal below minimum purchase");
                return Err(ServiceError::DiscountRejected);
            }
        }

        let amount = compute_amount(&record, cart_subtotal);
        let amount_cents = (amount * Decimal::from(100))
            .trunc()
            .to_i64()
            .unwrap_or(0)
            .max(0);

        Ok(ValidatedDiscount {
            discount: record,
            amount,
            amount_cents,
        })
    }

    /// Increments the usage counter by one, atomically in the database.
    ///
    /// Called only after a payment actually completes, never at validation
    /// or session-creation time. Concurrent redemptions of the same code
    /// each count exactly once.
    #[instrument(skip(self))]
    pub async fn increment_usage(&self, code: &str) -> Result<(), ServiceError> {
        let normalized = code.trim().to_uppercase();

        let result = Discount::update_many()
            .col_expr(
                discount::Column::UsedCount,
                Expr::col(discount::Column::UsedCount).add(1),
            )
            .col_expr(discount::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(discount::Column::Code.eq(normalized.clone()))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            warn!(code = %normalized, "Usage increment matched no discount record");
            return Err(ServiceError::NotFound(format!(
                "Discount {normalized} not found"
            )));
        }

        info!(code = %normalized, "Discount usage incremented");
        Ok(())
    }

    pub async fn create(
        &self,
        request: CreateDiscountRequest,
    ) -> Result<DiscountModel, ServiceError> {
        use validator::Validate;
        request.validate()?;

        if request.value <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Discount value must be positive".to_string(),
            ));
        }
        if request.kind == DiscountKind::Percentage && request.value > Decimal::from(100) {
            return Err(ServiceError::ValidationError(
                "Percentage discount cannot exceed 100".to_string(),
            ));
        }

        let model = discount::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(request.code),
            kind: Set(request.kind),
            value: Set(request.value),
            min_purchase: Set(request.min_purchase),
            usage_limit: Set(request.usage_limit),
            used_count: Set(0),
            expires_at: Set(request.expires_at),
            active: Set(true),
            ..Default::default()
        };

        let created = model.insert(&*self.db).await?;
        info!(discount_id = %created.id, code = %created.code, "Discount created");
        Ok(created)
    }

    pub async fn list(&self, page: u64, per_page: u64) -> Result<(Vec<DiscountModel>, u64), ServiceError> {
        let paginator = Discount::find()
            .order_by_desc(discount::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let discounts = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((discounts, total))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Discount::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Discount {id} not found")));
        }
        info!(discount_id = %id, "Discount deleted");
        Ok(())
    }
}

/// Computes the discount amount for a subtotal and clamps it so an order
/// can never go negative.
fn compute_amount(discount: &DiscountModel, subtotal: Decimal) -> Decimal {
    let raw = match discount.kind {
        DiscountKind::Fixed => discount.value,
        DiscountKind::Percentage => subtotal * discount.value / Decimal::from(100),
    };
    raw.min(subtotal).max(Decimal::ZERO)
}
