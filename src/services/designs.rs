use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::design::{self, Entity as Design, Model as DesignModel},
    errors::ServiceError,
};

#[derive(Debug, Deserialize, Serialize, Validate, utoipa::ToSchema)]
pub struct CreateDesignRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Price override; when absent the paired template's base price applies
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub mockup_images: Option<serde_json::Value>,
    pub demographics: Option<Vec<String>>,
    pub allowed_colors: Option<Vec<String>>,
    pub print_sides: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize, Validate, utoipa::ToSchema)]
pub struct UpdateDesignRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub mockup_images: Option<serde_json::Value>,
    pub demographics: Option<Vec<String>>,
    pub allowed_colors: Option<Vec<String>>,
    pub print_sides: Option<Vec<String>>,
    pub active: Option<bool>,
}

#[derive(Clone)]
pub struct DesignService {
    db: Arc<DatabaseConnection>,
}

impl DesignService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateDesignRequest) -> Result<DesignModel, ServiceError> {
        request.validate()?;

        // A zero or negative override would poison composite pricing.
        if matches!(request.price, Some(p) if p <= Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "Design price override must be positive when set".to_string(),
            ));
        }

        let model = design::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            price: Set(request.price),
            compare_at_price: Set(request.compare_at_price),
            mockup_images: Set(request.mockup_images),
            demographics: Set(request.demographics.map(|v| serde_json::json!(v))),
            allowed_colors: Set(request.allowed_colors.map(|v| serde_json::json!(v))),
            print_sides: Set(request.print_sides.map(|v| serde_json::json!(v))),
            ..Default::default()
        };

        let created = model.insert(&*self.db).await?;
        info!(design_id = %created.id, "Design created");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<DesignModel>, ServiceError> {
        Ok(Design::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<DesignModel>, u64), ServiceError> {
        let paginator = Design::find()
            .filter(design::Column::Active.eq(true))
            .order_by_desc(design::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let designs = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((designs, total))
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateDesignRequest,
    ) -> Result<DesignModel, ServiceError> {
        request.validate()?;

        if matches!(request.price, Some(p) if p <= Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "Design price override must be positive when set".to_string(),
            ));
        }

        let existing = Design::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Design {id} not found")))?;

        let mut active: design::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(price) = request.price {
            active.price = Set(Some(price));
        }
        if let Some(compare_at) = request.compare_at_price {
            active.compare_at_price = Set(Some(compare_at));
        }
        if let Some(images) = request.mockup_images {
            active.mockup_images = Set(Some(images));
        }
        if let Some(demographics) = request.demographics {
            active.demographics = Set(Some(serde_json::json!(demographics)));
        }
        if let Some(colors) = request.allowed_colors {
            active.allowed_colors = Set(Some(serde_json::json!(colors)));
        }
        if let Some(sides) = request.print_sides {
            active.print_sides = Set(Some(serde_json::json!(sides)));
        }
        if let Some(is_active) = request.active {
            active.active = Set(is_active);
        }

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Design::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Design {id} not found")));
        }
        info!(design_id = %id, "Design deleted");
        Ok(())
    }
}
