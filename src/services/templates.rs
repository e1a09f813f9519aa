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
    entities::product_template::{self, Entity as ProductTemplate, Model as TemplateModel},
    errors::ServiceError,
};

#[derive(Debug, Deserialize, Serialize, Validate, utoipa::ToSchema)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub base_price: Decimal,
    pub demographic: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize, Validate, utoipa::ToSchema)]
pub struct UpdateTemplateRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub base_price: Option<Decimal>,
    pub demographic: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// Physical product template management.
#[derive(Clone)]
pub struct TemplateService {
    db: Arc<DatabaseConnection>,
}

impl TemplateService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateTemplateRequest) -> Result<TemplateModel, ServiceError> {
        request.validate()?;

        if request.base_price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Template base price must be positive".to_string(),
            ));
        }

        let model = product_template::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            base_price: Set(request.base_price),
            demographic: Set(request.demographic),
            sizes: Set(request.sizes.map(|v| serde_json::json!(v))),
            colors: Set(request.colors.map(|v| serde_json::json!(v))),
            ..Default::default()
        };

        let created = model.insert(&*self.db).await?;
        info!(template_id = %created.id, "Product template created");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<TemplateModel>, ServiceError> {
        Ok(ProductTemplate::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<TemplateModel>, u64), ServiceError> {
        let paginator = ProductTemplate::find()
            .filter(product_template::Column::Active.eq(true))
            .order_by_desc(product_template::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let templates = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((templates, total))
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateTemplateRequest,
    ) -> Result<TemplateModel, ServiceError> {
        request.validate()?;

        if matches!(request.base_price, Some(p) if p <= Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "Template base price must be positive".to_string(),
            ));
        }

        let existing = ProductTemplate::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product template {id} not found")))?;

        let mut active: product_template::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(base_price) = request.base_price {
            active.base_price = Set(base_price);
        }
        if let Some(demographic) = request.demographic {
            active.demographic = Set(Some(demographic));
        }
        if let Some(sizes) = request.sizes {
            active.sizes = Set(Some(serde_json::json!(sizes)));
        }
        if let Some(colors) = request.colors {
            active.colors = Set(Some(serde_json::json!(colors)));
        }
        if let Some(is_active) = request.active {
            active.active = Set(is_active);
        }

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = ProductTemplate::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product template {id} not found"
            )));
        }
        info!(template_id = %id, "Product template deleted");
        Ok(())
    }
}
