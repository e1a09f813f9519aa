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
    entities::product::{self, Entity as Product, Model as ProductModel},
    errors::ServiceError,
};

#[derive(Debug, Deserialize, Serialize, Validate, utoipa::ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    pub category: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub bead_sizes: Option<Vec<String>>,
    #[validate(url)]
    pub image_url: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Validate, utoipa::ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub category: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub bead_sizes: Option<Vec<String>>,
    pub image_url: Option<String>,
}

/// Catalog product management. Checkout only reads; this service owns
/// every mutation.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateProductRequest) -> Result<ProductModel, ServiceError> {
        request.validate()?;

        if request.price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Product price must be positive".to_string(),
            ));
        }

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            description: Set(request.description),
            price: Set(request.price),
            in_stock: Set(request.in_stock),
            category: Set(request.category),
            sizes: Set(request.sizes.map(|v| serde_json::json!(v))),
            colors: Set(request.colors.map(|v| serde_json::json!(v))),
            bead_sizes: Set(request.bead_sizes.map(|v| serde_json::json!(v))),
            image_url: Set(request.image_url),
            ..Default::default()
        };

        let created = model.insert(&*self.db).await?;
        info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ProductModel>, ServiceError> {
        Ok(Product::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
        category: Option<String>,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let mut query = Product::find().order_by_desc(product::Column::CreatedAt);
        if let Some(category) = category {
            query = query.filter(product::Column::Category.eq(category));
        }

        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((products, total))
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;

        let existing = Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {id} not found")))?;

        if let Some(price) = request.price {
            if price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Product price must be positive".to_string(),
                ));
            }
        }

        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(in_stock) = request.in_stock {
            active.in_stock = Set(in_stock);
        }
        if let Some(category) = request.category {
            active.category = Set(Some(category));
        }
        if let Some(sizes) = request.sizes {
            active.sizes = Set(Some(serde_json::json!(sizes)));
        }
        if let Some(colors) = request.colors {
            active.colors = Set(Some(serde_json::json!(colors)));
        }
        if let Some(bead_sizes) = request.bead_sizes {
            active.bead_sizes = Set(Some(serde_json::json!(bead_sizes)));
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Product::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Product {id} not found")));
        }
        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}
