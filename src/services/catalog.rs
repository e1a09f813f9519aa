use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{design, product, product_template},
    errors::ServiceError,
};

/// Reference to a purchasable item.
///
/// A tagged union at the API boundary: standalone products and
/// design-on-template composites are distinct variants rather than a
/// hyphen-joined string, so ids containing hyphens can never be misparsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemRef {
    Product {
        id: Uuid,
    },
    Composite {
        design_id: Uuid,
        template_id: Uuid,
        /// Print side (front/back/both). Never affects pricing.
        side: Option<String>,
    },
}

/// Authoritative pricing and display data for one item reference.
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    pub item_ref: ItemRef,
    /// Unit price in major currency units, re-derived from the catalog
    pub unit_price: Decimal,
    /// Unit price in integer minor currency units
    pub unit_cents: i64,
    pub name: String,
    pub image_url: Option<String>,
}

/// Resolves item references against the live catalog.
///
/// Prices always come from here at checkout time; client-submitted prices
/// are never consulted.
#[derive(Clone)]
pub struct CatalogResolver {
    db: Arc<DatabaseConnection>,
}

impl CatalogResolver {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Resolves a single reference to its authoritative unit price and
    /// display metadata. Any reference that resolves to a non-positive
    /// price is an error: the whole checkout fails rather than silently
    /// dropping the line.
    #[instrument(skip(self))]
    pub async fn resolve(&self, item_ref: &ItemRef) -> Result<ResolvedItem, ServiceError> {
        match item_ref {
            ItemRef::Product { id } => {
                let product = product::Entity::find_by_id(*id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Product {id} not found")))?;

                if !product.in_stock {
                    return Err(ServiceError::InvalidInput(format!(
                        "Product {} is out of stock",
                        product.name
                    )));
                }

                let unit_cents = to_cents(product.price).ok_or_else(|| {
                    ServiceError::InvalidInput(format!(
                        "Product {} has a non-positive price",
                        product.name
                    ))
                })?;

                Ok(ResolvedItem {
                    item_ref: item_ref.clone(),
                    unit_price: product.price,
                    unit_cents,
                    name: product.name,
                    image_url: product.image_url,
                })
            }
            ItemRef::Composite {
                design_id,
                template_id,
                ..
            } => {
                let design = design::Entity::find_by_id(*design_id)
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Design {design_id} not found"))
                    })?;

                // Design price override wins when present and positive;
                // otherwise the template's base price applies.
                let price = match design.price {
                    Some(p) if p > Decimal::ZERO => p,
                    _ => {
                        let template = product_template::Entity::find_by_id(*template_id)
                            .one(&*self.db)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Product template {template_id} not found"
                                ))
                            })?;
                        template.base_price
                    }
                };

                let unit_cents = to_cents(price).ok_or_else(|| {
                    ServiceError::InvalidInput(format!(
                        "Design {} resolves to a non-positive price",
                        design.name
                    ))
                })?;

                let image_url = design
                    .mockup_images
                    .as_ref()
                    .and_then(|images| images.as_object())
                    .and_then(|map| map.values().next())
                    .and_then(|v| v.as_str())
                    .map(str::to_string);

                Ok(ResolvedItem {
                    item_ref: item_ref.clone(),
                    unit_price: price,
                    unit_cents,
                    name: design.name,
                    image_url,
                })
            }
        }
    }
}

/// Converts a major-unit price to integer cents. Returns `None` for
/// non-positive amounts, which reject the whole checkout upstream.
fn to_cents(price: Decimal) -> Option<i64> {
    let cents = (price * Decimal::from(100)).round().to_i64()?;
    (cents > 0).then_some(cents)
}
