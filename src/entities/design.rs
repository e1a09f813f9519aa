use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Printable artwork master, decoupled from any physical good.
///
/// A design becomes purchasable only when paired with a
/// [`ProductTemplate`](super::product_template) and a print side.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "designs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Optional price override. When present and positive it takes
    /// precedence over the template's base price.
    pub price: Option<Decimal>,

    /// Compare-at price shown struck through in the storefront
    pub compare_at_price: Option<Decimal>,

    /// Per-color mockup images, JSON object of color -> URL
    pub mockup_images: Option<Json>,

    /// Demographics the design may be printed for, JSON array
    pub demographics: Option<Json>,

    /// Garment colors the design is allowed on, JSON array
    pub allowed_colors: Option<Json>,

    /// Print sides offered (front/back/both), JSON array
    pub print_sides: Option<Json>,

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
            active_model.created_at = Set(Utc::now());
        }
        active_model.updated_at = Set(Some(Utc::now()));

        Ok(active_model)
    }
}
