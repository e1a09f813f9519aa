use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Single-row counter backing sequential order numbers.
///
/// Incremented inside the order-creation transaction so concurrent
/// materializations never hand out the same number.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    /// Next order number to hand out
    pub next_number: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
