use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        order::{self, Entity as Order, Model as OrderModel, OrderStatus},
        order_counter::{self, Entity as OrderCounter},
        order_item::{self, Entity as OrderItem, Model as OrderItemModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    payments::SessionRecord,
};

const COUNTER_ROW_ID: i32 = 1;

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: i64,
    pub payment_session_id: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub shipping_address: Option<serde_json::Value>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub discount_code: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItemModel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Outcome of order materialization: the order plus whether this call
/// created it (false means a duplicate delivery found the existing row).
#[derive(Debug)]
pub struct MaterializedOrder {
    pub order: OrderModel,
    pub created: bool,
}

/// Order persistence and admin operations.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    order_number_start: i64,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, order_number_start: i64) -> Self {
        Self {
            db,
            event_sender,
            order_number_start,
        }
    }

    /// Materializes exactly one order for a completed payment session.
    ///
    /// The session id carries a unique constraint and the insert happens
    /// inside a transaction after a lookup, so the at-least-once webhook
    /// delivery contract holds: the first delivery creates the order, any
    /// retry observes it and reports `created: false`. The sequential order
    /// number comes from a counter row incremented in the same transaction.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn materialize_from_session(
        &self,
        session: &SessionRecord,
    ) -> Result<MaterializedOrder, ServiceError> {
        let txn = self.db.begin().await?;

        if let Some(existing) = Order::find()
            .filter(order::Column::PaymentSessionId.eq(session.id.clone()))
            .one(&txn)
            .await?
        {
            txn.rollback().await?;
            info!(session_id = %session.id, order_id = %existing.id,
                "Order already materialized for session; skipping");
            return Ok(MaterializedOrder {
                order: existing,
                created: false,
            });
        }

        let order_number = self.allocate_order_number(&txn).await?;
        let order_id = Uuid::new_v4();

        let discount_cents: i64 = session
            .metadata
            .get("discount_cents")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let discount_code = session.metadata.get("discount_code").cloned();
        let subtotal_cents = session.amount_total_cents + discount_cents;

        let customer_email = session.customer_email.clone().ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "Payment session {} has no customer email",
                session.id
            ))
        })?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number),
            payment_session_id: Set(session.id.clone()),
            customer_email: Set(customer_email.clone()),
            customer_name: Set(session.customer_name.clone()),
            shipping_address: Set(session.shipping_address.clone()),
            subtotal_cents: Set(subtotal_cents),
            discount_cents: Set(discount_cents),
            total_cents: Set(session.amount_total_cents),
            currency: Set(session.currency.clone()),
            discount_code: Set(discount_code.clone()),
            status: Set(OrderStatus::Pending),
            ..Default::default()
        };

        let inserted = match order_model.insert(&txn).await {
            Ok(model) => model,
            Err(e) => {
                // A concurrent delivery may have won the insert race; the
                // unique constraint on the session id makes that loss safe.
                txn.rollback().await?;
                if let Some(existing) = Order::find()
                    .filter(order::Column::PaymentSessionId.eq(session.id.clone()))
                    .one(&*self.db)
                    .await?
                {
                    warn!(session_id = %session.id,
                        "Lost order-creation race to a concurrent delivery");
                    return Ok(MaterializedOrder {
                        order: existing,
                        created: false,
                    });
                }
                error!(session_id = %session.id, error = %e, "Failed to persist order");
                return Err(ServiceError::DatabaseError(e));
            }
        };

        // Snapshot the provider's line items; later catalog edits never
        // change what this order records.
        for line in &session.line_items {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                name: Set(line.name.clone()),
                variant: Set(line.description.clone()),
                image_url: Set(line.image_url.clone()),
                quantity: Set(line.quantity as i32),
                unit_amount_cents: Set(line.unit_amount_cents),
                ..Default::default()
            };
            item.insert(&txn).await?;
        }

        txn.commit().await?;

        info!(order_id = %order_id, order_number, session_id = %session.id,
            "Order materialized");

        self.event_sender
            .send(Event::OrderCreated {
                order_id,
                order_number,
                customer_email,
                total_cents: session.amount_total_cents,
                currency: session.currency.clone(),
                discount_code,
            })
            .await;

        Ok(MaterializedOrder {
            order: inserted,
            created: true,
        })
    }

    /// Hands out the next sequential order number.
    ///
    /// The increment is a single atomic UPDATE expression, so the row lock
    /// it takes serializes concurrent materializations; the value is then
    /// read back inside the same transaction. A read-then-write here would
    /// let two transactions observe the same number under READ COMMITTED.
    async fn allocate_order_number(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<i64, ServiceError> {
        let updated = OrderCounter::update_many()
            .col_expr(
                order_counter::Column::NextNumber,
                Expr::col(order_counter::Column::NextNumber).add(1),
            )
            .filter(order_counter::Column::Id.eq(COUNTER_ROW_ID))
            .exec(txn)
            .await?;

        if updated.rows_affected == 0 {
            // First order ever: seed the counter. A bootstrap race loses to
            // the primary key and surfaces as a retryable failure.
            let active = order_counter::ActiveModel {
                id: Set(COUNTER_ROW_ID),
                next_number: Set(self.order_number_start + 1),
            };
            active.insert(txn).await?;
            return Ok(self.order_number_start);
        }

        let counter = OrderCounter::find_by_id(COUNTER_ROW_ID)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("order counter row missing after increment".to_string())
            })?;
        Ok(counter.next_number - 1)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderResponse>, ServiceError> {
        let order = Order::find_by_id(order_id).one(&*self.db).await?;
        match order {
            Some(order) => {
                let items = OrderItem::find()
                    .filter(order_item::Column::OrderId.eq(order_id))
                    .all(&*self.db)
                    .await?;
                Ok(Some(model_to_response(order, items)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let paginator = Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            let items = OrderItem::find()
                .filter(order_item::Column::OrderId.eq(order.id))
                .all(&*self.db)
                .await?;
            responses.push(model_to_response(order, items));
        }

        Ok(OrderListResponse {
            orders: responses,
            total,
            page,
            per_page,
        })
    }

    /// Admin status transition. Items stay immutable; only the status (and
    /// the update timestamp) move.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let old_status = order.status;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status: format!("{old_status:?}").to_lowercase(),
                new_status: format!("{new_status:?}").to_lowercase(),
            })
            .await;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        Ok(model_to_response(updated, items))
    }
}

fn model_to_response(model: OrderModel, items: Vec<OrderItemModel>) -> OrderResponse {
    OrderResponse {
        id: model.id,
        order_number: model.order_number,
        payment_session_id: model.payment_session_id,
        customer_email: model.customer_email,
        customer_name: model.customer_name,
        shipping_address: model.shipping_address,
        subtotal_cents: model.subtotal_cents,
        discount_cents: model.discount_cents,
        total_cents: model.total_cents,
        currency: model.currency,
        discount_code: model.discount_code,
        status: model.status,
        items,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
