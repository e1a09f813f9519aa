use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::{discounts::DiscountService, notifications::Mailer};

/// Events emitted after state changes commit. Consumers run side effects
/// off the request path; a failed side effect never rolls back the change
/// that produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CheckoutSessionCreated {
        session_id: String,
        total_cents: i64,
    },
    OrderCreated {
        order_id: Uuid,
        order_number: i64,
        customer_email: String,
        total_cents: i64,
        currency: String,
        discount_code: Option<String>,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    DiscountCreated(Uuid),
    DiscountDeleted(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event. Delivery failure is logged, never propagated: events
    /// are best-effort by design.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to enqueue event: {}", e);
        }
    }
}

/// Dependencies the event loop needs to run side effects.
pub struct EventContext {
    pub discounts: DiscountService,
    pub mailer: Arc<dyn Mailer>,
    pub staff_email: Option<String>,
}

/// Processes events until the channel closes. Spawned once at startup.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, ctx: EventContext) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderCreated {
                order_id,
                order_number,
                customer_email,
                total_cents,
                currency,
                discount_code,
            } => {
                // Usage accounting happens here, once, after payment
                // actually completed. The order is already committed;
                // failures are logged only.
                if let Some(code) = &discount_code {
                    if let Err(e) = ctx.discounts.increment_usage(code).await {
                        error!(order_id = %order_id, code = %code, error = %e,
                            "Failed to increment discount usage");
                    }
                }

                if let Err(e) = ctx
                    .mailer
                    .send_order_confirmation(&customer_email, order_number, total_cents, &currency)
                    .await
                {
                    error!(order_id = %order_id, error = %e,
                        "Failed to send order confirmation email");
                }

                if let Some(staff) = &ctx.staff_email {
                    if let Err(e) = ctx
                        .mailer
                        .send_staff_notification(staff, order_number, total_cents, &currency)
                        .await
                    {
                        error!(order_id = %order_id, error = %e,
                            "Failed to send staff notification email");
                    }
                }
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id = %order_id, old_status = %old_status, new_status = %new_status,
                    "Order status changed");
            }
            Event::CheckoutSessionCreated {
                session_id,
                total_cents,
            } => {
                info!(session_id = %session_id, total_cents, "Checkout session created");
            }
            Event::DiscountCreated(id) => {
                info!(discount_id = %id, "Discount created");
            }
            Event::DiscountDeleted(id) => {
                info!(discount_id = %id, "Discount deleted");
            }
        }
    }

    warn!("Event processing loop has ended");
}
