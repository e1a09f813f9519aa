use async_trait::async_trait;
use tracing::info;

use crate::errors::ServiceError;

/// Outbound transactional email seam.
///
/// Delivery runs from the event loop, after the order has committed;
/// failures are logged by the caller and never affect the order. The real
/// transport is a collaborator — this crate ships a tracing-backed
/// implementation.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_order_confirmation(
        &self,
        to: &str,
        order_number: i64,
        total_cents: i64,
        currency: &str,
    ) -> Result<(), ServiceError>;

    async fn send_staff_notification(
        &self,
        to: &str,
        order_number: i64,
        total_cents: i64,
        currency: &str,
    ) -> Result<(), ServiceError>;
}

/// Logs instead of sending. Default in development and tests.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_order_confirmation(
        &self,
        to: &str,
        order_number: i64,
        total_cents: i64,
        currency: &str,
    ) -> Result<(), ServiceError> {
        info!(to = %to, order_number, total_cents, currency = %currency,
            "Order confirmation email (log transport)");
        Ok(())
    }

    async fn send_staff_notification(
        &self,
        to: &str,
        order_number: i64,
        total_cents: i64,
        currency: &str,
    ) -> Result<(), ServiceError> {
        info!(to = %to, order_number, total_cents, currency = %currency,
            "Staff new-order notification (log transport)");
        Ok(())
    }
}
