use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    events::{Event, EventSender},
    payments::{CreateSessionRequest, PaymentProvider, PaymentSession, ProviderLineItem},
    services::{
        catalog::{CatalogResolver, ItemRef},
        discounts::DiscountService,
    },
};

/// One requested line item. Display fields are optional client metadata
/// used for the hosted checkout page only; price is always re-derived
/// server-side.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CheckoutItemRequest {
    #[serde(flatten)]
    pub item: ItemRef,
    pub quantity: i64,
    /// Client display name, trusted for UX only
    pub name: Option<String>,
    /// Client image URL, trusted for UX only
    pub image_url: Option<String>,
    /// Variant descriptor (size / color / bead size)
    pub size: Option<String>,
    pub color: Option<String>,
    pub bead_size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItemRequest>,
    pub discount_code: Option<String>,
}

/// A repriced line item carried through discount distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_cents: i64,
    pub quantity: i64,
    /// Unit price after the per-unit discount share is subtracted
    pub discounted_unit_cents: i64,
}

impl PricedLine {
    pub fn new(unit_cents: i64, quantity: i64) -> Self {
        Self {
            unit_cents,
            quantity,
            discounted_unit_cents: unit_cents,
        }
    }
}

/// Endpoints-facing checkout configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Upper bound on a single line's quantity. Anything above this is not a
/// storefront purchase, and the cap keeps every cent computation safely
/// inside i64.
pub const MAX_LINE_QUANTITY: i64 = 1_000;

/// Builds monetarily-correct payment sessions from untrusted carts.
#[derive(Clone)]
pub struct CheckoutService {
    catalog: CatalogResolver,
    discounts: DiscountService,
    provider: Arc<dyn PaymentProvider>,
    event_sender: EventSender,
    config: CheckoutConfig,
}

impl CheckoutService {
    pub fn new(
        catalog: CatalogResolver,
        discounts: DiscountService,
        provider: Arc<dyn PaymentProvider>,
        event_sender: EventSender,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            catalog,
            discounts,
            provider,
            event_sender,
            config,
        }
    }

    /// Validates and reprices the cart, applies the discount, and opens a
    /// payment session. Persists nothing; returns the redirect handle.
    ///
    /// Resolution or validation failure anywhere rejects the whole request:
    /// partial carts are never partially priced.
    #[instrument(skip(self, user, request), fields(user_id = %user.user_id, items = request.items.len()))]
    pub async fn create_session(
        &self,
        user: &AuthenticatedUser,
        request: CheckoutRequest,
    ) -> Result<PaymentSession, ServiceError> {
        if request.items.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Checkout requires at least one line item".to_string(),
            ));
        }
        for item in &request.items {
            if item.quantity <= 0 {
                return Err(ServiceError::InvalidInput(
                    "Line item quantities must be positive integers".to_string(),
                ));
            }
            if item.quantity > MAX_LINE_QUANTITY {
                return Err(ServiceError::InvalidInput(format!(
                    "Line item quantity exceeds the maximum of {MAX_LINE_QUANTITY}"
                )));
            }
        }

        // Reprice every line against the live catalog. Read-only and
        // independent per line, so the lookups run concurrently.
        let resolved = futures::future::try_join_all(
            request.items.iter().map(|item| self.catalog.resolve(&item.item)),
        )
        .await?;

        let mut lines: Vec<PricedLine> = resolved
            .iter()
            .zip(&request.items)
            .map(|(r, item)| PricedLine::new(r.unit_cents, item.quantity))
            .collect();

        let subtotal: Decimal = resolved
            .iter()
            .zip(&request.items)
            .map(|(r, item)| r.unit_price * Decimal::from(item.quantity))
            .sum();
        let subtotal_cents = checked_subtotal_cents(&lines)?;

        // Evaluate the discount against the authoritative subtotal, then
        // spread it over the lines in integer cents.
        let mut metadata = HashMap::new();
        metadata.insert("user_id".to_string(), user.user_id.clone());

        if let Some(code) = &request.discount_code {
            let validated = self.discounts.validate(code, subtotal).await?;
            let applied = distribute_discount(&mut lines, validated.amount_cents);
            info!(
                code = %validated.discount.code,
                authorized_cents = validated.amount_cents,
                applied_cents = applied,
                "Discount distributed across line items"
            );
            metadata.insert("discount_code".to_string(), validated.discount.code.clone());
            metadata.insert(
                "discount_cents".to_string(),
                validated.amount_cents.to_string(),
            );
        }

        let line_items = resolved
            .iter()
            .zip(&request.items)
            .zip(&lines)
            .map(|((r, item), line)| ProviderLineItem {
                name: item.name.clone().unwrap_or_else(|| r.name.clone()),
                description: variant_description(item),
                image_url: item.image_url.clone().or_else(|| r.image_url.clone()),
                unit_amount_cents: line.discounted_unit_cents,
                quantity: line.quantity,
            })
            .collect();

        let session = self
            .provider
            .create_session(CreateSessionRequest {
                line_items,
                currency: self.config.currency.clone(),
                customer_email: user.email.clone(),
                success_url: self.config.success_url.clone(),
                cancel_url: self.config.cancel_url.clone(),
                metadata,
            })
            .await?;

        self.event_sender
            .send(Event::CheckoutSessionCreated {
                session_id: session.id.clone(),
                total_cents: lines
                    .iter()
                    .map(|l| l.discounted_unit_cents * l.quantity)
                    .sum(),
            })
            .await;

        info!(session_id = %session.id, subtotal_cents, "Payment session created");
        Ok(session)
    }
}

/// Sums line totals with overflow detection. Quantities are already capped,
/// but catalog prices are admin-controlled i64 cents, so the sum still gets
/// checked arithmetic rather than a wrapping panic.
fn checked_subtotal_cents(lines: &[PricedLine]) -> Result<i64, ServiceError> {
    let mut subtotal: i64 = 0;
    for line in lines {
        let line_total = line
            .unit_cents
            .checked_mul(line.quantity)
            .ok_or_else(overflow_error)?;
        subtotal = subtotal.checked_add(line_total).ok_or_else(overflow_error)?;
    }
    Ok(subtotal)
}

fn overflow_error() -> ServiceError {
    ServiceError::InvalidInput("Cart total exceeds the representable amount".to_string())
}

/// Composes the provider-facing line description from the variant fields.
fn variant_description(item: &CheckoutItemRequest) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(size) = &item.size {
        parts.push(format!("Size: {size}"));
    }
    if let Some(color) = &item.color {
        parts.push(format!("Color: {color}"));
    }
    if let Some(bead) = &item.bead_size {
        parts.push(format!("Bead size: {bead}"));
    }
    if let ItemRef::Composite { side: Some(side), .. } = &item.item {
        parts.push(format!("Print: {side}"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Distributes an authorized discount across line items in integer cents.
///
/// Walks lines in order. Each line's assignable portion is capped at its
/// own total cost, then split evenly per unit with integer floor division;
/// only the floored, evenly-divided amount is subtracted from the running
/// remainder. Consequences, all intentional:
///
/// - no unit price ever goes below zero,
/// - the applied total never exceeds the authorized amount,
/// - up to `quantity - 1` cents per line can stay undistributed. That
///   bounded slack is specified behavior, not a rounding bug.
///
/// Returns the total cents actually applied.
pub fn distribute_discount(lines: &mut [PricedLine], discount_cents: i64) -> i64 {
    let mut remaining = discount_cents.max(0);
    let mut applied = 0i64;

    for line in lines.iter_mut() {
        if remaining <= 0 {
            break;
        }
        // Saturation keeps the function total even on inputs the checkout
        // path has not pre-validated.
        let line_total = line.unit_cents.saturating_mul(line.quantity);
        let portion = remaining.min(line_total);
        let per_unit = portion / line.quantity;
        if per_unit == 0 {
            continue;
        }

        line.discounted_unit_cents = line.unit_cents - per_unit;
        let used = per_unit * line.quantity;
        remaining -= used;
        applied += used;
    }

    applied
}
