use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use crate::errors::ServiceError;

/// A provider-side checkout line item, in integer minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderLineItem {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub unit_amount_cents: i64,
    pub quantity: i64,
}

/// Request to open a hosted payment session.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub line_items: Vec<ProviderLineItem>,
    pub currency: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Opaque reconciliation data (buyer id, discount code and amount).
    /// Size-limited on the provider side; never the source of truth.
    pub metadata: HashMap<String, String>,
}

/// Handle to a newly created payment session.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PaymentSession {
    pub id: String,
    pub url: String,
}

/// The provider's authoritative record of a session, fetched after a
/// completion event. The webhook path builds orders from this, not from
/// event metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub payment_status: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub shipping_address: Option<serde_json::Value>,
    pub amount_total_cents: i64,
    pub currency: String,
    pub line_items: Vec<ProviderLineItem>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// External payment gateway seam. The HTTP implementation talks to a
/// Stripe-compatible API; tests swap in an in-memory double.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<PaymentSession, ServiceError>;

    async fn fetch_session(&self, session_id: &str) -> Result<SessionRecord, ServiceError>;
}

/// Stripe-compatible HTTP client.
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl StripeClient {
    pub fn new(api_base: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
    payment_status: Option<String>,
    customer_email: Option<String>,
    customer_details: Option<StripeCustomerDetails>,
    amount_total: Option<i64>,
    currency: Option<String>,
    line_items: Option<StripeList<StripeLineItem>>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomerDetails {
    email: Option<String>,
    name: Option<String>,
    address: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripeLineItem {
    description: Option<String>,
    quantity: Option<i64>,
    price: Option<StripePrice>,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    unit_amount: Option<i64>,
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self, request), fields(items = request.line_items.len()))]
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<PaymentSession, ServiceError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url),
            ("cancel_url".to_string(), request.cancel_url),
            ("customer_email".to_string(), request.customer_email),
        ];

        for (i, item) in request.line_items.iter().enumerate() {
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                request.currency.clone(),
            ));
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                item.unit_amount_cents.to_string(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            if let Some(desc) = &item.description {
                form.push((
                    format!("line_items[{i}][price_data][product_data][description]"),
                    desc.clone(),
                ));
            }
            if let Some(image) = &item.image_url {
                form.push((
                    format!("line_items[{i}][price_data][product_data][images][0]"),
                    image.clone(),
                ));
            }
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        }

        for (key, value) in &request.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.api_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| ServiceError::PaymentProviderError(format!("session create: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Payment session creation rejected: {}", body);
            return Err(ServiceError::PaymentProviderError(format!(
                "session create returned {status}"
            )));
        }

        let session: StripeSession = response
            .json()
            .await
            .map_err(|e| ServiceError::PaymentProviderError(format!("session decode: {e}")))?;

        let url = session.url.ok_or_else(|| {
            ServiceError::PaymentProviderError("session response missing redirect url".to_string())
        })?;

        Ok(PaymentSession {
            id: session.id,
            url,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_session(&self, session_id: &str) -> Result<SessionRecord, ServiceError> {
        let response = self
            .http
            .get(format!(
                "{}/v1/checkout/sessions/{session_id}",
                self.api_base
            ))
            .query(&[("expand[]", "line_items")])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ServiceError::PaymentProviderError(format!("session fetch: {e}")))?;

        if !response.status().is_success() {
            return Err(ServiceError::PaymentProviderError(format!(
                "session fetch returned {}",
                response.status()
            )));
        }

        let session: StripeSession = response
            .json()
            .await
            .map_err(|e| ServiceError::PaymentProviderError(format!("session decode: {e}")))?;

        let line_items = session
            .line_items
            .map(|list| {
                list.data
                    .into_iter()
                    .map(|li| ProviderLineItem {
                        name: li.description.clone().unwrap_or_default(),
                        description: li.description,
                        image_url: None,
                        unit_amount_cents: li.price.and_then(|p| p.unit_amount).unwrap_or(0),
                        quantity: li.quantity.unwrap_or(1),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let details = session.customer_details;

        Ok(SessionRecord {
            id: session.id,
            payment_status: session.payment_status.unwrap_or_default(),
            customer_email: details
                .as_ref()
                .and_then(|d| d.email.clone())
                .or(session.customer_email),
            customer_name: details.as_ref().and_then(|d| d.name.clone()),
            shipping_address: details.and_then(|d| d.address),
            amount_total_cents: session.amount_total.unwrap_or(0),
            currency: session.currency.unwrap_or_default(),
            line_items,
            metadata: session.metadata,
        })
    }
}
