use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use printshop_api::{
    app_router,
    auth::{issue_token, Claims},
    config::AppConfig,
    db,
    errors::ServiceError,
    events::{self, EventContext, EventSender},
    handlers::AppServices,
    payments::{CreateSessionRequest, PaymentProvider, PaymentSession, SessionRecord},
    services::notifications::LogMailer,
    AppState,
};

pub const JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret_for_integration_tests";

/// In-memory stand-in for the payment gateway. Records every session it
/// creates and serves back whatever `SessionRecord` the test primed.
#[derive(Default)]
pub struct MockPaymentProvider {
    pub created: Mutex<Vec<CreateSessionRequest>>,
    sessions: Mutex<HashMap<String, SessionRecord>>,
    counter: Mutex<u64>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primes the record returned by `fetch_session` for the given id.
    pub fn prime_session(&self, record: SessionRecord) {
        self.sessions
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn last_create_request(&self) -> Option<CreateSessionRequest> {
        self.created.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<PaymentSession, ServiceError> {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let id = format!("cs_test_{counter}");
        self.created.lock().unwrap().push(request);
        Ok(PaymentSession {
            id: id.clone(),
            url: format!("https://checkout.test/pay/{id}"),
        })
    }

    async fn fetch_session(&self, session_id: &str) -> Result<SessionRecord, ServiceError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::PaymentProviderError(format!("unknown session {session_id}"))
            })
    }
}

/// Application harness backed by a throwaway SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub provider: Arc<MockPaymentProvider>,
    admin_token: String,
    buyer_token: String,
    db_file: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_file);
    }
}

impl TestApp {
    pub async fn new() -> Self {
        // A uniquely named file keeps parallel test binaries isolated while
        // letting the pool open more than one connection.
        let db_file = format!("printshop_test_{}.db", Uuid::new_v4().simple());
        let mut cfg = AppConfig::new(
            format!("sqlite://{db_file}?mode=rwc"),
            JWT_SECRET.to_string(),
            "sk_test_key".to_string(),
            "test".to_string(),
        );
        cfg.payment_webhook_secret = Some(WEBHOOK_SECRET.to_string());

        let pool = db::establish_connection(&cfg.database_url)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);

        let provider = Arc::new(MockPaymentProvider::new());
        let services = Arc::new(AppServices::new(
            db_arc.clone(),
            provider.clone(),
            event_sender.clone(),
            &cfg,
        ));

        let event_task = tokio::spawn(events::process_events(
            event_rx,
            EventContext {
                discounts: services.discounts.clone(),
                mailer: Arc::new(LogMailer),
                staff_email: None,
            },
        ));

        let state = AppState {
            db: db_arc,
            config: Arc::new(cfg),
            event_sender,
            services,
            provider: provider.clone(),
        };

        let admin_token = token_for("staff-1", "staff@example.com", vec!["admin".to_string()]);
        let buyer_token = token_for("buyer-1", "buyer@example.com", vec![]);

        Self {
            router: app_router(state.clone()),
            state,
            provider,
            admin_token,
            buyer_token,
            db_file,
            _event_task: event_task,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn buyer_token(&self) -> &str {
        &self.buyer_token
    }

    /// Sends a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {tok}"));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a raw-body request with explicit headers (webhook deliveries).
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: Vec<u8>,
        headers: Vec<(&str, String)>,
    ) -> axum::response::Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let request = builder.body(Body::from(body)).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub fn token_for(sub: &str, email: &str, roles: Vec<String>) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        name: Some("Test User".to_string()),
        email: email.to_string(),
        roles,
        exp: (Utc::now() + chrono::Duration::hours(1)).timestamp(),
    };
    issue_token(&claims, JWT_SECRET).expect("sign test token")
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}

/// Signs a webhook payload the way the payment provider does.
pub fn stripe_signature(body: &[u8], secret: &str, timestamp: i64) -> String {
    use hmac::{Hmac, Mac};
    let mut mac =
        Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).expect("hmac key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

/// Waits briefly for the event loop to drain side effects.
pub async fn settle_events() {
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}
