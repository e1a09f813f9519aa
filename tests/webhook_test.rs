mod common;

use std::collections::HashMap;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use serde_json::json;

use common::{body_json, settle_events, stripe_signature, TestApp, WEBHOOK_SECRET};
use printshop_api::{
    entities::{discount, order, order_counter},
    payments::{ProviderLineItem, SessionRecord},
    services::discounts::CreateDiscountRequest,
};

fn paid_session(id: &str, discount_code: Option<&str>, discount_cents: i64) -> SessionRecord {
    let mut metadata = HashMap::new();
    metadata.insert("user_id".to_string(), "buyer-1".to_string());
    if let Some(code) = discount_code {
        metadata.insert("discount_code".to_string(), code.to_string());
        metadata.insert("discount_cents".to_string(), discount_cents.to_string());
    }

    SessionRecord {
        id: id.to_string(),
        payment_status: "paid".to_string(),
        customer_email: Some("buyer@example.com".to_string()),
        customer_name: Some("Test Buyer".to_string()),
        shipping_address: Some(json!({"line1": "1 Main St", "city": "Springfield"})),
        amount_total_cents: 2700 - discount_cents.min(2700),
        currency: "usd".to_string(),
        line_items: vec![ProviderLineItem {
            name: "Lava Bead Bracelet".to_string(),
            description: Some("Bead size: 8mm".to_string()),
            image_url: None,
            unit_amount_cents: (2700 - discount_cents.min(2700)) / 3,
            quantity: 3,
        }],
        metadata,
    }
}

fn completed_event(session_id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": { "id": session_id } }
    }))
    .unwrap()
}

async fn deliver(app: &TestApp, body: Vec<u8>) -> axum::response::Response {
    let sig = stripe_signature(&body, WEBHOOK_SECRET, Utc::now().timestamp());
    app.request_raw(
        Method::POST,
        "/api/v1/payments/webhook",
        body,
        vec![("Stripe-Signature", sig)],
    )
    .await
}

#[tokio::test]
async fn completed_session_materializes_one_order() {
    let app = TestApp::new().await;
    app.provider.prime_session(paid_session("cs_done_1", None, 0));

    let response = deliver(&app, completed_event("cs_done_1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["created"], true);
    assert_eq!(body["order_number"], 1000);

    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].payment_session_id, "cs_done_1");
    assert_eq!(orders[0].total_cents, 2700);
    assert_eq!(orders[0].subtotal_cents, 2700);
    assert_eq!(orders[0].customer_email, "buyer@example.com");
}

#[tokio::test]
async fn duplicate_deliveries_create_exactly_one_order() {
    let app = TestApp::new().await;
    app.provider.prime_session(paid_session("cs_dup", None, 0));

    let first = deliver(&app, completed_event("cs_dup")).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_json(first).await["created"], true);

    let second = deliver(&app, completed_event("cs_dup")).await;
    assert_eq!(second.status(), StatusCode::OK);
    let body = body_json(second).await;
    assert_eq!(body["created"], false);
    // Both deliveries point at the same order.
    assert_eq!(body["order_number"], 1000);

    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
async fn order_numbers_are_sequential_across_sessions() {
    let app = TestApp::new().await;
    app.provider.prime_session(paid_session("cs_a", None, 0));
    app.provider.prime_session(paid_session("cs_b", None, 0));

    let first = body_json(deliver(&app, completed_event("cs_a")).await).await;
    let second = body_json(deliver(&app, completed_event("cs_b")).await).await;
    assert_eq!(first["order_number"], 1000);
    assert_eq!(second["order_number"], 1001);

    // The counter row is the single source of the sequence and has advanced
    // past both handed-out numbers.
    let counter = order_counter::Entity::find_by_id(1)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counter.next_number, 1002);
}

#[tokio::test]
async fn discount_metadata_reconstructs_subtotal_and_counts_usage() {
    let app = TestApp::new().await;

    app.state
        .services
        .discounts
        .create(CreateDiscountRequest {
            code: "SAVE10".to_string(),
            kind: printshop_api::entities::discount::DiscountKind::Percentage,
            value: dec!(10),
            min_purchase: None,
            usage_limit: Some(5),
            expires_at: None,
        })
        .await
        .unwrap();

    app.provider
        .prime_session(paid_session("cs_disc", Some("SAVE10"), 270));

    let body = body_json(deliver(&app, completed_event("cs_disc")).await).await;
    assert_eq!(body["created"], true);

    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(orders[0].discount_cents, 270);
    assert_eq!(orders[0].total_cents, 2430);
    // Subtotal is reconstructed as charged total plus the discount.
    assert_eq!(orders[0].subtotal_cents, 2700);
    assert_eq!(orders[0].discount_code.as_deref(), Some("SAVE10"));

    // Usage accounting runs through the event loop after commit.
    settle_events().await;
    let discount = discount::Entity::find()
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(discount.used_count, 1);
}

#[tokio::test]
async fn duplicate_deliveries_do_not_double_count_usage() {
    let app = TestApp::new().await;

    app.state
        .services
        .discounts
        .create(CreateDiscountRequest {
            code: "ONCE".to_string(),
            kind: printshop_api::entities::discount::DiscountKind::Fixed,
            value: dec!(2.70),
            min_purchase: None,
            usage_limit: None,
            expires_at: None,
        })
        .await
        .unwrap();

    app.provider
        .prime_session(paid_session("cs_once", Some("ONCE"), 270));

    deliver(&app, completed_event("cs_once")).await;
    deliver(&app, completed_event("cs_once")).await;
    settle_events().await;

    let discount = discount::Entity::find()
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(discount.used_count, 1);
}

#[tokio::test]
async fn invalid_signatures_are_rejected_before_any_processing() {
    let app = TestApp::new().await;
    app.provider.prime_session(paid_session("cs_sig", None, 0));
    let body = completed_event("cs_sig");

    // Missing header.
    let missing = app
        .request_raw(Method::POST, "/api/v1/payments/webhook", body.clone(), vec![])
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    // Wrong secret.
    let sig = stripe_signature(&body, "whsec_wrong", Utc::now().timestamp());
    let wrong = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            body.clone(),
            vec![("Stripe-Signature", sig)],
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);

    // Stale timestamp with an otherwise valid MAC.
    let sig = stripe_signature(&body, WEBHOOK_SECRET, Utc::now().timestamp() - 3600);
    let stale = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            body,
            vec![("Stripe-Signature", sig)],
        )
        .await;
    assert_eq!(stale.status(), StatusCode::BAD_REQUEST);

    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn unpaid_sessions_and_other_event_types_create_nothing() {
    let app = TestApp::new().await;

    let mut unpaid = paid_session("cs_unpaid", None, 0);
    unpaid.payment_status = "unpaid".to_string();
    app.provider.prime_session(unpaid);

    let response = deliver(&app, completed_event("cs_unpaid")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["created"], false);

    let other = serde_json::to_vec(&json!({
        "id": "evt_2",
        "type": "payment_intent.created",
        "data": { "object": { "id": "pi_1" } }
    }))
    .unwrap();
    let response = deliver(&app, other).await;
    assert_eq!(response.status(), StatusCode::OK);

    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn provider_lookup_failure_returns_a_retryable_error() {
    let app = TestApp::new().await;
    // No session primed: the fetch fails upstream.
    let response = deliver(&app, completed_event("cs_missing")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
