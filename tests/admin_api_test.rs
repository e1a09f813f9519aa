mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;

use common::{body_json, TestApp};
use printshop_api::{
    entities::discount::DiscountKind,
    services::discounts::CreateDiscountRequest,
};

#[tokio::test]
async fn product_crud_requires_the_admin_role() {
    let app = TestApp::new().await;

    let payload = json!({
        "name": "Lava Bead Bracelet",
        "price": "24.99",
        "category": "bracelets",
        "bead_sizes": ["6mm", "8mm"]
    });

    // Buyers cannot mutate the catalog.
    let forbidden = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(payload.clone()),
            Some(app.buyer_token()),
        )
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let created = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(payload),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let product = body_json(created).await;
    let id = product["id"].as_str().unwrap().to_string();

    // Storefront reads are public.
    let fetched = app
        .request(Method::GET, &format!("/api/v1/products/{id}"), None, None)
        .await;
    assert_eq!(fetched.status(), StatusCode::OK);

    let listed = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(listed.status(), StatusCode::OK);
    let list = body_json(listed).await;
    assert_eq!(list["pagination"]["total"], 1);

    let updated = app
        .request(
            Method::PUT,
            &format!("/api/v1/products/{id}"),
            Some(json!({"in_stock": false})),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(body_json(updated).await["in_stock"], false);

    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/v1/products/{id}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .request(Method::GET, &format!("/api/v1/products/{id}"), None, None)
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn nonpositive_prices_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({"name": "Freebie", "price": "0"})),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn discount_validate_previews_without_consuming_usage() {
    let app = TestApp::new().await;

    app.state
        .services
        .discounts
        .create(CreateDiscountRequest {
            code: "welcome".to_string(),
            kind: DiscountKind::Fixed,
            value: dec!(5),
            min_purchase: Some(dec!(20)),
            usage_limit: Some(1),
            expires_at: None,
        })
        .await
        .unwrap();

    // Codes match case-insensitively; stored uppercased.
    let ok = app
        .request(
            Method::POST,
            "/api/v1/discounts/validate",
            Some(json!({"code": "Welcome", "subtotal": "25.00"})),
            None,
        )
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
    let body = body_json(ok).await;
    assert_eq!(body["code"], "WELCOME");
    assert_eq!(body["amount_cents"], 500);

    // Below the minimum purchase: same generic rejection as any failure.
    let below_min = app
        .request(
            Method::POST,
            "/api/v1/discounts/validate",
            Some(json!({"code": "WELCOME", "subtotal": "10.00"})),
            None,
        )
        .await;
    assert_eq!(below_min.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(below_min).await["message"],
        "Discount code is not valid for this order"
    );

    // Validation never writes: the single use is still available.
    let again = app
        .request(
            Method::POST,
            "/api/v1/discounts/validate",
            Some(json!({"code": "WELCOME", "subtotal": "25.00"})),
            None,
        )
        .await;
    assert_eq!(again.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_codes_are_rejected_with_the_generic_message() {
    let app = TestApp::new().await;

    app.state
        .services
        .discounts
        .create(CreateDiscountRequest {
            code: "BYGONE".to_string(),
            kind: DiscountKind::Fixed,
            value: dec!(5),
            min_purchase: None,
            usage_limit: None,
            expires_at: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
        })
        .await
        .unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/discounts/validate",
            Some(json!({"code": "BYGONE", "subtotal": "100.00"})),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Discount code is not valid for this order"
    );
}

#[tokio::test]
async fn exhausted_usage_limits_reject_the_code() {
    let app = TestApp::new().await;

    app.state
        .services
        .discounts
        .create(CreateDiscountRequest {
            code: "LAST1".to_string(),
            kind: DiscountKind::Fixed,
            value: dec!(5),
            min_purchase: None,
            usage_limit: Some(1),
            expires_at: None,
        })
        .await
        .unwrap();

    // Valid while the single use is unspent.
    let before = app
        .request(
            Method::POST,
            "/api/v1/discounts/validate",
            Some(json!({"code": "LAST1", "subtotal": "100.00"})),
            None,
        )
        .await;
    assert_eq!(before.status(), StatusCode::OK);

    // A completed payment consumes it; used_count reaching the limit closes
    // the code for everyone after.
    app.state
        .services
        .discounts
        .increment_usage("LAST1")
        .await
        .unwrap();

    let after = app
        .request(
            Method::POST,
            "/api/v1/discounts/validate",
            Some(json!({"code": "LAST1", "subtotal": "100.00"})),
            None,
        )
        .await;
    assert_eq!(after.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(after).await["message"],
        "Discount code is not valid for this order"
    );
}

#[tokio::test]
async fn percentage_discounts_over_100_are_rejected_at_creation() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/discounts",
            Some(json!({"code": "TOOHIGH", "kind": "percentage", "value": "150"})),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_admin_surface_is_role_gated() {
    let app = TestApp::new().await;

    let as_buyer = app
        .request(Method::GET, "/api/v1/orders", None, Some(app.buyer_token()))
        .await;
    assert_eq!(as_buyer.status(), StatusCode::FORBIDDEN);

    let anonymous = app.request(Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let as_admin = app
        .request(Method::GET, "/api/v1/orders", None, Some(app.admin_token()))
        .await;
    assert_eq!(as_admin.status(), StatusCode::OK);
    let body = body_json(as_admin).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn settings_round_trip_bumps_the_version() {
    let app = TestApp::new().await;

    let initial = app.request(Method::GET, "/api/v1/settings", None, None).await;
    assert_eq!(initial.status(), StatusCode::OK);
    let initial = body_json(initial).await;
    assert_eq!(initial["version"], 1);

    let updated = app
        .request(
            Method::PUT,
            "/api/v1/settings",
            Some(json!({"banner": "Summer sale", "free_shipping_over": 50})),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = body_json(updated).await;
    assert_eq!(updated["version"], 2);
    assert_eq!(updated["settings"]["banner"], "Summer sale");

    // Buyers cannot write settings.
    let forbidden = app
        .request(
            Method::PUT,
            "/api/v1/settings",
            Some(json!({})),
            Some(app.buyer_token()),
        )
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
