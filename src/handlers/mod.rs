use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    events::EventSender,
    payments::PaymentProvider,
    services::{
        catalog::CatalogResolver,
        checkout::{CheckoutConfig, CheckoutService},
        designs::DesignService,
        discounts::DiscountService,
        orders::OrderService,
        products::ProductService,
        settings::StoreSettingsService,
        templates::TemplateService,
    },
    AppState,
};

pub mod checkout;
pub mod common;
pub mod designs;
pub mod discounts;
pub mod orders;
pub mod payment_webhooks;
pub mod products;
pub mod settings;
pub mod templates;

/// Every service the handlers dispatch into, wired once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub discounts: DiscountService,
    pub products: ProductService,
    pub designs: DesignService,
    pub templates: TemplateService,
    pub settings: StoreSettingsService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        provider: Arc<dyn PaymentProvider>,
        event_sender: EventSender,
        config: &AppConfig,
    ) -> Self {
        let discounts = DiscountService::new(db.clone());
        let checkout = CheckoutService::new(
            CatalogResolver::new(db.clone()),
            discounts.clone(),
            provider,
            event_sender.clone(),
            CheckoutConfig {
                currency: config.currency.clone(),
                success_url: config.checkout_success_url.clone(),
                cancel_url: config.checkout_cancel_url.clone(),
            },
        );
        let orders = OrderService::new(db.clone(), event_sender, config.order_number_start);

        Self {
            checkout,
            orders,
            discounts,
            products: ProductService::new(db.clone()),
            designs: DesignService::new(db.clone()),
            templates: TemplateService::new(db.clone()),
            settings: StoreSettingsService::new(db),
        }
    }
}

/// All `/api/v1` routes. Authorization lives in the extractors, not here:
/// storefront reads are public, checkout needs a buyer token, admin
/// mutations need the admin role.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(crate::health_check))
        .route("/status", get(crate::status))
        .route("/checkout-session", post(checkout::create_checkout_session))
        .route("/payments/webhook", post(payment_webhooks::payment_webhook))
        .route(
            "/orders",
            get(orders::list_orders),
        )
        .route(
            "/orders/:id",
            get(orders::get_order),
        )
        .route("/orders/:id/status", put(orders::update_order_status))
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/designs",
            get(designs::list_designs).post(designs::create_design),
        )
        .route(
            "/designs/:id",
            get(designs::get_design)
                .put(designs::update_design)
                .delete(designs::delete_design),
        )
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/templates/:id",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route(
            "/discounts",
            get(discounts::list_discounts).post(discounts::create_discount),
        )
        .route("/discounts/validate", post(discounts::validate_discount))
        .route("/discounts/:id", axum::routing::delete(discounts::delete_discount))
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
}
