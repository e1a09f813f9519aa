use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::checkout::create_checkout_session,
        crate::handlers::payment_webhooks::payment_webhook,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::designs::list_designs,
        crate::handlers::designs::get_design,
        crate::handlers::designs::create_design,
        crate::handlers::designs::update_design,
        crate::handlers::designs::delete_design,
        crate::handlers::templates::list_templates,
        crate::handlers::templates::get_template,
        crate::handlers::templates::create_template,
        crate::handlers::templates::update_template,
        crate::handlers::templates::delete_template,
        crate::handlers::discounts::validate_discount,
        crate::handlers::discounts::create_discount,
        crate::handlers::discounts::list_discounts,
        crate::handlers::discounts::delete_discount,
        crate::handlers::settings::get_settings,
        crate::handlers::settings::update_settings,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::payments::PaymentSession,
        crate::services::catalog::ItemRef,
        crate::services::checkout::CheckoutItemRequest,
        crate::services::checkout::CheckoutRequest,
        crate::services::orders::OrderResponse,
        crate::services::orders::OrderListResponse,
        crate::services::orders::UpdateOrderStatusRequest,
        crate::entities::order::OrderStatus,
        crate::entities::order_item::Model,
        crate::entities::discount::DiscountKind,
        crate::services::products::CreateProductRequest,
        crate::services::products::UpdateProductRequest,
        crate::services::designs::CreateDesignRequest,
        crate::services::designs::UpdateDesignRequest,
        crate::services::templates::CreateTemplateRequest,
        crate::services::templates::UpdateTemplateRequest,
        crate::services::discounts::CreateDiscountRequest,
        crate::handlers::discounts::ValidateDiscountRequest,
        crate::handlers::discounts::ValidateDiscountResponse,
        crate::handlers::common::PaginationMeta,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Checkout", description = "Server-priced checkout sessions"),
        (name = "Payments", description = "Payment provider webhooks"),
        (name = "Orders", description = "Order administration"),
        (name = "Catalog", description = "Products, designs, and templates"),
        (name = "Discounts", description = "Discount codes"),
        (name = "Settings", description = "Store settings")
    ),
    info(
        title = "Printshop API",
        description = "Storefront backend: catalog, discounts, checkout, and order creation"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
