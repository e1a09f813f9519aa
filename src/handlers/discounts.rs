use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    errors::ServiceError,
    events::Event,
    handlers::common::{
        created_response, no_content_response, success_response, PaginatedResponse,
        PaginationParams,
    },
    services::discounts::CreateDiscountRequest,
    AppState,
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ValidateDiscountRequest {
    pub code: String,
    /// Cart subtotal in major currency units
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ValidateDiscountResponse {
    pub valid: bool,
    pub code: String,
    /// Discount amount in major currency units, clamped to the subtotal
    pub amount: Decimal,
    /// Same amount in integer minor currency units
    pub amount_cents: i64,
}

/// Preflight discount check for the cart page. Read-only: usage counts
/// only move when a payment actually completes.
#[utoipa::path(
    post,
    path = "/api/v1/discounts/validate",
    request_body = ValidateDiscountRequest,
    responses(
        (status = 200, description = "Code applies to this subtotal", body = ValidateDiscountResponse),
        (status = 400, description = "Code rejected", body = crate::errors::ErrorResponse)
    ),
    tag = "Discounts"
)]
pub async fn validate_discount(
    State(state): State<AppState>,
    Json(request): Json<ValidateDiscountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let validated = state
        .services
        .discounts
        .validate(&request.code, request.subtotal)
        .await?;
    Ok(success_response(ValidateDiscountResponse {
        valid: true,
        code: validated.discount.code,
        amount: validated.amount,
        amount_cents: validated.amount_cents,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/discounts",
    request_body = CreateDiscountRequest,
    responses(
        (status = 201, description = "Discount created"),
        (status = 400, description = "Validation failure", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Discounts"
)]
pub async fn create_discount(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateDiscountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let discount = state.services.discounts.create(request).await?;
    state.event_sender.send(Event::DiscountCreated(discount.id)).await;
    Ok(created_response(discount))
}

#[utoipa::path(
    get,
    path = "/api/v1/discounts",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated discounts"),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Discounts"
)]
pub async fn list_discounts(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (discounts, total) = state
        .services
        .discounts
        .list(pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        discounts,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/discounts/{id}",
    params(("id" = Uuid, Path, description = "Discount id")),
    responses(
        (status = 204, description = "Discount deleted"),
        (status = 404, description = "Discount not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Discounts"
)]
pub async fn delete_discount(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.discounts.delete(id).await?;
    state.event_sender.send(Event::DiscountDeleted(id)).await;
    Ok(no_content_response())
}
