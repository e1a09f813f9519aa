use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};

use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    handlers::common::created_response,
    services::checkout::CheckoutRequest,
    AppState,
};

/// Opens a hosted payment session for the authenticated buyer's cart.
///
/// Prices are re-derived from the catalog and the discount is evaluated
/// server-side; the only client-trusted fields are display metadata.
/// Every rejection on this endpoint is client-correctable: malformed
/// bodies and carts referencing items that no longer exist both come back
/// as 400, never 404/422.
#[utoipa::path(
    post,
    path = "/api/v1/checkout-session",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Payment session created", body = crate::payments::PaymentSession),
        (status = 400, description = "Malformed body, empty cart, bad quantity, unresolvable item, or rejected discount", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(request) = payload?;

    let session = state
        .services
        .checkout
        .create_session(&user, request)
        .await
        .map_err(|e| match e {
            // An unresolvable reference means a stale cart, not a missing
            // resource on this endpoint.
            ServiceError::NotFound(msg) => ServiceError::InvalidInput(msg),
            other => other,
        })?;

    Ok(created_response(session))
}
