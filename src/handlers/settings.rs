use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    auth::AdminUser, errors::ServiceError, handlers::common::success_response, AppState,
};

/// Public read of the storefront settings document.
#[utoipa::path(
    get,
    path = "/api/v1/settings",
    responses((status = 200, description = "Current store settings")),
    tag = "Settings"
)]
pub async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let settings = state.services.settings.get().await?;
    Ok(success_response(settings))
}

#[utoipa::path(
    put,
    path = "/api/v1/settings",
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Updated settings with bumped version"),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(settings): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.services.settings.update(settings).await?;
    Ok(success_response(updated))
}
