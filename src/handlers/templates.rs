use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, success_response, PaginatedResponse,
        PaginationParams,
    },
    services::templates::{CreateTemplateRequest, UpdateTemplateRequest},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/templates",
    params(PaginationParams),
    responses((status = 200, description = "Paginated active product templates")),
    tag = "Catalog"
)]
pub async fn list_templates(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (templates, total) = state
        .services
        .templates
        .list(pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        templates,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/templates/{id}",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 200, description = "Product template"),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let template = state
        .services
        .templates
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product template {id} not found")))?;
    Ok(success_response(template))
}

#[utoipa::path(
    post,
    path = "/api/v1/templates",
    request_body = CreateTemplateRequest,
    responses(
        (status = 201, description = "Template created"),
        (status = 400, description = "Validation failure", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_template(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let template = state.services.templates.create(request).await?;
    Ok(created_response(template))
}

#[utoipa::path(
    put,
    path = "/api/v1/templates/{id}",
    params(("id" = Uuid, Path, description = "Template id")),
    request_body = UpdateTemplateRequest,
    responses(
        (status = 200, description = "Template updated"),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_template(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTemplateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let template = state.services.templates.update(id, request).await?;
    Ok(success_response(template))
}

#[utoipa::path(
    delete,
    path = "/api/v1/templates/{id}",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_template(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.templates.delete(id).await?;
    Ok(no_content_response())
}
