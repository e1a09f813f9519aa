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
    services::designs::{CreateDesignRequest, UpdateDesignRequest},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/designs",
    params(PaginationParams),
    responses((status = 200, description = "Paginated active designs")),
    tag = "Catalog"
)]
pub async fn list_designs(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (designs, total) = state
        .services
        .designs
        .list(pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        designs,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/designs/{id}",
    params(("id" = Uuid, Path, description = "Design id")),
    responses(
        (status = 200, description = "Design"),
        (status = 404, description = "Design not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_design(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let design = state
        .services
        .designs
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Design {id} not found")))?;
    Ok(success_response(design))
}

#[utoipa::path(
    post,
    path = "/api/v1/designs",
    request_body = CreateDesignRequest,
    responses(
        (status = 201, description = "Design created"),
        (status = 400, description = "Validation failure", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_design(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateDesignRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let design = state.services.designs.create(request).await?;
    Ok(created_response(design))
}

#[utoipa::path(
    put,
    path = "/api/v1/designs/{id}",
    params(("id" = Uuid, Path, description = "Design id")),
    request_body = UpdateDesignRequest,
    responses(
        (status = 200, description = "Design updated"),
        (status = 404, description = "Design not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_design(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDesignRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let design = state.services.designs.update(id, request).await?;
    Ok(success_response(design))
}

#[utoipa::path(
    delete,
    path = "/api/v1/designs/{id}",
    params(("id" = Uuid, Path, description = "Design id")),
    responses(
        (status = 204, description = "Design deleted"),
        (status = 404, description = "Design not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_design(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.designs.delete(id).await?;
    Ok(no_content_response())
}
