//! Permission template HTTP handlers.
//!
//! CRUD over `/api/v1/permission-templates` plus bulk application of a
//! template's assignments to a list of tags.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cadenza_core::{
    ApplyTemplateRequest, CreatePermissionTemplateRequest, PermissionTemplate,
    TemplateApplication, UpdatePermissionTemplateRequest,
};
use uuid::Uuid;

use crate::{ApiError, AppState, RequireAuth};

#[utoipa::path(get, path = "/api/v1/permission-templates", tag = "Templates",
    responses((status = 200, description = "All templates", body = Vec<PermissionTemplate>)),
    security(("bearer" = [])))]
pub async fn list_templates(
    State(state): State<AppState>,
    _auth: RequireAuth,
) -> Result<Json<Vec<PermissionTemplate>>, ApiError> {
    Ok(Json(state.governance.templates.list_templates().await?))
}

#[utoipa::path(post, path = "/api/v1/permission-templates", tag = "Templates",
    request_body = CreatePermissionTemplateRequest,
    responses(
        (status = 201, description = "Template created", body = PermissionTemplate),
        (status = 400, description = "Empty name or a user listed twice")),
    security(("bearer" = [])))]
pub async fn create_template(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Json(req): Json<CreatePermissionTemplateRequest>,
) -> Result<(StatusCode, Json<PermissionTemplate>), ApiError> {
    let template = state.governance.templates.create_template(req).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(get, path = "/api/v1/permission-templates/{id}", tag = "Templates",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 200, description = "Template", body = PermissionTemplate),
        (status = 404, description = "Unknown template")),
    security(("bearer" = [])))]
pub async fn get_template(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<PermissionTemplate>, ApiError> {
    Ok(Json(state.governance.templates.get_template(id).await?))
}

#[utoipa::path(patch, path = "/api/v1/permission-templates/{id}", tag = "Templates",
    params(("id" = Uuid, Path, description = "Template id")),
    request_body = UpdatePermissionTemplateRequest,
    responses(
        (status = 200, description = "Template updated", body = PermissionTemplate),
        (status = 404, description = "Unknown template")),
    security(("bearer" = [])))]
pub async fn update_template(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePermissionTemplateRequest>,
) -> Result<Json<PermissionTemplate>, ApiError> {
    Ok(Json(
        state.governance.templates.update_template(id, req).await?,
    ))
}

#[utoipa::path(delete, path = "/api/v1/permission-templates/{id}", tag = "Templates",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 404, description = "Unknown template")),
    security(("bearer" = [])))]
pub async fn delete_template(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.governance.templates.delete_template(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a template to tags.
///
/// Always `200` once the template is found; per-(tag, user) failures are
/// reported in `failed` rather than failing the request.
#[utoipa::path(post, path = "/api/v1/permission-templates/{id}/apply", tag = "Templates",
    params(("id" = Uuid, Path, description = "Template id")),
    request_body = ApplyTemplateRequest,
    responses(
        (status = 200, description = "Per-assignment outcome", body = TemplateApplication),
        (status = 404, description = "Unknown template")),
    security(("bearer" = [])))]
pub async fn apply_template(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyTemplateRequest>,
) -> Result<Json<TemplateApplication>, ApiError> {
    Ok(Json(
        state
            .governance
            .templates
            .apply_template(id, &req.tags, &actor)
            .await?,
    ))
}
