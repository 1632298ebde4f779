//! Tag permission HTTP handlers.
//!
//! Mutations require the caller to be a site admin or hold `admin` on the
//! tag. Each mutation writes exactly one audit entry.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cadenza_core::{
    AddPermissionRequest, PermissionEntry, TagPermissions, UpdatePermissionRequest,
};
use uuid::Uuid;

use crate::{ApiError, AppState, RequireAuth};

#[utoipa::path(get, path = "/api/v1/tags/permissions", tag = "Permissions",
    responses((status = 200, description = "Assignments grouped by tag",
        body = std::collections::BTreeMap<String, Vec<PermissionEntry>>)),
    security(("bearer" = [])))]
pub async fn list_all_permissions(
    State(state): State<AppState>,
    _auth: RequireAuth,
) -> Result<Json<TagPermissions>, ApiError> {
    Ok(Json(
        state.governance.permissions.list_all_permissions().await?,
    ))
}

#[utoipa::path(get, path = "/api/v1/tags/{tag}/permissions", tag = "Permissions",
    params(("tag" = String, Path, description = "Tag name")),
    responses((status = 200, description = "Assignments on the tag", body = Vec<PermissionEntry>)),
    security(("bearer" = [])))]
pub async fn list_permissions(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(tag): Path<String>,
) -> Result<Json<Vec<PermissionEntry>>, ApiError> {
    Ok(Json(state.governance.permissions.list_permissions(&tag).await?))
}

#[utoipa::path(post, path = "/api/v1/tags/{tag}/permissions", tag = "Permissions",
    params(("tag" = String, Path, description = "Tag name")),
    request_body = AddPermissionRequest,
    responses(
        (status = 201, description = "Role assigned", body = PermissionEntry),
        (status = 403, description = "Caller is not an admin of the tag"),
        (status = 404, description = "Target user does not exist"),
        (status = 409, description = "User already has a role on the tag")),
    security(("bearer" = [])))]
pub async fn add_permission(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Path(tag): Path<String>,
    Json(req): Json<AddPermissionRequest>,
) -> Result<(StatusCode, Json<PermissionEntry>), ApiError> {
    let entry = state
        .governance
        .permissions
        .add_permission(&tag, req, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(patch, path = "/api/v1/tags/{tag}/permissions/{user_id}", tag = "Permissions",
    params(
        ("tag" = String, Path, description = "Tag name"),
        ("user_id" = Uuid, Path, description = "Target user")),
    request_body = UpdatePermissionRequest,
    responses(
        (status = 200, description = "Role changed", body = PermissionEntry),
        (status = 403, description = "Caller is not an admin of the tag"),
        (status = 404, description = "No assignment for this user on the tag")),
    security(("bearer" = [])))]
pub async fn update_permission(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Path((tag, user_id)): Path<(String, Uuid)>,
    Json(req): Json<UpdatePermissionRequest>,
) -> Result<Json<PermissionEntry>, ApiError> {
    let entry = state
        .governance
        .permissions
        .update_permission(&tag, user_id, req, &actor)
        .await?;
    Ok(Json(entry))
}

#[utoipa::path(delete, path = "/api/v1/tags/{tag}/permissions/{user_id}", tag = "Permissions",
    params(
        ("tag" = String, Path, description = "Tag name"),
        ("user_id" = Uuid, Path, description = "Target user")),
    responses(
        (status = 204, description = "Role removed"),
        (status = 403, description = "Caller is not an admin of the tag"),
        (status = 404, description = "No assignment for this user on the tag")),
    security(("bearer" = [])))]
pub async fn remove_permission(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Path((tag, user_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .governance
        .permissions
        .remove_permission(&tag, user_id, &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
