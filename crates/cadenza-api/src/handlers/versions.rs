use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cadenza_core::{CreateTagVersionRequest, TagVersion};

use crate::{ApiError, AppState, RequireAuth};

#[utoipa::path(get, path = "/api/v1/tags/{tag}/versions", tag = "Versions",
    params(("tag" = String, Path, description = "Tag name")),
    responses((status = 200, description = "Sealed versions, oldest first", body = Vec<TagVersion>)),
    security(("bearer" = [])))]
pub async fn list_versions(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(tag): Path<String>,
) -> Result<Json<Vec<TagVersion>>, ApiError> {
    Ok(Json(state.governance.versions.list_versions(&tag).await?))
}

/// Seal a batch of changes as the next version of the tag.
#[utoipa::path(post, path = "/api/v1/tags/{tag}/versions", tag = "Versions",
    params(("tag" = String, Path, description = "Tag name")),
    request_body = CreateTagVersionRequest,
    responses(
        (status = 201, description = "Version sealed", body = TagVersion),
        (status = 400, description = "Empty change batch or invalid tag")),
    security(("bearer" = [])))]
pub async fn create_version(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(tag): Path<String>,
    Json(req): Json<CreateTagVersionRequest>,
) -> Result<(StatusCode, Json<TagVersion>), ApiError> {
    let version = state.governance.versions.create_version(&tag, req).await?;
    Ok((StatusCode::CREATED, Json(version)))
}
