//! Tag hierarchy HTTP handlers.
//!
//! - `GET    /api/v1/tags/hierarchy`              tag → {parents, children}
//! - `POST   /api/v1/tags/hierarchy`              add a parent → child edge
//! - `DELETE /api/v1/tags/hierarchy`              remove an edge
//! - `GET    /api/v1/tags/:tag/ancestors`         transitive parents
//! - `GET    /api/v1/tags/:tag/descendants`       transitive children

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cadenza_core::{HierarchyEdge, TagHierarchy, TagHierarchyNode};

use crate::{ApiError, AppState, RequireAuth};

#[utoipa::path(get, path = "/api/v1/tags/hierarchy", tag = "Hierarchy",
    responses((status = 200, description = "Parents and children of every tag with an edge",
        body = std::collections::BTreeMap<String, TagHierarchyNode>)),
    security(("bearer" = [])))]
pub async fn get_hierarchy(
    State(state): State<AppState>,
    _auth: RequireAuth,
) -> Result<Json<TagHierarchy>, ApiError> {
    Ok(Json(state.governance.hierarchy.get_hierarchy().await?))
}

#[utoipa::path(post, path = "/api/v1/tags/hierarchy", tag = "Hierarchy",
    request_body = HierarchyEdge,
    responses(
        (status = 201, description = "Edge added", body = HierarchyEdge),
        (status = 400, description = "Invalid tag name, self-loop or cycle"),
        (status = 409, description = "Edge already exists")),
    security(("bearer" = [])))]
pub async fn add_edge(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Json(req): Json<HierarchyEdge>,
) -> Result<(StatusCode, Json<HierarchyEdge>), ApiError> {
    let edge = state
        .governance
        .hierarchy
        .add_edge(&req.parent_tag, &req.child_tag, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

#[utoipa::path(delete, path = "/api/v1/tags/hierarchy", tag = "Hierarchy",
    request_body = HierarchyEdge,
    responses(
        (status = 204, description = "Edge removed"),
        (status = 404, description = "Edge does not exist")),
    security(("bearer" = [])))]
pub async fn remove_edge(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Json(req): Json<HierarchyEdge>,
) -> Result<StatusCode, ApiError> {
    state
        .governance
        .hierarchy
        .remove_edge(&req.parent_tag, &req.child_tag, &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/api/v1/tags/{tag}/ancestors", tag = "Hierarchy",
    params(("tag" = String, Path, description = "Tag name")),
    responses((status = 200, description = "Ancestors, nearest first", body = Vec<String>)),
    security(("bearer" = [])))]
pub async fn get_ancestors(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(tag): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.governance.hierarchy.ancestors(&tag).await?))
}

#[utoipa::path(get, path = "/api/v1/tags/{tag}/descendants", tag = "Hierarchy",
    params(("tag" = String, Path, description = "Tag name")),
    responses((status = 200, description = "Descendants, nearest first", body = Vec<String>)),
    security(("bearer" = [])))]
pub async fn get_descendants(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(tag): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.governance.hierarchy.descendants(&tag).await?))
}
