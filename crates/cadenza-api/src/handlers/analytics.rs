use axum::{
    extract::{Path, State},
    Json,
};
use cadenza_core::TagRelation;

use crate::{ApiError, AppState, RequireAuth};

/// Tags most often saved alongside `tag`, by Jaccard correlation (top 5).
#[utoipa::path(get, path = "/api/v1/tags/{tag}/related", tag = "Analytics",
    params(("tag" = String, Path, description = "Tag name")),
    responses((status = 200, description = "Related tags, strongest first", body = Vec<TagRelation>)),
    security(("bearer" = [])))]
pub async fn related_tags(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(tag): Path<String>,
) -> Result<Json<Vec<TagRelation>>, ApiError> {
    Ok(Json(state.governance.correlation.related_tags(&tag).await?))
}
