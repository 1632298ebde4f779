use axum::{
    extract::{Query, State},
    Json,
};
use cadenza_core::{AuditLogQuery, AuditLogView};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{ApiError, AppState, RequireAuth};

/// Query string for `GET /api/v1/tags/audit`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Only entries for this tag.
    pub tag: Option<String>,
    /// Maximum entries to return (default 100, capped at 1000).
    pub limit: Option<i64>,
}

impl From<AuditQuery> for AuditLogQuery {
    fn from(q: AuditQuery) -> Self {
        AuditLogQuery {
            tag: q.tag,
            ..AuditLogQuery::default()
        }
        .with_limit(q.limit)
    }
}

/// Permission audit trail, most recent first.
#[utoipa::path(get, path = "/api/v1/tags/audit", tag = "Audit",
    params(AuditQuery),
    responses((status = 200, description = "Audit entries with user and actor identity",
        body = Vec<AuditLogView>)),
    security(("bearer" = [])))]
pub async fn get_audit_logs(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditLogView>>, ApiError> {
    Ok(Json(
        state.governance.audit.get_audit_logs(query.into()).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::{DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT};

    #[test]
    fn test_audit_query_defaults_and_clamps() {
        let q: AuditLogQuery = AuditQuery::default().into();
        assert_eq!(q.tag, None);
        assert_eq!(q.limit, DEFAULT_AUDIT_LIMIT);

        let q: AuditLogQuery = AuditQuery {
            tag: Some("rock".to_string()),
            limit: Some(50_000),
        }
        .into();
        assert_eq!(q.tag.as_deref(), Some("rock"));
        assert_eq!(q.limit, MAX_AUDIT_LIMIT);
    }
}
