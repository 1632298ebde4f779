//! Bearer-session authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use cadenza_core::Actor;

use crate::{ApiError, AppState};

/// Extractor that requires a live session.
///
/// Reads `Authorization: Bearer <token>` and resolves the token through the
/// session store. A missing header, a non-bearer scheme, or an unknown or
/// expired token rejects the request with `401`.
///
/// ```rust,ignore
/// async fn handler(RequireAuth(actor): RequireAuth) -> impl IntoResponse {
///     // actor.id, actor.site_role
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub Actor);

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        match state.sessions.resolve(token).await? {
            Some(actor) => Ok(RequireAuth(actor)),
            None => {
                tracing::debug!(
                    subsystem = "api",
                    component = "auth",
                    "Rejected unknown or expired session token"
                );
                Err(ApiError::Unauthorized(
                    "Authentication required".to_string(),
                ))
            }
        }
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("Bearer   padded  "), Some("padded"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("abc123"), None);
    }
}
