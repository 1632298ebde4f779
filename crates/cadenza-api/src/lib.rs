//! # cadenza-api
//!
//! axum HTTP surface for cadenza tag governance.
//!
//! [`create_router`] builds the full application (routes, auth, tracing,
//! request ids, CORS, OpenAPI docs) over an [`AppState`]. The binary wires it
//! to PostgreSQL; tests wire it to [`cadenza_core::InMemoryStore`].

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod notifications;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use cadenza_core::{Governance, SessionRepository, Stores};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

pub use auth::RequireAuth;
pub use config::ServerConfig;
pub use error::ApiError;
pub use notifications::spawn_notification_dispatcher;

use handlers::{analytics, audit, health, hierarchy, permissions, templates, versions};

/// JSON request bodies larger than this are rejected with `413`.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub governance: Governance,
    pub sessions: Arc<dyn SessionRepository>,
}

impl AppState {
    pub fn new(governance: Governance, sessions: Arc<dyn SessionRepository>) -> Self {
        Self {
            governance,
            sessions,
        }
    }

    /// State over one set of stores; services publish on `events`.
    pub fn from_stores(stores: &Stores, events: cadenza_core::EventBus) -> Self {
        Self::new(Governance::new(stores, events), stores.sessions.clone())
    }
}

/// Request id generator producing UUIDv7 values.
///
/// UUIDv7 embeds a Unix timestamp, so ids sort chronologically in the logs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Turn configured origin strings into header values, skipping invalid ones.
pub fn parse_allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|s| match s.trim().parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Invalid CORS origin '{}': {}", s, e);
                None
            }
        })
        .collect()
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parse_allowed_origins(allowed_origins)))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Routes under `/api/v1`.
fn api_routes() -> Router<AppState> {
    Router::new()
        // Hierarchy
        .route(
            "/tags/hierarchy",
            get(hierarchy::get_hierarchy)
                .post(hierarchy::add_edge)
                .delete(hierarchy::remove_edge),
        )
        .route("/tags/:tag/ancestors", get(hierarchy::get_ancestors))
        .route("/tags/:tag/descendants", get(hierarchy::get_descendants))
        // Permissions
        .route("/tags/permissions", get(permissions::list_all_permissions))
        .route(
            "/tags/:tag/permissions",
            get(permissions::list_permissions).post(permissions::add_permission),
        )
        .route(
            "/tags/:tag/permissions/:user_id",
            patch(permissions::update_permission).delete(permissions::remove_permission),
        )
        // Audit
        .route("/tags/audit", get(audit::get_audit_logs))
        // Templates
        .route(
            "/permission-templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/permission-templates/:id",
            get(templates::get_template)
                .patch(templates::update_template)
                .delete(templates::delete_template),
        )
        .route(
            "/permission-templates/:id/apply",
            post(templates::apply_template),
        )
        // Versions
        .route(
            "/tags/:tag/versions",
            get(versions::list_versions).post(versions::create_version),
        )
        // Analytics
        .route("/tags/:tag/related", get(analytics::related_tags))
}

/// Build the application router.
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CatchPanicLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// OpenAPI document served at `/api-docs/openapi.json` and browsed at `/docs`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cadenza Tag Governance API",
        description = "Tag hierarchy, per-tag permissions, templates, audit trail, versions and correlation analytics"
    ),
    paths(
        health::health_check,
        hierarchy::get_hierarchy,
        hierarchy::add_edge,
        hierarchy::remove_edge,
        hierarchy::get_ancestors,
        hierarchy::get_descendants,
        permissions::list_all_permissions,
        permissions::list_permissions,
        permissions::add_permission,
        permissions::update_permission,
        permissions::remove_permission,
        audit::get_audit_logs,
        templates::list_templates,
        templates::create_template,
        templates::get_template,
        templates::update_template,
        templates::delete_template,
        templates::apply_template,
        versions::list_versions,
        versions::create_version,
        analytics::related_tags,
    ),
    components(schemas(
        cadenza_core::TagRole,
        cadenza_core::SiteRole,
        cadenza_core::UserIdentity,
        cadenza_core::HierarchyEdge,
        cadenza_core::TagHierarchyNode,
        cadenza_core::PermissionEntry,
        cadenza_core::AddPermissionRequest,
        cadenza_core::UpdatePermissionRequest,
        cadenza_core::AuditAction,
        cadenza_core::AuditLogEntry,
        cadenza_core::AuditLogView,
        cadenza_core::TemplateRole,
        cadenza_core::PermissionTemplate,
        cadenza_core::CreatePermissionTemplateRequest,
        cadenza_core::UpdatePermissionTemplateRequest,
        cadenza_core::ApplyTemplateRequest,
        cadenza_core::ApplyOutcome,
        cadenza_core::AppliedAssignment,
        cadenza_core::FailedAssignment,
        cadenza_core::TemplateApplication,
        cadenza_core::TagChangeKind,
        cadenza_core::TagChangeDetails,
        cadenza_core::TagChange,
        cadenza_core::TagChangeInput,
        cadenza_core::TagVersion,
        cadenza_core::CreateTagVersionRequest,
        cadenza_core::TagRelation,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Hierarchy", description = "Parent/child tag relations"),
        (name = "Permissions", description = "Per-tag role assignments"),
        (name = "Audit", description = "Permission change trail"),
        (name = "Templates", description = "Reusable role bundles"),
        (name = "Versions", description = "Sealed tag change batches"),
        (name = "Analytics", description = "Tag co-occurrence"),
    )
)]
pub struct ApiDoc;
