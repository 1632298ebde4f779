//! Governance services.
//!
//! Services validate input, enforce authorization, call the repositories and
//! publish events. They hold their collaborators as `Arc<dyn Trait>` so the
//! same code runs against PostgreSQL and [`crate::memory::InMemoryStore`].

mod audit_service;
mod correlation_service;
mod hierarchy_service;
mod permission_service;
mod template_service;
mod version_service;

use std::sync::Arc;

pub use audit_service::AuditService;
pub use correlation_service::CorrelationService;
pub use hierarchy_service::HierarchyService;
pub use permission_service::PermissionService;
pub use template_service::TemplateService;
pub use version_service::VersionService;

use crate::error::{Error, Result};
use crate::events::{EventActor, EventBus};
use crate::tags::{Actor, TagRole};
use crate::traits::*;

/// Every repository the services need.
#[derive(Clone)]
pub struct Stores {
    pub hierarchy: Arc<dyn HierarchyRepository>,
    pub permissions: Arc<dyn PermissionRepository>,
    pub audit: Arc<dyn AuditLogRepository>,
    pub templates: Arc<dyn TemplateRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub sessions: Arc<dyn SessionRepository>,
    pub versions: Arc<dyn TagVersionRepository>,
    pub saved_searches: Arc<dyn SavedSearchRepository>,
}

/// All governance services wired to one set of stores and one event bus.
#[derive(Clone)]
pub struct Governance {
    pub hierarchy: HierarchyService,
    pub permissions: PermissionService,
    pub templates: TemplateService,
    pub audit: AuditService,
    pub versions: VersionService,
    pub correlation: CorrelationService,
}

impl Governance {
    pub fn new(stores: &Stores, events: EventBus) -> Self {
        Self {
            hierarchy: HierarchyService::new(stores.hierarchy.clone(), events.clone()),
            permissions: PermissionService::new(
                stores.permissions.clone(),
                stores.users.clone(),
                events.clone(),
            ),
            templates: TemplateService::new(
                stores.templates.clone(),
                stores.permissions.clone(),
                stores.users.clone(),
                events.clone(),
            ),
            audit: AuditService::new(stores.audit.clone(), stores.users.clone()),
            versions: VersionService::new(stores.versions.clone(), events),
            correlation: CorrelationService::new(stores.saved_searches.clone()),
        }
    }
}

/// Require the actor to be a site admin or hold `admin` on `tag`.
pub(crate) async fn authorize_tag_admin(
    permissions: &dyn PermissionRepository,
    tag: &str,
    actor: &Actor,
) -> Result<()> {
    if actor.is_site_admin() {
        return Ok(());
    }
    match permissions.get(tag, actor.id).await? {
        Some(p) if p.role == TagRole::Admin => Ok(()),
        _ => Err(Error::Forbidden(format!(
            "admin role on tag {} required",
            tag
        ))),
    }
}

pub(crate) fn user_actor(actor: &Actor) -> EventActor {
    EventActor::User {
        id: actor.id,
        name: None,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::tags::{SiteRole, UserIdentity};

    pub struct Fixture {
        pub store: Arc<InMemoryStore>,
        pub governance: Governance,
        pub events: EventBus,
        pub admin: Actor,
        pub admin_user: UserIdentity,
    }

    pub async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let events = EventBus::new(32);
        let governance = Governance::new(&store.stores(), events.clone());
        let admin_user = store.add_user("张三", "zhang@example.com").await;
        let admin = Actor::new(admin_user.id, SiteRole::Admin);
        Fixture {
            store,
            governance,
            events,
            admin,
            admin_user,
        }
    }
}
