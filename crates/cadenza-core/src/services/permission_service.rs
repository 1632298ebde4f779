//! Per-tag role assignments.
//!
//! Mutations run in this order: tag validation, authorization, target user
//! lookup, repository write (assignment and audit entry in one transaction),
//! event emission. A failure at any step leaves storage untouched.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::events::{EventActor, EventBus, ServerEvent};
use crate::notification::describe_permission_change;
use crate::services::authorize_tag_admin;
use crate::tags::*;
use crate::traits::{PermissionRepository, UserDirectory};

#[derive(Clone)]
pub struct PermissionService {
    permissions: Arc<dyn PermissionRepository>,
    users: Arc<dyn UserDirectory>,
    events: EventBus,
}

impl PermissionService {
    pub fn new(
        permissions: Arc<dyn PermissionRepository>,
        users: Arc<dyn UserDirectory>,
        events: EventBus,
    ) -> Self {
        Self {
            permissions,
            users,
            events,
        }
    }

    /// Assignments on one tag joined with user identities, oldest grant first.
    pub async fn list_permissions(&self, tag: &str) -> Result<Vec<PermissionEntry>> {
        let tag = validate_tag_name(tag)?;
        let permissions = self.permissions.list_for_tag(&tag).await?;
        self.enrich(permissions).await
    }

    /// Every tag's assignments, keyed by tag name.
    pub async fn list_all_permissions(&self) -> Result<TagPermissions> {
        let permissions = self.permissions.list_all().await?;
        let users = self.identities(&permissions).await?;

        let mut out = TagPermissions::new();
        for p in permissions {
            if let Some(entry) = entry_for(&p, &users) {
                out.entry(p.tag).or_default().push(entry);
            }
        }
        Ok(out)
    }

    /// Assign `role` to a user who has no role on the tag yet.
    pub async fn add_permission(
        &self,
        tag: &str,
        req: AddPermissionRequest,
        actor: &Actor,
    ) -> Result<PermissionEntry> {
        let tag = validate_tag_name(tag)?;
        authorize_tag_admin(self.permissions.as_ref(), &tag, actor).await?;
        let user = self.require_user(req.user_id).await?;

        let entry = self
            .permissions
            .insert(&PermissionGrant {
                tag: tag.clone(),
                user_id: user.id,
                role: req.role,
                actor_id: actor.id,
                description: req.description,
            })
            .await?;
        self.announce(&entry, &user, actor).await;

        Ok(PermissionEntry {
            user,
            role: req.role,
        })
    }

    /// Change the role of an existing assignment.
    pub async fn update_permission(
        &self,
        tag: &str,
        user_id: Uuid,
        req: UpdatePermissionRequest,
        actor: &Actor,
    ) -> Result<PermissionEntry> {
        let tag = validate_tag_name(tag)?;
        authorize_tag_admin(self.permissions.as_ref(), &tag, actor).await?;
        let user = self.require_user(user_id).await?;

        let entry = self
            .permissions
            .update(&PermissionGrant {
                tag,
                user_id,
                role: req.role,
                actor_id: actor.id,
                description: req.description,
            })
            .await?;
        self.announce(&entry, &user, actor).await;

        Ok(PermissionEntry {
            user,
            role: req.role,
        })
    }

    /// Remove a user's role on a tag.
    pub async fn remove_permission(&self, tag: &str, user_id: Uuid, actor: &Actor) -> Result<()> {
        let tag = validate_tag_name(tag)?;
        authorize_tag_admin(self.permissions.as_ref(), &tag, actor).await?;
        let user = self.require_user(user_id).await?;

        let entry = self.permissions.delete(&tag, user_id, actor.id).await?;
        self.announce(&entry, &user, actor).await;
        Ok(())
    }

    async fn require_user(&self, user_id: Uuid) -> Result<UserIdentity> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
    }

    async fn identities(&self, permissions: &[Permission]) -> Result<HashMap<Uuid, UserIdentity>> {
        let mut ids: Vec<Uuid> = permissions.iter().map(|p| p.user_id).collect();
        ids.sort();
        ids.dedup();
        Ok(self
            .users
            .get_users(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect())
    }

    /// Join assignments with identities, preserving order.
    async fn enrich(&self, permissions: Vec<Permission>) -> Result<Vec<PermissionEntry>> {
        let users = self.identities(&permissions).await?;
        Ok(permissions
            .iter()
            .filter_map(|p| entry_for(p, &users))
            .collect())
    }

    async fn announce(&self, entry: &AuditLogEntry, target: &UserIdentity, actor: &Actor) {
        let actor_name = match self.users.get_user(actor.id).await {
            Ok(user) => user.map(|u| u.name),
            Err(e) => {
                tracing::warn!(
                    subsystem = "core",
                    component = "permissions",
                    actor_id = %actor.id,
                    error = %e,
                    "Actor lookup failed; notification sent without message"
                );
                None
            }
        };
        emit_permission_event(&self.events, entry, Some(&target.name), actor_name);

        tracing::info!(
            subsystem = "core",
            component = "permissions",
            op = entry.action.as_str(),
            tag = %entry.tag,
            user_id = %entry.user_id,
            actor_id = %entry.actor_id,
            "Permission changed"
        );
    }
}

fn entry_for(p: &Permission, users: &HashMap<Uuid, UserIdentity>) -> Option<PermissionEntry> {
    match users.get(&p.user_id) {
        Some(user) => Some(PermissionEntry {
            user: user.clone(),
            role: p.role,
        }),
        None => {
            tracing::warn!(
                subsystem = "core",
                component = "permissions",
                tag = %p.tag,
                user_id = %p.user_id,
                "Skipping assignment for user missing from directory"
            );
            None
        }
    }
}

/// Publish `TagPermissionChanged` for a written audit entry.
pub(crate) fn emit_permission_event(
    events: &EventBus,
    entry: &AuditLogEntry,
    target_name: Option<&str>,
    actor_name: Option<String>,
) {
    let shown_role = entry.new_role.or(entry.old_role);
    let message = match (actor_name.as_deref(), target_name) {
        (Some(a), Some(t)) => Some(describe_permission_change(a, t, entry.action, shown_role)),
        _ => None,
    };
    let actor = EventActor::User {
        id: entry.actor_id,
        name: actor_name,
    };
    events.emit(
        ServerEvent::TagPermissionChanged {
            tag: entry.tag.clone(),
            target_user_id: entry.user_id,
            actor_id: entry.actor_id,
            action: entry.action,
            role: entry.new_role,
            old_role: entry.old_role,
            message,
        },
        actor,
    );
}
