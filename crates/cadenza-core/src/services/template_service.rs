//! Permission templates and bulk application.
//!
//! Applying a template upserts every `(tag, user)` pair independently. A
//! failing pair is reported in the result and never aborts the rest; only
//! an unknown template fails the whole call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::events::EventBus;
use crate::services::authorize_tag_admin;
use crate::services::permission_service::emit_permission_event;
use crate::tags::*;
use crate::traits::{PermissionRepository, TemplateRepository, UserDirectory};

/// Maximum template name length in characters.
pub const MAX_TEMPLATE_NAME_LEN: usize = 200;

#[derive(Clone)]
pub struct TemplateService {
    templates: Arc<dyn TemplateRepository>,
    permissions: Arc<dyn PermissionRepository>,
    users: Arc<dyn UserDirectory>,
    events: EventBus,
}

impl TemplateService {
    pub fn new(
        templates: Arc<dyn TemplateRepository>,
        permissions: Arc<dyn PermissionRepository>,
        users: Arc<dyn UserDirectory>,
        events: EventBus,
    ) -> Self {
        Self {
            templates,
            permissions,
            users,
            events,
        }
    }

    /// Create a template. Users are not checked against the directory here;
    /// unknown users surface as per-pair failures on apply.
    pub async fn create_template(
        &self,
        mut req: CreatePermissionTemplateRequest,
    ) -> Result<PermissionTemplate> {
        req.name = validate_template_name(&req.name)?;
        validate_roles(&req.roles)?;

        let template = self.templates.create(req).await?;
        tracing::info!(
            subsystem = "core",
            component = "templates",
            op = "create_template",
            template_id = %template.id,
            role_count = template.roles.len(),
            "Created permission template"
        );
        Ok(template)
    }

    pub async fn get_template(&self, id: Uuid) -> Result<PermissionTemplate> {
        self.templates
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("permission template {}", id)))
    }

    pub async fn list_templates(&self) -> Result<Vec<PermissionTemplate>> {
        self.templates.list().await
    }

    pub async fn update_template(
        &self,
        id: Uuid,
        mut req: UpdatePermissionTemplateRequest,
    ) -> Result<PermissionTemplate> {
        if let Some(name) = req.name.as_deref() {
            req.name = Some(validate_template_name(name)?);
        }
        if let Some(roles) = req.roles.as_deref() {
            validate_roles(roles)?;
        }
        self.templates.update(id, req).await
    }

    pub async fn delete_template(&self, id: Uuid) -> Result<()> {
        self.templates.delete(id).await?;
        tracing::info!(
            subsystem = "core",
            component = "templates",
            op = "delete_template",
            template_id = %id,
            "Deleted permission template"
        );
        Ok(())
    }

    /// Upsert the template's roles onto every tag in `tags`.
    ///
    /// An identical existing role counts as an `Unchanged` success and
    /// writes no audit entry. Duplicate tags in the request are applied once.
    pub async fn apply_template(
        &self,
        template_id: Uuid,
        tags: &[String],
        actor: &Actor,
    ) -> Result<TemplateApplication> {
        let template = self.get_template(template_id).await?;

        let ids: Vec<Uuid> = template.roles.iter().map(|r| r.user_id).collect();
        let known: HashMap<Uuid, UserIdentity> = self
            .users
            .get_users(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let actor_name = self.users.get_user(actor.id).await?.map(|u| u.name);

        let mut report = TemplateApplication {
            template_id,
            ..Default::default()
        };
        let mut seen = HashSet::new();

        for raw_tag in tags {
            let tag = match validate_tag_name(raw_tag) {
                Ok(tag) => tag,
                Err(e) => {
                    fail_all(&mut report, raw_tag, &template.roles, &e);
                    continue;
                }
            };
            if !seen.insert(tag.clone()) {
                continue;
            }
            if let Err(e) = authorize_tag_admin(self.permissions.as_ref(), &tag, actor).await {
                fail_all(&mut report, &tag, &template.roles, &e);
                continue;
            }

            for role in &template.roles {
                let Some(target) = known.get(&role.user_id) else {
                    report.failed.push(FailedAssignment {
                        tag: tag.clone(),
                        user_id: role.user_id,
                        reason: format!("user {} not found", role.user_id),
                    });
                    continue;
                };

                let grant = PermissionGrant {
                    tag: tag.clone(),
                    user_id: role.user_id,
                    role: role.role,
                    actor_id: actor.id,
                    description: Some(format!("applied template {}", template.name)),
                };
                match self.permissions.upsert(&grant).await {
                    Ok(written) => {
                        let outcome = match &written {
                            None => ApplyOutcome::Unchanged,
                            Some(entry) if entry.action == AuditAction::Add => ApplyOutcome::Added,
                            Some(_) => ApplyOutcome::Updated,
                        };
                        if let Some(entry) = &written {
                            emit_permission_event(
                                &self.events,
                                entry,
                                Some(&target.name),
                                actor_name.clone(),
                            );
                        }
                        report.succeeded.push(AppliedAssignment {
                            tag: tag.clone(),
                            user_id: role.user_id,
                            role: role.role,
                            outcome,
                        });
                    }
                    Err(e) => {
                        let reason = if e.is_internal() {
                            tracing::error!(
                                subsystem = "core",
                                component = "templates",
                                tag = %tag,
                                user_id = %role.user_id,
                                error = %e,
                                "Template upsert failed"
                            );
                            "internal error".to_string()
                        } else {
                            e.to_string()
                        };
                        report.failed.push(FailedAssignment {
                            tag: tag.clone(),
                            user_id: role.user_id,
                            reason,
                        });
                    }
                }
            }
        }

        if !report.failed.is_empty() {
            tracing::warn!(
                subsystem = "core",
                component = "templates",
                op = "apply_template",
                template_id = %template_id,
                actor_id = %actor.id,
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                "Template applied with failures"
            );
        } else {
            tracing::info!(
                subsystem = "core",
                component = "templates",
                op = "apply_template",
                template_id = %template_id,
                actor_id = %actor.id,
                succeeded = report.succeeded.len(),
                "Template applied"
            );
        }

        Ok(report)
    }
}

fn fail_all(report: &mut TemplateApplication, tag: &str, roles: &[TemplateRole], err: &Error) {
    for role in roles {
        report.failed.push(FailedAssignment {
            tag: tag.to_string(),
            user_id: role.user_id,
            reason: err.to_string(),
        });
    }
}

fn validate_template_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "template name must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_TEMPLATE_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "template name exceeds {} characters",
            MAX_TEMPLATE_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// A template may assign each user at most one role.
fn validate_roles(roles: &[TemplateRole]) -> Result<()> {
    let mut seen = HashSet::new();
    for role in roles {
        if !seen.insert(role.user_id) {
            return Err(Error::InvalidInput(format!(
                "user {} appears more than once in template roles",
                role.user_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::services::test_support::{fixture, Fixture};
    use crate::traits::AuditLogRepository;
    use async_trait::async_trait;

    /// Permission store whose `upsert` breaks for one (tag, user) pair.
    struct FailingPair {
        inner: Arc<InMemoryStore>,
        tag: &'static str,
        user_id: Uuid,
    }

    #[async_trait]
    impl PermissionRepository for FailingPair {
        async fn get(&self, tag: &str, user_id: Uuid) -> Result<Option<Permission>> {
            PermissionRepository::get(self.inner.as_ref(), tag, user_id).await
        }

        async fn list_for_tag(&self, tag: &str) -> Result<Vec<Permission>> {
            self.inner.list_for_tag(tag).await
        }

        async fn list_all(&self) -> Result<Vec<Permission>> {
            self.inner.list_all().await
        }

        async fn insert(&self, grant: &PermissionGrant) -> Result<AuditLogEntry> {
            PermissionRepository::insert(self.inner.as_ref(), grant).await
        }

        async fn update(&self, grant: &PermissionGrant) -> Result<AuditLogEntry> {
            PermissionRepository::update(self.inner.as_ref(), grant).await
        }

        async fn upsert(&self, grant: &PermissionGrant) -> Result<Option<AuditLogEntry>> {
            if grant.tag == self.tag && grant.user_id == self.user_id {
                return Err(Error::Internal("connection reset".to_string()));
            }
            self.inner.upsert(grant).await
        }

        async fn delete(&self, tag: &str, user_id: Uuid, actor_id: Uuid) -> Result<AuditLogEntry> {
            PermissionRepository::delete(self.inner.as_ref(), tag, user_id, actor_id).await
        }
    }

    async fn template_with(f: &Fixture, roles: Vec<TemplateRole>) -> PermissionTemplate {
        f.governance
            .templates
            .create_template(CreatePermissionTemplateRequest {
                name: "Editors".to_string(),
                description: Some("editorial team".to_string()),
                roles,
            })
            .await
            .unwrap()
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_sets_timestamps() {
        let f = fixture().await;
        let t = template_with(&f, vec![]).await;
        assert_eq!(t.created_at, t.updated_at);
        assert_eq!(t.name, "Editors");
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name_and_duplicate_user() {
        let f = fixture().await;
        let svc = &f.governance.templates;
        let empty = svc
            .create_template(CreatePermissionTemplateRequest {
                name: "  ".to_string(),
                description: None,
                roles: vec![],
            })
            .await;
        assert!(matches!(empty, Err(Error::InvalidInput(_))));

        let user = Uuid::new_v4();
        let dup = svc
            .create_template(CreatePermissionTemplateRequest {
                name: "dup".to_string(),
                description: None,
                roles: vec![
                    TemplateRole {
                        user_id: user,
                        role: TagRole::Viewer,
                    },
                    TemplateRole {
                        user_id: user,
                        role: TagRole::Admin,
                    },
                ],
            })
            .await;
        assert!(matches!(dup, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_apply_three_users_two_tags() {
        let f = fixture().await;
        let mut roles = Vec::new();
        for name in ["a", "b", "c"] {
            let u = f.store.add_user(name, &format!("{}@example.com", name)).await;
            roles.push(TemplateRole {
                user_id: u.id,
                role: TagRole::Editor,
            });
        }
        let t = template_with(&f, roles).await;

        let report = f
            .governance
            .templates
            .apply_template(t.id, &tags(&["rock", "jazz"]), &f.admin)
            .await
            .unwrap();

        assert_eq!(report.succeeded.len(), 6);
        assert!(report.failed.is_empty());
        assert!(report
            .succeeded
            .iter()
            .all(|s| s.outcome == ApplyOutcome::Added));
        assert_eq!(f.store.audit_len().await, 6);
    }

    #[tokio::test]
    async fn test_unknown_user_fails_once_per_tag() {
        let f = fixture().await;
        let a = f.store.add_user("a", "a@example.com").await;
        let b = f.store.add_user("b", "b@example.com").await;
        let ghost = Uuid::new_v4();
        let t = template_with(
            &f,
            vec![
                TemplateRole {
                    user_id: a.id,
                    role: TagRole::Viewer,
                },
                TemplateRole {
                    user_id: ghost,
                    role: TagRole::Viewer,
                },
                TemplateRole {
                    user_id: b.id,
                    role: TagRole::Admin,
                },
            ],
        )
        .await;

        let report = f
            .governance
            .templates
            .apply_template(t.id, &tags(&["rock", "jazz"]), &f.admin)
            .await
            .unwrap();

        assert_eq!(report.succeeded.len(), 4);
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed.iter().all(|fa| fa.user_id == ghost));
        assert_eq!(f.store.audit_len().await, 4);
    }

    #[tokio::test]
    async fn test_store_failure_on_one_pair_spares_the_rest() {
        let f = fixture().await;
        let mut users = Vec::new();
        for name in ["a", "b", "c"] {
            users.push(f.store.add_user(name, &format!("{}@example.com", name)).await);
        }
        let roles = users
            .iter()
            .map(|u| TemplateRole {
                user_id: u.id,
                role: TagRole::Editor,
            })
            .collect();
        let t = template_with(&f, roles).await;

        let svc = TemplateService::new(
            f.store.clone(),
            Arc::new(FailingPair {
                inner: f.store.clone(),
                tag: "jazz",
                user_id: users[1].id,
            }),
            f.store.clone(),
            f.events.clone(),
        );
        let report = svc
            .apply_template(t.id, &tags(&["rock", "jazz"]), &f.admin)
            .await
            .unwrap();

        assert_eq!(report.succeeded.len(), 5);
        assert_eq!(report.failed.len(), 1);
        let failed = &report.failed[0];
        assert_eq!((failed.tag.as_str(), failed.user_id), ("jazz", users[1].id));
        assert_eq!(failed.reason, "internal error");
        assert_eq!(f.store.audit_len().await, 5);
        assert!(PermissionRepository::get(f.store.as_ref(), "jazz", users[2].id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_invalid_tag_fails_only_that_tag() {
        let f = fixture().await;
        let a = f.store.add_user("a", "a@example.com").await;
        let t = template_with(
            &f,
            vec![TemplateRole {
                user_id: a.id,
                role: TagRole::Viewer,
            }],
        )
        .await;

        let report = f
            .governance
            .templates
            .apply_template(t.id, &tags(&["rock", "   ", "jazz"]), &f.admin)
            .await
            .unwrap();
        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].tag, "   ");
    }

    #[tokio::test]
    async fn test_reapply_is_unchanged_and_role_change_updates() {
        let f = fixture().await;
        let a = f.store.add_user("a", "a@example.com").await;
        let t = template_with(
            &f,
            vec![TemplateRole {
                user_id: a.id,
                role: TagRole::Viewer,
            }],
        )
        .await;
        let svc = &f.governance.templates;

        svc.apply_template(t.id, &tags(&["rock"]), &f.admin)
            .await
            .unwrap();
        let again = svc
            .apply_template(t.id, &tags(&["rock"]), &f.admin)
            .await
            .unwrap();
        assert_eq!(again.succeeded[0].outcome, ApplyOutcome::Unchanged);
        assert_eq!(f.store.audit_len().await, 1);

        svc.update_template(
            t.id,
            UpdatePermissionTemplateRequest {
                roles: Some(vec![TemplateRole {
                    user_id: a.id,
                    role: TagRole::Admin,
                }]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let updated = svc
            .apply_template(t.id, &tags(&["rock"]), &f.admin)
            .await
            .unwrap();
        assert_eq!(updated.succeeded[0].outcome, ApplyOutcome::Updated);

        let log = AuditLogRepository::list(f.store.as_ref(), &AuditLogQuery::for_tag("rock"))
            .await
            .unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].old_role, Some(TagRole::Viewer));
        assert_eq!(log[0].new_role, Some(TagRole::Admin));
    }

    #[tokio::test]
    async fn test_member_without_tag_admin_fails_per_pair() {
        let f = fixture().await;
        let member_user = f.store.add_user("m", "m@example.com").await;
        let a = f.store.add_user("a", "a@example.com").await;
        let t = template_with(
            &f,
            vec![TemplateRole {
                user_id: a.id,
                role: TagRole::Viewer,
            }],
        )
        .await;
        let member = Actor::new(member_user.id, SiteRole::Member);

        let report = f
            .governance
            .templates
            .apply_template(t.id, &tags(&["rock"]), &member)
            .await
            .unwrap();
        assert!(report.succeeded.is_empty());
        assert_eq!(report.failed.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_template() {
        let f = fixture().await;
        let svc = &f.governance.templates;
        let id = Uuid::new_v4();
        assert!(matches!(
            svc.apply_template(id, &tags(&["rock"]), &f.admin).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(svc.get_template(id).await, Err(Error::NotFound(_))));
        assert!(matches!(
            svc.delete_template(id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_bumps_updated_at_and_list_sorted() {
        let f = fixture().await;
        let svc = &f.governance.templates;
        let t = template_with(&f, vec![]).await;
        svc.create_template(CreatePermissionTemplateRequest {
            name: "Archivists".to_string(),
            description: None,
            roles: vec![],
        })
        .await
        .unwrap();

        let renamed = svc
            .update_template(
                t.id,
                UpdatePermissionTemplateRequest {
                    name: Some(" Curators ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Curators");
        assert!(renamed.updated_at >= renamed.created_at);

        let names: Vec<String> = svc
            .list_templates()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Archivists", "Curators"]);
    }
}
