//! In-process implementation of every repository trait.
//!
//! All state sits behind one `tokio::sync::RwLock`, so a permission mutation
//! and its audit entry are applied under the same write guard. Used by the
//! test suites of every crate and by local development without Postgres.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::hierarchy::{build_hierarchy, would_create_cycle};
use crate::services::Stores;
use crate::tags::*;
use crate::traits::*;
use crate::uuid_utils::new_v7;

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, UserIdentity>,
    sessions: HashMap<String, Actor>,
    edges: Vec<HierarchyEdge>,
    /// Insertion order doubles as grant order.
    permissions: Vec<Permission>,
    audit: Vec<AuditLogEntry>,
    templates: HashMap<Uuid, PermissionTemplate>,
    versions: Vec<TagVersion>,
    saved_searches: Vec<SavedSearch>,
}

impl MemoryState {
    fn position(&self, tag: &str, user_id: Uuid) -> Option<usize> {
        self.permissions
            .iter()
            .position(|p| p.tag == tag && p.user_id == user_id)
    }

    fn append_audit(
        &mut self,
        tag: &str,
        user_id: Uuid,
        actor_id: Uuid,
        old_role: Option<TagRole>,
        new_role: Option<TagRole>,
        description: Option<String>,
    ) -> AuditLogEntry {
        let entry =
            AuditLogEntry::for_change(tag, user_id, actor_id, old_role, new_role, description);
        self.audit.push(entry.clone());
        entry
    }
}

/// Shared in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle this store as every repository of a [`Stores`].
    pub fn stores(self: &Arc<Self>) -> Stores {
        Stores {
            hierarchy: self.clone(),
            permissions: self.clone(),
            audit: self.clone(),
            templates: self.clone(),
            users: self.clone(),
            sessions: self.clone(),
            versions: self.clone(),
            saved_searches: self.clone(),
        }
    }

    /// Register a user in the directory.
    pub async fn add_user(&self, name: &str, email: &str) -> UserIdentity {
        let user = UserIdentity {
            id: new_v7(),
            name: name.to_string(),
            email: email.to_string(),
        };
        self.state
            .write()
            .await
            .users
            .insert(user.id, user.clone());
        user
    }

    /// Map a bearer token to an actor.
    pub async fn add_session(&self, token: &str, actor: Actor) {
        self.state
            .write()
            .await
            .sessions
            .insert(token.to_string(), actor);
    }

    /// Append a saved search to the correlation corpus.
    pub async fn add_saved_search(&self, user_id: Uuid, query: &str, tags: &[&str]) -> SavedSearch {
        let search = SavedSearch {
            id: new_v7(),
            user_id,
            query: query.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: Utc::now(),
        };
        self.state.write().await.saved_searches.push(search.clone());
        search
    }

    /// Number of audit entries recorded so far.
    pub async fn audit_len(&self) -> usize {
        self.state.read().await.audit.len()
    }
}

#[async_trait]
impl HierarchyRepository for InMemoryStore {
    async fn list_edges(&self) -> Result<Vec<HierarchyEdge>> {
        Ok(self.state.read().await.edges.clone())
    }

    async fn insert_edge(&self, edge: &HierarchyEdge) -> Result<()> {
        let mut state = self.state.write().await;
        if state.edges.contains(edge) {
            return Err(Error::Conflict(format!(
                "edge {} -> {} already exists",
                edge.parent_tag, edge.child_tag
            )));
        }
        let hierarchy = build_hierarchy(&state.edges);
        if would_create_cycle(&hierarchy, &edge.parent_tag, &edge.child_tag) {
            return Err(Error::InvalidInput(format!(
                "edge {} -> {} would create a cycle",
                edge.parent_tag, edge.child_tag
            )));
        }
        state.edges.push(edge.clone());
        Ok(())
    }

    async fn delete_edge(&self, edge: &HierarchyEdge) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.edges.len();
        state.edges.retain(|e| e != edge);
        Ok(state.edges.len() != before)
    }
}

#[async_trait]
impl PermissionRepository for InMemoryStore {
    async fn get(&self, tag: &str, user_id: Uuid) -> Result<Option<Permission>> {
        let state = self.state.read().await;
        Ok(state
            .permissions
            .iter()
            .find(|p| p.tag == tag && p.user_id == user_id)
            .cloned())
    }

    async fn list_for_tag(&self, tag: &str) -> Result<Vec<Permission>> {
        let state = self.state.read().await;
        Ok(state
            .permissions
            .iter()
            .filter(|p| p.tag == tag)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Permission>> {
        let mut all = self.state.read().await.permissions.clone();
        // Stable sort keeps grant order within a tag
        all.sort_by(|a, b| a.tag.cmp(&b.tag));
        Ok(all)
    }

    async fn insert(&self, grant: &PermissionGrant) -> Result<AuditLogEntry> {
        let mut state = self.state.write().await;
        if state.position(&grant.tag, grant.user_id).is_some() {
            return Err(Error::DuplicateAssignment {
                tag: grant.tag.clone(),
                user_id: grant.user_id,
            });
        }
        state.permissions.push(Permission {
            tag: grant.tag.clone(),
            user_id: grant.user_id,
            role: grant.role,
            granted_at: Utc::now(),
        });
        Ok(state.append_audit(
            &grant.tag,
            grant.user_id,
            grant.actor_id,
            None,
            Some(grant.role),
            grant.description.clone(),
        ))
    }

    async fn update(&self, grant: &PermissionGrant) -> Result<AuditLogEntry> {
        let mut state = self.state.write().await;
        let idx = state.position(&grant.tag, grant.user_id).ok_or_else(|| {
            Error::NotFound(format!(
                "permission for user {} on tag {}",
                grant.user_id, grant.tag
            ))
        })?;
        let old_role = state.permissions[idx].role;
        state.permissions[idx].role = grant.role;
        Ok(state.append_audit(
            &grant.tag,
            grant.user_id,
            grant.actor_id,
            Some(old_role),
            Some(grant.role),
            grant.description.clone(),
        ))
    }

    async fn upsert(&self, grant: &PermissionGrant) -> Result<Option<AuditLogEntry>> {
        let mut state = self.state.write().await;
        let old_role = match state.position(&grant.tag, grant.user_id) {
            Some(idx) => {
                let old = state.permissions[idx].role;
                if old == grant.role {
                    return Ok(None);
                }
                state.permissions[idx].role = grant.role;
                Some(old)
            }
            None => {
                state.permissions.push(Permission {
                    tag: grant.tag.clone(),
                    user_id: grant.user_id,
                    role: grant.role,
                    granted_at: Utc::now(),
                });
                None
            }
        };
        Ok(Some(state.append_audit(
            &grant.tag,
            grant.user_id,
            grant.actor_id,
            old_role,
            Some(grant.role),
            grant.description.clone(),
        )))
    }

    async fn delete(&self, tag: &str, user_id: Uuid, actor_id: Uuid) -> Result<AuditLogEntry> {
        let mut state = self.state.write().await;
        let idx = state.position(tag, user_id).ok_or_else(|| {
            Error::NotFound(format!("permission for user {} on tag {}", user_id, tag))
        })?;
        let removed = state.permissions.remove(idx);
        Ok(state.append_audit(tag, user_id, actor_id, Some(removed.role), None, None))
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryStore {
    async fn record(&self, entry: &AuditLogEntry) -> Result<()> {
        self.state.write().await.audit.push(entry.clone());
        Ok(())
    }

    async fn list(&self, query: &AuditLogQuery) -> Result<Vec<AuditLogEntry>> {
        let state = self.state.read().await;
        let limit = usize::try_from(query.limit).unwrap_or(0);
        Ok(state
            .audit
            .iter()
            .rev()
            .filter(|e| query.tag.as_deref().map_or(true, |t| e.tag == t))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TemplateRepository for InMemoryStore {
    async fn create(&self, req: CreatePermissionTemplateRequest) -> Result<PermissionTemplate> {
        let now = Utc::now();
        let template = PermissionTemplate {
            id: new_v7(),
            name: req.name,
            description: req.description,
            roles: req.roles,
            created_at: now,
            updated_at: now,
        };
        self.state
            .write()
            .await
            .templates
            .insert(template.id, template.clone());
        Ok(template)
    }

    async fn get(&self, id: Uuid) -> Result<Option<PermissionTemplate>> {
        Ok(self.state.read().await.templates.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<PermissionTemplate>> {
        let mut templates: Vec<_> = self.state.read().await.templates.values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(templates)
    }

    async fn update(
        &self,
        id: Uuid,
        req: UpdatePermissionTemplateRequest,
    ) -> Result<PermissionTemplate> {
        let mut state = self.state.write().await;
        let template = state
            .templates
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("permission template {}", id)))?;
        if let Some(name) = req.name {
            template.name = name;
        }
        if let Some(description) = req.description {
            template.description = Some(description);
        }
        if let Some(roles) = req.roles {
            template.roles = roles;
        }
        template.updated_at = Utc::now();
        Ok(template.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.state
            .write()
            .await
            .templates
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("permission template {}", id)))
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserIdentity>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<UserIdentity>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn resolve(&self, token: &str) -> Result<Option<Actor>> {
        Ok(self.state.read().await.sessions.get(token).cloned())
    }
}

#[async_trait]
impl TagVersionRepository for InMemoryStore {
    async fn save(&self, version: &TagVersion) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .versions
            .iter()
            .any(|v| v.tag == version.tag && v.version == version.version)
        {
            return Err(Error::Conflict(format!(
                "tag {} already has version {}",
                version.tag, version.version
            )));
        }
        state.versions.push(version.clone());
        Ok(())
    }

    async fn list(&self, tag: &str) -> Result<Vec<TagVersion>> {
        let mut versions: Vec<_> = self
            .state
            .read()
            .await
            .versions
            .iter()
            .filter(|v| v.tag == tag)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn latest_version_number(&self, tag: &str) -> Result<Option<i32>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .iter()
            .filter(|v| v.tag == tag)
            .map(|v| v.version)
            .max())
    }
}

#[async_trait]
impl SavedSearchRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<SavedSearch>> {
        Ok(self.state.read().await.saved_searches.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(tag: &str, user_id: Uuid, role: TagRole) -> PermissionGrant {
        PermissionGrant {
            tag: tag.to_string(),
            user_id,
            role,
            actor_id: Uuid::nil(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        PermissionRepository::insert(&store, &grant("rock", user, TagRole::Viewer))
            .await
            .unwrap();

        let err = PermissionRepository::insert(&store, &grant("rock", user, TagRole::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateAssignment { .. }));
        assert_eq!(store.audit_len().await, 1);
    }

    #[tokio::test]
    async fn test_upsert_identical_role_writes_nothing() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let g = grant("rock", user, TagRole::Editor);

        assert!(store.upsert(&g).await.unwrap().is_some());
        assert!(store.upsert(&g).await.unwrap().is_none());
        assert_eq!(store.audit_len().await, 1);

        let changed = store
            .upsert(&grant("rock", user, TagRole::Admin))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(changed.action, AuditAction::Update);
        assert_eq!(changed.old_role, Some(TagRole::Editor));
    }

    #[tokio::test]
    async fn test_insert_edge_rejects_cycle_and_duplicate() {
        let store = InMemoryStore::new();
        store
            .insert_edge(&HierarchyEdge::new("music", "rock"))
            .await
            .unwrap();

        let dup = store.insert_edge(&HierarchyEdge::new("music", "rock")).await;
        assert!(matches!(dup, Err(Error::Conflict(_))));

        let cycle = store.insert_edge(&HierarchyEdge::new("rock", "music")).await;
        assert!(matches!(cycle, Err(Error::InvalidInput(_))));

        assert_eq!(store.list_edges().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_audit_list_most_recent_first_with_filter() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        PermissionRepository::insert(&store, &grant("rock", user, TagRole::Viewer))
            .await
            .unwrap();
        PermissionRepository::insert(&store, &grant("jazz", user, TagRole::Viewer))
            .await
            .unwrap();
        PermissionRepository::update(&store, &grant("rock", user, TagRole::Admin))
            .await
            .unwrap();

        let all = AuditLogRepository::list(&store, &AuditLogQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].action, AuditAction::Update);

        let rock = AuditLogRepository::list(&store, &AuditLogQuery::for_tag("rock"))
            .await
            .unwrap();
        assert_eq!(rock.len(), 2);
        assert!(rock.iter().all(|e| e.tag == "rock"));
    }

    #[tokio::test]
    async fn test_record_appends_without_touching_history() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let granted = PermissionRepository::insert(&store, &grant("rock", user, TagRole::Viewer))
            .await
            .unwrap();

        let imported = AuditLogEntry::for_change(
            "rock",
            user,
            Uuid::new_v4(),
            Some(TagRole::Viewer),
            Some(TagRole::Editor),
            Some("imported from legacy system".to_string()),
        );
        store.record(&imported).await.unwrap();

        let log = AuditLogRepository::list(&store, &AuditLogQuery::for_tag("rock"))
            .await
            .unwrap();
        assert_eq!(log, vec![imported, granted]);
    }

    #[tokio::test]
    async fn test_version_numbers_unique_per_tag() {
        let store = InMemoryStore::new();
        let version = TagVersion {
            id: new_v7(),
            tag: "rock".to_string(),
            version: 1,
            changes: vec![],
            created_at: Utc::now(),
            author: None,
        };
        store.save(&version).await.unwrap();
        let again = TagVersion {
            id: new_v7(),
            ..version.clone()
        };
        assert!(matches!(store.save(&again).await, Err(Error::Conflict(_))));
        assert_eq!(store.latest_version_number("rock").await.unwrap(), Some(1));
        assert_eq!(store.latest_version_number("jazz").await.unwrap(), None);
    }
}
