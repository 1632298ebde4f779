//! Audit log listing with identity enrichment.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::Result;
use crate::tags::{validate_tag_name, AuditLogQuery, AuditLogView, UserIdentity};
use crate::traits::{AuditLogRepository, UserDirectory};

#[derive(Clone)]
pub struct AuditService {
    audit: Arc<dyn AuditLogRepository>,
    users: Arc<dyn UserDirectory>,
}

impl AuditService {
    pub fn new(audit: Arc<dyn AuditLogRepository>, users: Arc<dyn UserDirectory>) -> Self {
        Self { audit, users }
    }

    /// Entries most-recent-first, each joined with target and actor identity.
    pub async fn get_audit_logs(&self, mut query: AuditLogQuery) -> Result<Vec<AuditLogView>> {
        if let Some(tag) = query.tag.as_deref() {
            query.tag = Some(validate_tag_name(tag)?);
        }
        let entries = self.audit.list(&query).await?;

        let mut ids: Vec<Uuid> = entries
            .iter()
            .flat_map(|e| [e.user_id, e.actor_id])
            .collect();
        ids.sort();
        ids.dedup();
        let users: HashMap<Uuid, UserIdentity> = self
            .users
            .get_users(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        tracing::debug!(
            subsystem = "core",
            component = "audit",
            op = "get_audit_logs",
            tag = ?query.tag,
            limit = query.limit,
            result_count = entries.len(),
            "Listed audit entries"
        );

        Ok(entries
            .into_iter()
            .map(|entry| AuditLogView {
                user: users.get(&entry.user_id).cloned(),
                actor: users.get(&entry.actor_id).cloned(),
                entry,
            })
            .collect())
    }
}
