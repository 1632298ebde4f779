//! Core traits for cadenza abstractions.
//!
//! These traits define the persistence collaborator the governance services
//! run against. `cadenza-db` implements them on PostgreSQL and
//! [`crate::memory::InMemoryStore`] implements them in process.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::tags::*;

// =============================================================================
// HIERARCHY
// =============================================================================

/// Storage for parent → child tag edges.
#[async_trait]
pub trait HierarchyRepository: Send + Sync {
    /// All edges in insertion order.
    async fn list_edges(&self) -> Result<Vec<HierarchyEdge>>;

    /// Insert an edge.
    ///
    /// Fails with `Conflict` if the edge already exists and with
    /// `InvalidInput` if the edge would close a cycle. The check and the
    /// insert are atomic.
    async fn insert_edge(&self, edge: &HierarchyEdge) -> Result<()>;

    /// Delete an edge. Returns `false` if it did not exist.
    async fn delete_edge(&self, edge: &HierarchyEdge) -> Result<bool>;
}

// =============================================================================
// PERMISSIONS AND AUDIT
// =============================================================================

/// Storage for per-tag role assignments.
///
/// Every mutating method writes the assignment change and its audit entry
/// in one transaction and returns the entry that was written.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Get the assignment for a (tag, user) pair.
    async fn get(&self, tag: &str, user_id: Uuid) -> Result<Option<Permission>>;

    /// Assignments for one tag, oldest grant first.
    async fn list_for_tag(&self, tag: &str) -> Result<Vec<Permission>>;

    /// Every assignment, ordered by tag then grant time.
    async fn list_all(&self) -> Result<Vec<Permission>>;

    /// Insert a new assignment. Fails with `DuplicateAssignment` if one exists.
    async fn insert(&self, grant: &PermissionGrant) -> Result<AuditLogEntry>;

    /// Overwrite an existing assignment. Fails with `NotFound` if absent.
    async fn update(&self, grant: &PermissionGrant) -> Result<AuditLogEntry>;

    /// Insert or overwrite. Returns `None` when the stored role already matched
    /// and nothing (including the audit log) was written.
    async fn upsert(&self, grant: &PermissionGrant) -> Result<Option<AuditLogEntry>>;

    /// Delete an assignment. Fails with `NotFound` if absent.
    async fn delete(&self, tag: &str, user_id: Uuid, actor_id: Uuid) -> Result<AuditLogEntry>;
}

/// Append-only audit log storage.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append an entry. Existing entries are never updated or deleted.
    async fn record(&self, entry: &AuditLogEntry) -> Result<()>;

    /// Entries most-recent-first, optionally filtered by tag.
    async fn list(&self, query: &AuditLogQuery) -> Result<Vec<AuditLogEntry>>;
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// Storage for permission templates.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn create(&self, req: CreatePermissionTemplateRequest) -> Result<PermissionTemplate>;

    async fn get(&self, id: Uuid) -> Result<Option<PermissionTemplate>>;

    /// All templates ordered by name.
    async fn list(&self) -> Result<Vec<PermissionTemplate>>;

    /// Fails with `NotFound` if the template does not exist.
    async fn update(
        &self,
        id: Uuid,
        req: UpdatePermissionTemplateRequest,
    ) -> Result<PermissionTemplate>;

    /// Fails with `NotFound` if the template does not exist.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Read-only lookup of user identities.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserIdentity>>;

    /// Identities for the given ids; unknown ids are skipped.
    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<UserIdentity>>;
}

/// Resolves a session token to the authenticated actor.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Returns `None` for unknown or expired tokens.
    async fn resolve(&self, token: &str) -> Result<Option<Actor>>;
}

// =============================================================================
// VERSIONS AND ANALYTICS
// =============================================================================

/// Storage for sealed tag versions.
#[async_trait]
pub trait TagVersionRepository: Send + Sync {
    /// Persist a sealed version. Fails with `Conflict` if the tag already has
    /// a version with the same number.
    async fn save(&self, version: &TagVersion) -> Result<()>;

    /// Versions of a tag in ascending version order.
    async fn list(&self, tag: &str) -> Result<Vec<TagVersion>>;

    /// Highest stored version number for a tag.
    async fn latest_version_number(&self, tag: &str) -> Result<Option<i32>>;
}

/// Read access to the saved-search corpus.
#[async_trait]
pub trait SavedSearchRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<SavedSearch>>;
}
