//! Tag Governance Types
//!
//! Data model for the governed tag system: the parent/child hierarchy,
//! per-tag role assignments, the permission audit log, reusable permission
//! templates, sealed tag versions, and correlation analytics output.
//!
//! # Keys
//!
//! A tag is identified by its name. Names are case-sensitive and unique;
//! there is no numeric tag id anywhere in this module.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Maximum length of a tag name in characters.
pub const MAX_TAG_NAME_LEN: usize = 100;

/// Validate a tag name and return it with surrounding whitespace removed.
pub fn validate_tag_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("tag name must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TAG_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "tag name exceeds {} characters",
            MAX_TAG_NAME_LEN
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(Error::InvalidInput(
            "tag name must not contain control characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

// =============================================================================
// ROLES
// =============================================================================

/// Authorization level a user holds over a single tag.
///
/// Ordered from least to most privileged, so `role >= TagRole::Editor`
/// reads naturally.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TagRole {
    Viewer,
    Editor,
    Admin,
}

impl TagRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for TagRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TagRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Invalid tag role: {}", s)),
        }
    }
}

/// Application-wide role of an authenticated actor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SiteRole {
    #[default]
    Member,
    Admin,
}

impl std::fmt::Display for SiteRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Member => write!(f, "member"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for SiteRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Invalid site role: {}", s)),
        }
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Minimal user identity used to enrich permission and audit listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// The authenticated caller of a governance operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    #[serde(default)]
    pub site_role: SiteRole,
}

impl Actor {
    pub fn new(id: Uuid, site_role: SiteRole) -> Self {
        Self { id, site_role }
    }

    pub fn is_site_admin(&self) -> bool {
        self.site_role == SiteRole::Admin
    }
}

// =============================================================================
// HIERARCHY
// =============================================================================

/// A directed parent → child relation between two tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HierarchyEdge {
    pub parent_tag: String,
    pub child_tag: String,
}

impl HierarchyEdge {
    pub fn new(parent_tag: impl Into<String>, child_tag: impl Into<String>) -> Self {
        Self {
            parent_tag: parent_tag.into(),
            child_tag: child_tag.into(),
        }
    }
}

/// Derived per-tag view of the hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TagHierarchyNode {
    /// Parent tags in edge-insertion order.
    pub parents: Vec<String>,
    /// Child tags in edge-insertion order.
    pub children: Vec<String>,
}

/// Mapping from tag name to its parents and children.
///
/// Tags that appear in no edge are absent; callers default to an empty node.
pub type TagHierarchy = BTreeMap<String, TagHierarchyNode>;

// =============================================================================
// PERMISSIONS
// =============================================================================

/// A stored role assignment for one user on one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Permission {
    pub tag: String,
    pub user_id: Uuid,
    pub role: TagRole,
    pub granted_at: DateTime<Utc>,
}

/// A role assignment joined with the assignee's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PermissionEntry {
    pub user: UserIdentity,
    pub role: TagRole,
}

/// Mapping from tag name to its enriched role assignments.
pub type TagPermissions = BTreeMap<String, Vec<PermissionEntry>>;

/// A permission write together with the actor performing it.
///
/// Repositories persist the assignment change and its audit entry in a
/// single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrant {
    pub tag: String,
    pub user_id: Uuid,
    pub role: TagRole,
    pub actor_id: Uuid,
    pub description: Option<String>,
}

/// Request body for assigning a role on a tag.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AddPermissionRequest {
    pub user_id: Uuid,
    pub role: TagRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Request body for changing an existing role.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdatePermissionRequest {
    pub role: TagRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// =============================================================================
// AUDIT LOG
// =============================================================================

/// Kind of permission mutation recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Add,
    Update,
    Remove,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "update" => Ok(Self::Update),
            "remove" => Ok(Self::Remove),
            _ => Err(format!("Invalid audit action: {}", s)),
        }
    }
}

/// Immutable record of one permission mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub tag: String,
    /// Target user whose role changed.
    pub user_id: Uuid,
    /// User who performed the change.
    pub actor_id: Uuid,
    pub action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_role: Option<TagRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_role: Option<TagRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Build the entry for a mutation from the role before and after it.
    ///
    /// The action is derived from which side is present.
    pub fn for_change(
        tag: &str,
        user_id: Uuid,
        actor_id: Uuid,
        old_role: Option<TagRole>,
        new_role: Option<TagRole>,
        description: Option<String>,
    ) -> Self {
        let action = match (old_role, new_role) {
            (None, _) => AuditAction::Add,
            (Some(_), Some(_)) => AuditAction::Update,
            (Some(_), None) => AuditAction::Remove,
        };
        Self {
            id: crate::uuid_utils::new_v7(),
            tag: tag.to_string(),
            user_id,
            actor_id,
            action,
            old_role,
            new_role,
            description,
            created_at: Utc::now(),
        }
    }
}

/// Audit entry enriched with target and actor identities.
///
/// Identities are `None` when the user no longer exists in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuditLogView {
    #[serde(flatten)]
    pub entry: AuditLogEntry,
    pub user: Option<UserIdentity>,
    pub actor: Option<UserIdentity>,
}

/// Default number of audit entries returned by a listing.
pub const DEFAULT_AUDIT_LIMIT: i64 = 100;

/// Upper bound on audit entries returned by a listing.
pub const MAX_AUDIT_LIMIT: i64 = 1000;

/// Filter for audit log listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    pub tag: Option<String>,
    pub limit: i64,
}

impl Default for AuditLogQuery {
    fn default() -> Self {
        Self {
            tag: None,
            limit: DEFAULT_AUDIT_LIMIT,
        }
    }
}

impl AuditLogQuery {
    pub fn for_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    /// Clamp the requested limit into `1..=MAX_AUDIT_LIMIT`.
    pub fn with_limit(mut self, limit: Option<i64>) -> Self {
        self.limit = limit
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
            .clamp(1, MAX_AUDIT_LIMIT);
        self
    }
}

// =============================================================================
// PERMISSION TEMPLATES
// =============================================================================

/// One (user, role) assignment carried by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TemplateRole {
    pub user_id: Uuid,
    pub role: TagRole,
}

/// A named, reusable bundle of role assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PermissionTemplate {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub roles: Vec<TemplateRole>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a permission template.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreatePermissionTemplateRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub roles: Vec<TemplateRole>,
}

/// Request to update a permission template. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdatePermissionTemplateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<TemplateRole>>,
}

/// Request to apply a template to a set of tags.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApplyTemplateRequest {
    pub tags: Vec<String>,
}

/// What an upsert did to a single (tag, user) assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Added,
    Updated,
    Unchanged,
}

/// A (tag, user) application that succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AppliedAssignment {
    pub tag: String,
    pub user_id: Uuid,
    pub role: TagRole,
    pub outcome: ApplyOutcome,
}

/// A (tag, user) application that failed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FailedAssignment {
    pub tag: String,
    pub user_id: Uuid,
    pub reason: String,
}

/// Partial-success report of a template application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TemplateApplication {
    pub template_id: Uuid,
    pub succeeded: Vec<AppliedAssignment>,
    pub failed: Vec<FailedAssignment>,
}

// =============================================================================
// VERSIONS
// =============================================================================

/// Kind of modification described by a [`TagChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TagChangeKind {
    Rename,
    Merge,
    Split,
    Alias,
    Hierarchy,
    Limit,
}

impl std::fmt::Display for TagChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rename => write!(f, "rename"),
            Self::Merge => write!(f, "merge"),
            Self::Split => write!(f, "split"),
            Self::Alias => write!(f, "alias"),
            Self::Hierarchy => write!(f, "hierarchy"),
            Self::Limit => write!(f, "limit"),
        }
    }
}

/// Before/after values and rationale attached to a change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TagChangeDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One atomic description of a modification to a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TagChange {
    pub kind: TagChangeKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: TagChangeDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// A change as submitted by a client; the timestamp is assigned on logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TagChangeInput {
    pub kind: TagChangeKind,
    pub description: String,
    #[serde(default)]
    pub details: TagChangeDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// A sealed, numbered batch of changes for one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TagVersion {
    pub id: Uuid,
    pub tag: String,
    /// Strictly increasing per tag, starting at 1.
    pub version: i32,
    pub changes: Vec<TagChange>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Request to seal a batch of changes into the next version of a tag.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateTagVersionRequest {
    pub changes: Vec<TagChangeInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

// =============================================================================
// ANALYTICS
// =============================================================================

/// A saved search; its tag set is the correlation corpus unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SavedSearch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Relatedness of one tag to an analysis target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TagRelation {
    pub tag: String,
    pub cooccurrences: u32,
    /// Jaccard similarity in `[0, 1]`.
    pub correlation: f64,
}
