//! Governance event types, envelope schema, and event bus.
//!
//! Permission, hierarchy and version mutations publish a [`ServerEvent`] on a
//! single broadcast channel. Downstream consumers (notification delivery,
//! cache invalidation) subscribe independently.
//!
//! Every emission is wrapped in an [`EventEnvelope`] carrying the event id,
//! timestamp, actor and entity scope; the domain data lives in `payload`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::tags::{AuditAction, TagRole};

/// Origin of an event, serialized as `{"kind":"user","id":...,"name":...}`
/// or `{"kind":"system"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EventActor {
    System,
    User {
        id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl EventActor {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::System => None,
            Self::User { id, .. } => Some(*id),
        }
    }
}

/// What subscribers receive: a [`ServerEvent`] plus when, who and which entity.
///
/// `event_type` is dot-namespaced (`"tag.permission_changed"`) and
/// `payload_version` is bumped whenever a payload shape changes incompatibly.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub actor: EventActor,
    pub entity_type: &'static str,
    pub entity_id: String,
    pub payload_version: u32,
    pub payload: ServerEvent,
}

impl EventEnvelope {
    pub fn new(event: ServerEvent, actor: EventActor) -> Self {
        Self {
            event_id: crate::uuid_utils::new_v7(),
            event_type: event.namespaced_event_type(),
            occurred_at: Utc::now(),
            actor,
            entity_type: event.entity_type(),
            entity_id: event.entity_id(),
            payload_version: 1,
            payload: event,
        }
    }
}

// ============================================================================
// Server Event (domain payloads)
// ============================================================================

/// Governance event payload, serialized with a `type` tag:
/// `{"type":"TagPermissionChanged","tag":"rock",...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// A role assignment was added, changed or removed.
    TagPermissionChanged {
        tag: String,
        target_user_id: Uuid,
        actor_id: Uuid,
        action: AuditAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        role: Option<TagRole>,
        #[serde(skip_serializing_if = "Option::is_none")]
        old_role: Option<TagRole>,
        /// Rendered notification line, when both identities are known.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// A hierarchy edge was added or removed.
    TagHierarchyChanged {
        parent_tag: String,
        child_tag: String,
        added: bool,
    },
    /// A batch of tag changes was sealed into a version.
    TagVersionCreated {
        tag: String,
        version: i32,
        change_count: usize,
    },
}

impl ServerEvent {
    /// Variant name, as it appears in the `type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TagPermissionChanged { .. } => "TagPermissionChanged",
            Self::TagHierarchyChanged { .. } => "TagHierarchyChanged",
            Self::TagVersionCreated { .. } => "TagVersionCreated",
        }
    }

    /// Dot-namespaced type used in the envelope.
    pub fn namespaced_event_type(&self) -> &'static str {
        match self {
            Self::TagPermissionChanged { .. } => "tag.permission_changed",
            Self::TagHierarchyChanged { .. } => "tag.hierarchy_changed",
            Self::TagVersionCreated { .. } => "tag.version_created",
        }
    }

    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::TagPermissionChanged { .. } | Self::TagVersionCreated { .. } => "tag",
            Self::TagHierarchyChanged { .. } => "tag_hierarchy",
        }
    }

    /// Tag name for tag-scoped events; `parent/child` for hierarchy edges.
    pub fn entity_id(&self) -> String {
        match self {
            Self::TagPermissionChanged { tag, .. } | Self::TagVersionCreated { tag, .. } => {
                tag.clone()
            }
            Self::TagHierarchyChanged {
                parent_tag,
                child_tag,
                ..
            } => format!("{}/{}", parent_tag, child_tag),
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast bus for governance events.
///
/// Backed by `tokio::sync::broadcast`. Slow receivers lag and drop events
/// rather than blocking emitters; emitting with no subscribers is a no-op.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a bus with the given buffer capacity (256 in production).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Wrap and broadcast. Returns the number of subscribers reached.
    pub fn emit(&self, event: ServerEvent, actor: EventActor) -> usize {
        let envelope = EventEnvelope::new(event, actor);
        tracing::debug!(
            subsystem = "core",
            component = "event_bus",
            event_type = envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        self.tx.send(envelope).unwrap_or(0)
    }

    /// Each subscriber gets its own independent stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn permission_event() -> ServerEvent {
        ServerEvent::TagPermissionChanged {
            tag: "rock".to_string(),
            target_user_id: Uuid::nil(),
            actor_id: Uuid::nil(),
            action: AuditAction::Add,
            role: Some(TagRole::Admin),
            old_role: None,
            message: None,
        }
    }

    #[tokio::test]
    async fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(32);
        let mut rx = bus.subscribe();

        assert_eq!(bus.emit(permission_event(), EventActor::System), 1);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event_type, "tag.permission_changed");
        assert_eq!(envelope.payload_version, 1);
        assert_eq!(envelope.actor, EventActor::System);
        assert_eq!(envelope.entity_type, "tag");
        assert_eq!(envelope.entity_id, "rock");
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new(32);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(
            ServerEvent::TagVersionCreated {
                tag: "jazz".to_string(),
                version: 3,
                change_count: 2,
            },
            EventActor::System,
        );

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.event_id, e2.event_id);
    }

    #[test]
    fn test_emit_without_subscribers_reaches_nobody() {
        let bus = EventBus::new(32);
        assert_eq!(bus.emit(permission_event(), EventActor::System), 0);
    }

    #[test]
    fn test_actor_json() {
        let id = Uuid::new_v4();
        let user = EventActor::User {
            id,
            name: Some("Alice".to_string()),
        };
        assert_eq!(user.user_id(), Some(id));

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["kind"], "user");
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["name"], "Alice");

        let json = serde_json::to_value(EventActor::System).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "system"}));
    }

    #[test]
    fn test_permission_event_json() {
        let json = serde_json::to_value(permission_event()).unwrap();
        assert_eq!(json["type"], "TagPermissionChanged");
        assert_eq!(json["action"], "add");
        assert_eq!(json["role"], "admin");
        assert!(json.get("old_role").is_none());
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_hierarchy_event_entity() {
        let event = ServerEvent::TagHierarchyChanged {
            parent_tag: "music".to_string(),
            child_tag: "rock".to_string(),
            added: true,
        };
        assert_eq!(event.event_type(), "TagHierarchyChanged");
        assert_eq!(event.entity_type(), "tag_hierarchy");
        assert_eq!(event.entity_id(), "music/rock");
    }

    #[test]
    fn test_envelope_json_serialization() {
        let envelope = EventEnvelope::new(permission_event(), EventActor::System);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event_type"], "tag.permission_changed");
        assert_eq!(json["entity_id"], "rock");
        assert_eq!(json["payload"]["type"], "TagPermissionChanged");
        assert_eq!(json["actor"]["kind"], "system");
    }
}
