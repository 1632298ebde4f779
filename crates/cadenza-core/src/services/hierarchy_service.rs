//! Hierarchy queries and edge mutations.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::events::{EventBus, ServerEvent};
use crate::hierarchy::{ancestors, build_hierarchy, descendants};
use crate::services::user_actor;
use crate::tags::{validate_tag_name, Actor, HierarchyEdge, TagHierarchy};
use crate::traits::HierarchyRepository;

#[derive(Clone)]
pub struct HierarchyService {
    repo: Arc<dyn HierarchyRepository>,
    events: EventBus,
}

impl HierarchyService {
    pub fn new(repo: Arc<dyn HierarchyRepository>, events: EventBus) -> Self {
        Self { repo, events }
    }

    /// Full tag → `{parents, children}` view.
    pub async fn get_hierarchy(&self) -> Result<TagHierarchy> {
        let edges = self.repo.list_edges().await?;
        Ok(build_hierarchy(&edges))
    }

    pub async fn ancestors(&self, tag: &str) -> Result<Vec<String>> {
        let tag = validate_tag_name(tag)?;
        Ok(ancestors(&self.get_hierarchy().await?, &tag))
    }

    pub async fn descendants(&self, tag: &str) -> Result<Vec<String>> {
        let tag = validate_tag_name(tag)?;
        Ok(descendants(&self.get_hierarchy().await?, &tag))
    }

    /// Add `parent → child`.
    ///
    /// Self-loops and cycle-closing edges fail with `InvalidInput`; an
    /// existing edge fails with `Conflict`.
    pub async fn add_edge(&self, parent: &str, child: &str, actor: &Actor) -> Result<HierarchyEdge> {
        let edge = Self::validated_edge(parent, child)?;
        if edge.parent_tag == edge.child_tag {
            return Err(Error::InvalidInput(format!(
                "tag {} cannot be its own parent",
                edge.parent_tag
            )));
        }

        self.repo.insert_edge(&edge).await?;

        tracing::info!(
            subsystem = "core",
            component = "hierarchy",
            op = "add_edge",
            parent_tag = %edge.parent_tag,
            child_tag = %edge.child_tag,
            actor_id = %actor.id,
            "Added hierarchy edge"
        );
        self.events.emit(
            ServerEvent::TagHierarchyChanged {
                parent_tag: edge.parent_tag.clone(),
                child_tag: edge.child_tag.clone(),
                added: true,
            },
            user_actor(actor),
        );
        Ok(edge)
    }

    /// Remove `parent → child`. Fails with `NotFound` if the edge is absent.
    pub async fn remove_edge(&self, parent: &str, child: &str, actor: &Actor) -> Result<()> {
        let edge = Self::validated_edge(parent, child)?;
        if !self.repo.delete_edge(&edge).await? {
            return Err(Error::NotFound(format!(
                "hierarchy edge {} -> {}",
                edge.parent_tag, edge.child_tag
            )));
        }

        tracing::info!(
            subsystem = "core",
            component = "hierarchy",
            op = "remove_edge",
            parent_tag = %edge.parent_tag,
            child_tag = %edge.child_tag,
            actor_id = %actor.id,
            "Removed hierarchy edge"
        );
        self.events.emit(
            ServerEvent::TagHierarchyChanged {
                parent_tag: edge.parent_tag,
                child_tag: edge.child_tag,
                added: false,
            },
            user_actor(actor),
        );
        Ok(())
    }

    fn validated_edge(parent: &str, child: &str) -> Result<HierarchyEdge> {
        Ok(HierarchyEdge::new(
            validate_tag_name(parent)?,
            validate_tag_name(child)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::services::test_support::fixture;

    #[tokio::test]
    async fn test_add_edges_and_query_closure() {
        let f = fixture().await;
        let svc = &f.governance.hierarchy;
        svc.add_edge("music", "rock", &f.admin).await.unwrap();
        svc.add_edge("rock", "punk", &f.admin).await.unwrap();

        let h = svc.get_hierarchy().await.unwrap();
        assert_eq!(h["rock"].parents, vec!["music"]);
        assert_eq!(h["rock"].children, vec!["punk"]);
        assert_eq!(svc.ancestors("punk").await.unwrap(), vec!["rock", "music"]);
        assert_eq!(svc.descendants("music").await.unwrap(), vec!["rock", "punk"]);
    }

    #[tokio::test]
    async fn test_self_loop_rejected() {
        let f = fixture().await;
        let err = f
            .governance
            .hierarchy
            .add_edge("rock", " rock ", &f.admin)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_cycle_and_duplicate_rejected() {
        let f = fixture().await;
        let svc = &f.governance.hierarchy;
        svc.add_edge("a", "b", &f.admin).await.unwrap();
        svc.add_edge("b", "c", &f.admin).await.unwrap();

        assert!(matches!(
            svc.add_edge("c", "a", &f.admin).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            svc.add_edge("a", "b", &f.admin).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_edge() {
        let f = fixture().await;
        let svc = &f.governance.hierarchy;
        svc.add_edge("music", "rock", &f.admin).await.unwrap();
        svc.remove_edge("music", "rock", &f.admin).await.unwrap();

        assert!(svc.get_hierarchy().await.unwrap().is_empty());
        assert!(matches!(
            svc.remove_edge("music", "rock", &f.admin).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_edge_emits_event() {
        let f = fixture().await;
        let mut rx = f.events.subscribe();
        f.governance
            .hierarchy
            .add_edge("music", "jazz", &f.admin)
            .await
            .unwrap();
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event_type, "tag.hierarchy_changed");
        assert_eq!(envelope.actor.user_id(), Some(f.admin.id));
    }
}
