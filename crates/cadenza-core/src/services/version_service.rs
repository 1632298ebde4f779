//! Sealing and listing tag versions.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::events::{EventActor, EventBus, ServerEvent};
use crate::tags::{validate_tag_name, CreateTagVersionRequest, TagVersion};
use crate::traits::TagVersionRepository;
use crate::versioning::TagVersionLogger;

#[derive(Clone)]
pub struct VersionService {
    versions: Arc<dyn TagVersionRepository>,
    events: EventBus,
}

impl VersionService {
    pub fn new(versions: Arc<dyn TagVersionRepository>, events: EventBus) -> Self {
        Self { versions, events }
    }

    /// Seal `req.changes` as the next version of `tag` and persist it.
    ///
    /// A concurrent seal of the same tag loses with `Conflict`.
    pub async fn create_version(&self, tag: &str, req: CreateTagVersionRequest) -> Result<TagVersion> {
        let tag = validate_tag_name(tag)?;
        if req.changes.is_empty() {
            return Err(Error::InvalidInput(
                "a version needs at least one change".to_string(),
            ));
        }

        let mut logger = TagVersionLogger::new(tag.as_str());
        for change in req.changes {
            logger.log_change(change);
        }
        let previous = self.versions.latest_version_number(&tag).await?;
        let version = logger.create_version(previous, req.author)?;
        self.versions.save(&version).await?;

        tracing::info!(
            subsystem = "core",
            component = "versions",
            op = "create_version",
            tag = %version.tag,
            version = version.version,
            change_count = version.changes.len(),
            "Created tag version"
        );
        self.events.emit(
            ServerEvent::TagVersionCreated {
                tag: version.tag.clone(),
                version: version.version,
                change_count: version.changes.len(),
            },
            EventActor::System,
        );
        Ok(version)
    }

    /// Versions of `tag`, oldest first.
    pub async fn list_versions(&self, tag: &str) -> Result<Vec<TagVersion>> {
        let tag = validate_tag_name(tag)?;
        self.versions.list(&tag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::fixture;
    use crate::tags::{TagChangeDetails, TagChangeInput, TagChangeKind};

    fn request(n: usize) -> CreateTagVersionRequest {
        CreateTagVersionRequest {
            changes: (0..n)
                .map(|i| TagChangeInput {
                    kind: TagChangeKind::Rename,
                    description: format!("change {}", i),
                    details: TagChangeDetails {
                        old_value: Some("Rock".to_string()),
                        new_value: Some("rock".to_string()),
                        reason: None,
                    },
                    comment: None,
                    author: None,
                })
                .collect(),
            author: Some("curator".to_string()),
        }
    }

    #[tokio::test]
    async fn test_versions_increment_per_tag() {
        let f = fixture().await;
        let svc = &f.governance.versions;

        let v1 = svc.create_version("rock", request(2)).await.unwrap();
        let v2 = svc.create_version("rock", request(1)).await.unwrap();
        let j1 = svc.create_version("jazz", request(3)).await.unwrap();

        assert_eq!((v1.version, v2.version, j1.version), (1, 2, 1));
        assert_eq!(v1.changes.len(), 2);

        let listed = svc.list_versions("rock").await.unwrap();
        let numbers: Vec<i32> = listed.iter().map(|v| v.version).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let f = fixture().await;
        assert!(matches!(
            f.governance.versions.create_version("rock", request(0)).await,
            Err(Error::InvalidInput(_))
        ));
    }
}
