//! Tag version logger.
//!
//! A [`TagVersionLogger`] accumulates [`TagChange`] records for one tag and
//! seals them into a numbered [`TagVersion`]. The logger is a plain value
//! owned by its caller; mutation goes through `&mut self`, so sharing one
//! across tasks requires an external lock.
//!
//! Sealing drains the buffer. A batch of changes therefore ends up in
//! exactly one version.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::tags::{TagChange, TagChangeInput, TagVersion};
use crate::uuid_utils::new_v7;

/// Accumulates pending changes for a tag until they are sealed.
#[derive(Debug, Clone)]
pub struct TagVersionLogger {
    tag: String,
    pending: Vec<TagChange>,
}

impl TagVersionLogger {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            pending: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Changes logged since the last seal, in logging order.
    pub fn pending(&self) -> &[TagChange] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Append a change, stamping it with the current time.
    pub fn log_change(&mut self, input: TagChangeInput) -> &TagChange {
        self.pending.push(TagChange {
            kind: input.kind,
            description: input.description,
            timestamp: Utc::now(),
            details: input.details,
            comment: input.comment,
            author: input.author,
        });
        // Just pushed, so the buffer is non-empty
        &self.pending[self.pending.len() - 1]
    }

    /// Seal the pending changes into the version after `previous_version`.
    ///
    /// The new version number is `previous_version.unwrap_or(0) + 1`. The
    /// buffer is left empty afterwards.
    pub fn create_version(
        &mut self,
        previous_version: Option<i32>,
        author: Option<String>,
    ) -> Result<TagVersion> {
        let previous = previous_version.unwrap_or(0);
        if previous < 0 {
            return Err(Error::InvalidInput(format!(
                "previous version must not be negative, got {}",
                previous
            )));
        }
        let version = previous
            .checked_add(1)
            .ok_or_else(|| Error::InvalidInput("version number overflow".to_string()))?;

        let sealed = TagVersion {
            id: new_v7(),
            tag: self.tag.clone(),
            version,
            changes: std::mem::take(&mut self.pending),
            created_at: Utc::now(),
            author,
        };

        tracing::debug!(
            subsystem = "core",
            component = "version_logger",
            op = "create_version",
            tag = %sealed.tag,
            version = sealed.version,
            change_count = sealed.changes.len(),
            "Sealed tag version"
        );

        Ok(sealed)
    }

    /// Discard all pending changes.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{TagChangeDetails, TagChangeKind};

    fn change(kind: TagChangeKind, description: &str) -> TagChangeInput {
        TagChangeInput {
            kind,
            description: description.to_string(),
            details: TagChangeDetails::default(),
            comment: None,
            author: None,
        }
    }

    #[test]
    fn test_version_follows_previous() {
        let mut logger = TagVersionLogger::new("rock");
        for i in 0..3 {
            logger.log_change(change(TagChangeKind::Alias, &format!("alias {}", i)));
        }

        let version = logger.create_version(Some(4), None).unwrap();
        assert_eq!(version.version, 5);
        assert_eq!(version.changes.len(), 3);
        assert_eq!(version.tag, "rock");
    }

    #[test]
    fn test_first_version_is_one() {
        let mut logger = TagVersionLogger::new("rock");
        logger.log_change(change(TagChangeKind::Rename, "Rock -> rock"));
        let version = logger.create_version(None, Some("curator".to_string())).unwrap();
        assert_eq!(version.version, 1);
        assert_eq!(version.author.as_deref(), Some("curator"));
    }

    #[test]
    fn test_changes_keep_logging_order() {
        let mut logger = TagVersionLogger::new("jazz");
        logger.log_change(change(TagChangeKind::Rename, "first"));
        logger.log_change(change(TagChangeKind::Merge, "second"));
        logger.log_change(change(TagChangeKind::Limit, "third"));

        let version = logger.create_version(None, None).unwrap();
        let descriptions: Vec<&str> = version
            .changes
            .iter()
            .map(|c| c.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["first", "second", "third"]);
        assert!(version.changes[0].timestamp <= version.changes[2].timestamp);
    }

    #[test]
    fn test_clear_then_create_has_no_changes() {
        let mut logger = TagVersionLogger::new("rock");
        logger.log_change(change(TagChangeKind::Split, "split"));
        logger.clear();

        let version = logger.create_version(Some(1), None).unwrap();
        assert_eq!(version.version, 2);
        assert!(version.changes.is_empty());
    }

    #[test]
    fn test_create_version_drains_buffer() {
        let mut logger = TagVersionLogger::new("rock");
        logger.log_change(change(TagChangeKind::Hierarchy, "moved under music"));

        let first = logger.create_version(None, None).unwrap();
        assert_eq!(first.changes.len(), 1);
        assert!(logger.is_empty());

        let second = logger.create_version(Some(first.version), None).unwrap();
        assert_eq!(second.version, 2);
        assert!(second.changes.is_empty());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_negative_previous_rejected() {
        let mut logger = TagVersionLogger::new("rock");
        assert!(matches!(
            logger.create_version(Some(-1), None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_log_change_assigns_timestamp() {
        let before = Utc::now();
        let mut logger = TagVersionLogger::new("rock");
        let logged = logger.log_change(change(TagChangeKind::Alias, "alias"));
        assert!(logged.timestamp >= before);
        assert_eq!(logger.pending().len(), 1);
    }
}
