//! Column decoding shared by the repositories.

use cadenza_core::{AuditAction, Error, Result, SiteRole, TagRole};

pub(crate) fn parse_role(value: &str) -> Result<TagRole> {
    value.parse().map_err(Error::Serialization)
}

pub(crate) fn parse_optional_role(value: Option<String>) -> Result<Option<TagRole>> {
    value.as_deref().map(parse_role).transpose()
}

pub(crate) fn parse_action(value: &str) -> Result<AuditAction> {
    value.parse().map_err(Error::Serialization)
}

pub(crate) fn parse_site_role(value: &str) -> Result<SiteRole> {
    value.parse().map_err(Error::Serialization)
}

/// True when `err` is a Postgres unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stored_values() {
        assert_eq!(parse_role("editor").unwrap(), TagRole::Editor);
        assert!(parse_role("owner").is_err());
        assert_eq!(parse_optional_role(None).unwrap(), None);
        assert_eq!(
            parse_optional_role(Some("admin".to_string())).unwrap(),
            Some(TagRole::Admin)
        );
        assert_eq!(parse_action("remove").unwrap(), AuditAction::Remove);
        assert_eq!(parse_site_role("admin").unwrap(), SiteRole::Admin);
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
