//! Tag permission repository.
//!
//! Each mutation locks the affected row, applies the change and writes the
//! matching audit entry before committing, so the assignment table and the
//! audit log never disagree. `upsert` claims a missing pair with
//! `ON CONFLICT DO NOTHING` first, since there is no row to lock yet.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use cadenza_core::{
    AuditLogEntry, Error, Permission, PermissionGrant, PermissionRepository, Result, TagRole,
};

use crate::audit::insert_audit_tx;
use crate::convert::{is_unique_violation, parse_role};

/// PostgreSQL implementation of PermissionRepository.
pub struct PgPermissionRepository {
    pool: Pool<Postgres>,
}

impl PgPermissionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Current role for the pair, locking the row until the transaction ends.
    async fn lock_role_tx(
        tx: &mut Transaction<'_, Postgres>,
        tag: &str,
        user_id: Uuid,
    ) -> Result<Option<TagRole>> {
        let role: Option<String> = sqlx::query_scalar(
            r#"
            SELECT role FROM tag_permission
            WHERE tag = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(tag)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        role.as_deref().map(parse_role).transpose()
    }

    async fn insert_row_tx(
        tx: &mut Transaction<'_, Postgres>,
        grant: &PermissionGrant,
    ) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO tag_permission (tag, user_id, role, granted_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            "#,
        )
        .bind(&grant.tag)
        .bind(grant.user_id)
        .bind(grant.role.as_str())
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::DuplicateAssignment {
                    tag: grant.tag.clone(),
                    user_id: grant.user_id,
                }
            } else {
                Error::Database(e)
            }
        })?;
        Ok(())
    }

    /// Insert unless the pair already exists. Returns whether a row was written.
    async fn insert_if_absent_tx(
        tx: &mut Transaction<'_, Postgres>,
        grant: &PermissionGrant,
    ) -> Result<bool> {
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO tag_permission (tag, user_id, role, granted_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (tag, user_id) DO NOTHING
            RETURNING user_id
            "#,
        )
        .bind(&grant.tag)
        .bind(grant.user_id)
        .bind(grant.role.as_str())
        .bind(Utc::now())
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(inserted.is_some())
    }

    async fn update_row_tx(
        tx: &mut Transaction<'_, Postgres>,
        grant: &PermissionGrant,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tag_permission
            SET role = $3, updated_at = $4
            WHERE tag = $1 AND user_id = $2
            "#,
        )
        .bind(&grant.tag)
        .bind(grant.user_id)
        .bind(grant.role.as_str())
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn audit_and_commit(
        mut tx: Transaction<'_, Postgres>,
        grant: &PermissionGrant,
        old_role: Option<TagRole>,
    ) -> Result<AuditLogEntry> {
        let entry = AuditLogEntry::for_change(
            &grant.tag,
            grant.user_id,
            grant.actor_id,
            old_role,
            Some(grant.role),
            grant.description.clone(),
        );
        insert_audit_tx(&mut tx, &entry).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(entry)
    }
}

fn row_to_permission(r: &PgRow) -> Result<Permission> {
    Ok(Permission {
        tag: r.get("tag"),
        user_id: r.get("user_id"),
        role: parse_role(r.get::<&str, _>("role"))?,
        granted_at: r.get("granted_at"),
    })
}

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    async fn get(&self, tag: &str, user_id: Uuid) -> Result<Option<Permission>> {
        let row = sqlx::query(
            r#"
            SELECT tag, user_id, role, granted_at
            FROM tag_permission
            WHERE tag = $1 AND user_id = $2
            "#,
        )
        .bind(tag)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(row_to_permission).transpose()
    }

    async fn list_for_tag(&self, tag: &str) -> Result<Vec<Permission>> {
        let rows = sqlx::query(
            r#"
            SELECT tag, user_id, role, granted_at
            FROM tag_permission
            WHERE tag = $1
            ORDER BY granted_at, user_id
            "#,
        )
        .bind(tag)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(row_to_permission).collect()
    }

    async fn list_all(&self) -> Result<Vec<Permission>> {
        let rows = sqlx::query(
            r#"
            SELECT tag, user_id, role, granted_at
            FROM tag_permission
            ORDER BY tag, granted_at, user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(row_to_permission).collect()
    }

    async fn insert(&self, grant: &PermissionGrant) -> Result<AuditLogEntry> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        Self::insert_row_tx(&mut tx, grant).await?;
        Self::audit_and_commit(tx, grant, None).await
    }

    async fn update(&self, grant: &PermissionGrant) -> Result<AuditLogEntry> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let old_role = Self::lock_role_tx(&mut tx, &grant.tag, grant.user_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "permission for user {} on tag {}",
                    grant.user_id, grant.tag
                ))
            })?;
        Self::update_row_tx(&mut tx, grant).await?;
        Self::audit_and_commit(tx, grant, Some(old_role)).await
    }

    async fn upsert(&self, grant: &PermissionGrant) -> Result<Option<AuditLogEntry>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        if Self::insert_if_absent_tx(&mut tx, grant).await? {
            return Self::audit_and_commit(tx, grant, None).await.map(Some);
        }

        // Row already present, possibly committed by a concurrent upsert.
        match Self::lock_role_tx(&mut tx, &grant.tag, grant.user_id).await? {
            Some(old) if old == grant.role => {
                tx.rollback().await.map_err(Error::Database)?;
                Ok(None)
            }
            Some(old) => {
                Self::update_row_tx(&mut tx, grant).await?;
                Self::audit_and_commit(tx, grant, Some(old)).await.map(Some)
            }
            None => Err(Error::Conflict(format!(
                "permission for user {} on tag {} was removed concurrently",
                grant.user_id, grant.tag
            ))),
        }
    }

    async fn delete(&self, tag: &str, user_id: Uuid, actor_id: Uuid) -> Result<AuditLogEntry> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let removed: Option<String> = sqlx::query_scalar(
            r#"
            DELETE FROM tag_permission
            WHERE tag = $1 AND user_id = $2
            RETURNING role
            "#,
        )
        .bind(tag)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let old_role = match removed {
            Some(role) => parse_role(&role)?,
            None => {
                return Err(Error::NotFound(format!(
                    "permission for user {} on tag {}",
                    user_id, tag
                )))
            }
        };

        let entry = AuditLogEntry::for_change(tag, user_id, actor_id, Some(old_role), None, None);
        insert_audit_tx(&mut tx, &entry).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(entry)
    }
}
