//! Permission audit log repository.
//!
//! Entries are only ever inserted. Permission mutations write their entry
//! through [`insert_audit_tx`] inside the mutation's own transaction.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};

use cadenza_core::{AuditLogEntry, AuditLogQuery, AuditLogRepository, Error, Result};

use crate::convert::{parse_action, parse_optional_role};

/// PostgreSQL implementation of AuditLogRepository.
pub struct PgAuditLogRepository {
    pool: Pool<Postgres>,
}

impl PgAuditLogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Insert an audit entry within an existing transaction.
pub(crate) async fn insert_audit_tx(
    tx: &mut Transaction<'_, Postgres>,
    entry: &AuditLogEntry,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tag_permission_audit_log
            (id, tag, user_id, actor_id, action, old_role, new_role, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(entry.id)
    .bind(&entry.tag)
    .bind(entry.user_id)
    .bind(entry.actor_id)
    .bind(entry.action.as_str())
    .bind(entry.old_role.map(|r| r.as_str()))
    .bind(entry.new_role.map(|r| r.as_str()))
    .bind(&entry.description)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;
    Ok(())
}

fn row_to_entry(r: &PgRow) -> Result<AuditLogEntry> {
    Ok(AuditLogEntry {
        id: r.get("id"),
        tag: r.get("tag"),
        user_id: r.get("user_id"),
        actor_id: r.get("actor_id"),
        action: parse_action(r.get::<&str, _>("action"))?,
        old_role: parse_optional_role(r.get("old_role"))?,
        new_role: parse_optional_role(r.get("new_role"))?,
        description: r.get("description"),
        created_at: r.get("created_at"),
    })
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    async fn record(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        insert_audit_tx(&mut tx, entry).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn list(&self, query: &AuditLogQuery) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tag, user_id, actor_id, action, old_role, new_role, description, created_at
            FROM tag_permission_audit_log
            WHERE ($1::text IS NULL OR tag = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(&query.tag)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(row_to_entry).collect()
    }
}
