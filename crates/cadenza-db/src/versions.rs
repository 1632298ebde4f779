//! Sealed tag version repository.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};

use cadenza_core::{Error, Result, TagChange, TagVersion, TagVersionRepository};

use crate::convert::is_unique_violation;

/// PostgreSQL implementation of TagVersionRepository.
pub struct PgTagVersionRepository {
    pool: Pool<Postgres>,
}

impl PgTagVersionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagVersionRepository for PgTagVersionRepository {
    async fn save(&self, version: &TagVersion) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tag_version (id, tag, version, changes, author, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(version.id)
        .bind(&version.tag)
        .bind(version.version)
        .bind(Json(&version.changes))
        .bind(&version.author)
        .bind(version.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict(format!(
                    "tag {} already has version {}",
                    version.tag, version.version
                ))
            } else {
                Error::Database(e)
            }
        })?;
        Ok(())
    }

    async fn list(&self, tag: &str) -> Result<Vec<TagVersion>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tag, version, changes, author, created_at
            FROM tag_version
            WHERE tag = $1
            ORDER BY version
            "#,
        )
        .bind(tag)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| TagVersion {
                id: r.get("id"),
                tag: r.get("tag"),
                version: r.get("version"),
                changes: r.get::<Json<Vec<TagChange>>, _>("changes").0,
                created_at: r.get("created_at"),
                author: r.get("author"),
            })
            .collect())
    }

    async fn latest_version_number(&self, tag: &str) -> Result<Option<i32>> {
        let latest: Option<i32> =
            sqlx::query_scalar("SELECT MAX(version) FROM tag_version WHERE tag = $1")
                .bind(tag)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(latest)
    }
}
