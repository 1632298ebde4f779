//! Saved-search corpus for correlation analysis.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use cadenza_core::{Error, Result, SavedSearch, SavedSearchRepository};

/// PostgreSQL implementation of SavedSearchRepository.
pub struct PgSavedSearchRepository {
    pool: Pool<Postgres>,
}

impl PgSavedSearchRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SavedSearchRepository for PgSavedSearchRepository {
    async fn list(&self) -> Result<Vec<SavedSearch>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, query, tags, created_at
            FROM saved_search
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| SavedSearch {
                id: r.get("id"),
                user_id: r.get("user_id"),
                query: r.get("query"),
                tags: r.get::<Vec<String>, _>("tags"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}
