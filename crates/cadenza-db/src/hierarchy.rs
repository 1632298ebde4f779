//! Tag hierarchy edge repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use cadenza_core::{Error, HierarchyEdge, HierarchyRepository, Result};

use crate::convert::is_unique_violation;

/// PostgreSQL implementation of HierarchyRepository.
pub struct PgHierarchyRepository {
    pool: Pool<Postgres>,
}

impl PgHierarchyRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HierarchyRepository for PgHierarchyRepository {
    async fn list_edges(&self) -> Result<Vec<HierarchyEdge>> {
        let rows = sqlx::query(
            r#"
            SELECT parent_tag, child_tag
            FROM tag_hierarchy
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| HierarchyEdge {
                parent_tag: r.get("parent_tag"),
                child_tag: r.get("child_tag"),
            })
            .collect())
    }

    async fn insert_edge(&self, edge: &HierarchyEdge) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Serialize edge writers so two concurrent inserts cannot close a
        // cycle between them. Readers are not blocked.
        sqlx::query("LOCK TABLE tag_hierarchy IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let creates_cycle: bool = sqlx::query_scalar(
            r#"
            WITH RECURSIVE reachable AS (
                SELECT child_tag AS tag FROM tag_hierarchy WHERE parent_tag = $1
                UNION
                SELECT h.child_tag
                FROM tag_hierarchy h
                JOIN reachable r ON h.parent_tag = r.tag
            )
            SELECT $1 = $2 OR EXISTS (SELECT 1 FROM reachable WHERE tag = $2)
            "#,
        )
        .bind(&edge.child_tag)
        .bind(&edge.parent_tag)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if creates_cycle {
            return Err(Error::InvalidInput(format!(
                "edge {} -> {} would create a cycle",
                edge.parent_tag, edge.child_tag
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO tag_hierarchy (parent_tag, child_tag)
            VALUES ($1, $2)
            "#,
        )
        .bind(&edge.parent_tag)
        .bind(&edge.child_tag)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict(format!(
                    "edge {} -> {} already exists",
                    edge.parent_tag, edge.child_tag
                ))
            } else {
                Error::Database(e)
            }
        })?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete_edge(&self, edge: &HierarchyEdge) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM tag_hierarchy
            WHERE parent_tag = $1 AND child_tag = $2
            "#,
        )
        .bind(&edge.parent_tag)
        .bind(&edge.child_tag)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
