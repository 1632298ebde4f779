//! User directory and session lookup.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use cadenza_core::{Actor, Error, Result, SessionRepository, UserDirectory, UserIdentity};

use crate::convert::parse_site_role;

/// PostgreSQL implementation of UserDirectory.
pub struct PgUserDirectory {
    pool: Pool<Postgres>,
}

impl PgUserDirectory {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserIdentity>> {
        let row = sqlx::query("SELECT id, name, email FROM app_user WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(|r| UserIdentity {
            id: r.get("id"),
            name: r.get("name"),
            email: r.get("email"),
        }))
    }

    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<UserIdentity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT id, name, email FROM app_user WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| UserIdentity {
                id: r.get("id"),
                name: r.get("name"),
                email: r.get("email"),
            })
            .collect())
    }
}

/// PostgreSQL implementation of SessionRepository.
pub struct PgSessionRepository {
    pool: Pool<Postgres>,
}

impl PgSessionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn resolve(&self, token: &str) -> Result<Option<Actor>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.site_role
            FROM user_session s
            JOIN app_user u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > now()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(r) => Ok(Some(Actor {
                id: r.get("id"),
                site_role: parse_site_role(r.get::<&str, _>("site_role"))?,
            })),
            None => Ok(None),
        }
    }
}
