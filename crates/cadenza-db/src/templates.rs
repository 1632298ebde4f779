//! Permission template repository.
//!
//! Template roles are stored as a JSONB array of `{user_id, role}`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use cadenza_core::{
    new_v7, CreatePermissionTemplateRequest, Error, PermissionTemplate, Result,
    TemplateRepository, TemplateRole, UpdatePermissionTemplateRequest,
};

/// PostgreSQL implementation of TemplateRepository.
pub struct PgTemplateRepository {
    pool: Pool<Postgres>,
}

impl PgTemplateRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_template(r: PgRow) -> PermissionTemplate {
    PermissionTemplate {
        id: r.get("id"),
        name: r.get("name"),
        description: r.get("description"),
        roles: r.get::<Json<Vec<TemplateRole>>, _>("roles").0,
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

#[async_trait]
impl TemplateRepository for PgTemplateRepository {
    async fn create(&self, req: CreatePermissionTemplateRequest) -> Result<PermissionTemplate> {
        let id = new_v7();
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO permission_template (id, name, description, roles, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, name, description, roles, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(Json(&req.roles))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row_to_template(row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<PermissionTemplate>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, roles, created_at, updated_at
            FROM permission_template
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(row_to_template))
    }

    async fn list(&self) -> Result<Vec<PermissionTemplate>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, roles, created_at, updated_at
            FROM permission_template
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(row_to_template).collect())
    }

    async fn update(
        &self,
        id: Uuid,
        req: UpdatePermissionTemplateRequest,
    ) -> Result<PermissionTemplate> {
        // Absent fields keep their stored value
        let row = sqlx::query(
            r#"
            UPDATE permission_template
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                roles = COALESCE($4, roles),
                updated_at = $5
            WHERE id = $1
            RETURNING id, name, description, roles, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.roles.as_ref().map(Json))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(row_to_template)
            .ok_or_else(|| Error::NotFound(format!("permission template {}", id)))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM permission_template WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("permission template {}", id)));
        }
        Ok(())
    }
}
