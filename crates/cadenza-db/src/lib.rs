//! # cadenza-db
//!
//! PostgreSQL persistence for cadenza tag governance.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for every `cadenza-core` governance trait
//! - Embedded migrations (behind the `migrations` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use cadenza_db::Database;
//! use cadenza_core::{EventBus, Governance};
//!
//! let db = Database::connect("postgres://localhost/cadenza").await?;
//! let governance = Governance::new(&db.stores(), EventBus::default());
//! let hierarchy = governance.hierarchy.get_hierarchy().await?;
//! ```

pub mod audit;
mod convert;
pub mod hierarchy;
pub mod identity;
pub mod permissions;
pub mod pool;
pub mod saved_searches;
pub mod templates;
pub mod versions;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use std::sync::Arc;

// Re-export core types
pub use cadenza_core::*;

pub use audit::PgAuditLogRepository;
pub use hierarchy::PgHierarchyRepository;
pub use identity::{PgSessionRepository, PgUserDirectory};
pub use permissions::PgPermissionRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use saved_searches::PgSavedSearchRepository;
pub use templates::PgTemplateRepository;
pub use versions::PgTagVersionRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub hierarchy: Arc<PgHierarchyRepository>,
    pub permissions: Arc<PgPermissionRepository>,
    pub audit: Arc<PgAuditLogRepository>,
    pub templates: Arc<PgTemplateRepository>,
    pub users: Arc<PgUserDirectory>,
    pub sessions: Arc<PgSessionRepository>,
    pub versions: Arc<PgTagVersionRepository>,
    pub saved_searches: Arc<PgSavedSearchRepository>,
}

impl Database {
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            hierarchy: Arc::new(PgHierarchyRepository::new(pool.clone())),
            permissions: Arc::new(PgPermissionRepository::new(pool.clone())),
            audit: Arc::new(PgAuditLogRepository::new(pool.clone())),
            templates: Arc::new(PgTemplateRepository::new(pool.clone())),
            users: Arc::new(PgUserDirectory::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool.clone())),
            versions: Arc::new(PgTagVersionRepository::new(pool.clone())),
            saved_searches: Arc::new(PgSavedSearchRepository::new(pool.clone())),
            pool,
        }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// The repositories as trait objects, for wiring `Governance`.
    pub fn stores(&self) -> Stores {
        Stores {
            hierarchy: self.hierarchy.clone(),
            permissions: self.permissions.clone(),
            audit: self.audit.clone(),
            templates: self.templates.clone(),
            users: self.users.clone(),
            sessions: self.sessions.clone(),
            versions: self.versions.clone(),
            saved_searches: self.saved_searches.clone(),
        }
    }
}
