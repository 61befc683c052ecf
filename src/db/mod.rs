use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use crate::entities::audit_log::Model as AuditEntry;
pub use crate::entities::departments::Model as Department;
pub use crate::entities::roles::Model as RoleRow;
pub use repositories::user::{NewUser, User, UserChanges};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn requisition_repo(&self) -> repositories::requisition::RequisitionRepository {
        repositories::requisition::RequisitionRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn audit_repo(&self) -> repositories::audit::AuditRepository {
        repositories::audit::AuditRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn login_attempt_repo(&self) -> repositories::login_attempt::LoginAttemptRepository {
        repositories::login_attempt::LoginAttemptRepository::new(self.conn.clone())
    }

    fn catalog_repo(&self) -> repositories::catalog::CatalogRepository {
        repositories::catalog::CatalogRepository::new(self.conn.clone())
    }

    fn reference_repo(&self) -> repositories::reference::ReferenceRepository {
        repositories::reference::ReferenceRepository::new(self.conn.clone())
    }

    pub async fn product_suggestions(&self, prefix: &str, limit: u64) -> Result<Vec<String>> {
        self.catalog_repo().suggestions(prefix, limit).await
    }

    pub async fn list_roles(&self) -> Result<Vec<RoleRow>> {
        self.reference_repo().list_roles().await
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        self.reference_repo().list_departments().await
    }

    pub async fn get_department(&self, id: i32) -> Result<Option<Department>> {
        self.reference_repo().get_department(id).await
    }

    pub async fn create_department(&self, name: &str) -> Result<Department> {
        self.reference_repo().create_department(name).await
    }

    pub async fn list_audit(&self, page: u64, page_size: u64) -> Result<(Vec<AuditEntry>, u64)> {
        self.audit_repo().list(page, page_size).await
    }
}
