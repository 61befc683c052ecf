//! Domain service for user, department and audit-log administration.
//!
//! Every operation requires an Admin or Superadmin actor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{AuditEntry, Department, RoleRow, User};
use crate::domain::{Actor, Role, UserId};

#[derive(Debug, Error)]
pub enum UserAdminError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for UserAdminError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for UserAdminError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role: Role,
    pub department_id: Option<i32>,
    #[serde(default)]
    pub is_superadmin: bool,
}

/// Absent fields are left untouched. `email`/`department_id` set to `null`
/// clear the value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "double_option")]
    pub department_id: Option<Option<i32>>,
    pub is_superadmin: Option<bool>,
    pub active: Option<bool>,
    pub password: Option<String>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    pub items: Vec<AuditEntry>,
    pub page: u64,
    pub total_pages: u64,
}

#[async_trait::async_trait]
pub trait UserAdminService: Send + Sync {
    async fn list_users(&self, actor: &Actor) -> Result<Vec<User>, UserAdminError>;

    /// # Errors
    ///
    /// Returns [`UserAdminError::Conflict`] when the username is taken and
    /// [`UserAdminError::Forbidden`] when an Admin tries to grant Superadmin.
    async fn create_user(
        &self,
        actor: &Actor,
        request: CreateUserRequest,
    ) -> Result<User, UserAdminError>;

    async fn update_user(
        &self,
        actor: &Actor,
        id: UserId,
        request: UpdateUserRequest,
    ) -> Result<User, UserAdminError>;

    async fn delete_user(&self, actor: &Actor, id: UserId) -> Result<(), UserAdminError>;

    async fn list_roles(&self, actor: &Actor) -> Result<Vec<RoleRow>, UserAdminError>;

    /// Departments are readable by every authenticated user.
    async fn list_departments(&self) -> Result<Vec<Department>, UserAdminError>;

    async fn create_department(
        &self,
        actor: &Actor,
        name: &str,
    ) -> Result<Department, UserAdminError>;

    /// Newest first; `page` starts at 1.
    async fn audit_log(
        &self,
        actor: &Actor,
        page: u64,
        page_size: u64,
    ) -> Result<AuditPage, UserAdminError>;
}
