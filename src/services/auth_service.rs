//! Domain service for authentication.
//!
//! Handles login with lockout, session validation and password changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Actor, Role, UserId};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Deliberately indistinguishable from [`AuthError::InvalidCredentials`].
    #[error("Invalid credentials")]
    LockedOut,

    #[error("Account is inactive")]
    Inactive,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

/// How a login was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// Credentials from configuration; no `users` row exists.
    EnvironmentAdmin,
    DatabaseUser,
}

/// Identity stored in the HTTP session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: Option<UserId>,
    pub username: String,
    pub role: Role,
    pub strategy: AuthStrategy,
    pub session_token: String,
}

impl SessionUser {
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.username.clone(), self.role)
    }
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials from `ip` and opens a session.
    ///
    /// Every attempt is recorded, successful or not.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] or [`AuthError::LockedOut`]
    /// (same message) when login fails, [`AuthError::Inactive`] for
    /// deactivated accounts.
    async fn login(
        &self,
        username: &str,
        password: &str,
        ip: &str,
    ) -> Result<SessionUser, AuthError>;

    async fn logout(&self, session: &SessionUser) -> Result<(), AuthError>;

    /// False once a newer login replaced the token or the user was deactivated.
    async fn validate_session(&self, session: &SessionUser) -> Result<bool, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the current password is wrong or
    /// the new one is too short or unchanged.
    async fn change_password(
        &self,
        session: &SessionUser,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}
