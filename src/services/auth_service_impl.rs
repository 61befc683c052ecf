//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::task;
use tracing::{info, warn};

use crate::config::{AdminConfig, SecurityConfig};
use crate::db::{Store, UserChanges};
use crate::db::repositories::user::{
    generate_session_token, hash_password, verify_password_hash,
};
use crate::domain::Role;
use crate::services::audit::AuditSink;
use crate::services::auth_service::{AuthError, AuthService, AuthStrategy, SessionUser};

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
    admin: AdminConfig,
    /// Argon2 hash of the environment admin password, computed once.
    admin_password_hash: Option<String>,
    audit: Arc<dyn AuditSink>,
}

impl SeaOrmAuthService {
    /// Hashes the environment admin password, if one is configured, so logins
    /// verify it through argon2 like any database user.
    pub fn new(
        store: Store,
        security: SecurityConfig,
        admin: AdminConfig,
        audit: Arc<dyn AuditSink>,
    ) -> anyhow::Result<Self> {
        let admin_password_hash = admin
            .resolved_password()
            .map(|password| hash_password(&password, Some(&security)))
            .transpose()?;

        Ok(Self {
            store,
            security,
            admin,
            admin_password_hash,
            audit,
        })
    }

    /// The environment admin applies only while a password is configured.
    fn strategy_for(&self, username: &str) -> AuthStrategy {
        if username == self.admin.username && self.admin_password_hash.is_some() {
            AuthStrategy::EnvironmentAdmin
        } else {
            AuthStrategy::DatabaseUser
        }
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionUser, AuthError> {
        match self.strategy_for(username) {
            AuthStrategy::EnvironmentAdmin => {
                let Some(hash) = self.admin_password_hash.clone() else {
                    return Err(AuthError::InvalidCredentials);
                };
                let password = password.to_string();
                let is_valid =
                    task::spawn_blocking(move || verify_password_hash(&hash, &password))
                        .await
                        .map_err(|e| AuthError::Database(format!("Password task failed: {e}")))??;
                if !is_valid {
                    return Err(AuthError::InvalidCredentials);
                }

                Ok(SessionUser {
                    user_id: None,
                    username: self.admin.username.clone(),
                    role: Role::Superadmin,
                    strategy: AuthStrategy::EnvironmentAdmin,
                    session_token: generate_session_token(),
                })
            }
            AuthStrategy::DatabaseUser => {
                let repo = self.store.user_repo();
                let user = repo
                    .verify_password(username, password)
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;

                if !user.active {
                    return Err(AuthError::Inactive);
                }

                let token = generate_session_token();
                repo.start_session(user.id, &token, Utc::now().naive_utc())
                    .await?;

                Ok(SessionUser {
                    user_id: Some(user.id),
                    role: user.effective_role(),
                    username: user.username,
                    strategy: AuthStrategy::DatabaseUser,
                    session_token: token,
                })
            }
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(
        &self,
        username: &str,
        password: &str,
        ip: &str,
    ) -> Result<SessionUser, AuthError> {
        let username = username.trim();
        let attempts = self.store.login_attempt_repo();
        let now = Utc::now().naive_utc();
        let recorded_name = (!username.is_empty()).then_some(username);

        let locked = attempts
            .is_locked_out(ip, recorded_name, now, &self.security.login_lockout)
            .await?;

        let result = if locked {
            Err(AuthError::LockedOut)
        } else {
            self.authenticate(username, password).await
        };

        attempts
            .record(recorded_name, ip, result.is_ok(), now)
            .await?;

        match &result {
            Ok(session) => {
                metrics::counter!("rqflow_logins_total", "outcome" => "success").increment(1);
                info!(
                    event = "login_succeeded",
                    username = %session.username,
                    strategy = ?session.strategy,
                    ip,
                );
                self.audit
                    .record(session.user_id, "auth", Some(&session.username), "login")
                    .await;
            }
            Err(e) => {
                metrics::counter!("rqflow_logins_total", "outcome" => "failure").increment(1);
                warn!(
                    event = "login_failed",
                    username,
                    ip,
                    locked_out = matches!(e, AuthError::LockedOut),
                    "Login rejected"
                );
            }
        }

        result
    }

    async fn logout(&self, session: &SessionUser) -> Result<(), AuthError> {
        if let Some(id) = session.user_id {
            self.store.user_repo().end_session(id).await?;
        }
        Ok(())
    }

    async fn validate_session(&self, session: &SessionUser) -> Result<bool, AuthError> {
        match (session.strategy, session.user_id) {
            (AuthStrategy::EnvironmentAdmin, _) => {
                Ok(session.username == self.admin.username && self.admin_password_hash.is_some())
            }
            (AuthStrategy::DatabaseUser, Some(id)) => Ok(self
                .store
                .user_repo()
                .session_is_current(id, &session.session_token)
                .await?),
            (AuthStrategy::DatabaseUser, None) => Ok(false),
        }
    }

    async fn change_password(
        &self,
        session: &SessionUser,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let Some(user_id) = session.user_id else {
            return Err(AuthError::Validation(
                "The environment admin password is managed in configuration".to_string(),
            ));
        };

        if new_password.chars().count() < self.security.min_password_length {
            return Err(AuthError::Validation(format!(
                "New password must be at least {} characters",
                self.security.min_password_length
            )));
        }

        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let repo = self.store.user_repo();
        if repo
            .verify_password(&session.username, current_password)
            .await?
            .is_none()
        {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        repo.update(
            user_id,
            UserChanges {
                password: Some(new_password.to_string()),
                ..Default::default()
            },
            &self.security,
            Utc::now().naive_utc(),
        )
        .await?
        .ok_or(AuthError::Unauthorized)?;

        self.audit
            .record(Some(user_id), "auth", Some(&session.username), "password changed")
            .await;

        Ok(())
    }
}
