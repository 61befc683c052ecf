use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set,
};

use crate::config::LoginLockoutConfig;
use crate::entities::{login_attempts, prelude::*};

pub struct LoginAttemptRepository {
    conn: DatabaseConnection,
}

impl LoginAttemptRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn record(
        &self,
        username: Option<&str>,
        ip: &str,
        success: bool,
        now: NaiveDateTime,
    ) -> Result<()> {
        let active_model = login_attempts::ActiveModel {
            username: Set(username.map(str::to_string)),
            ip: Set(ip.to_string()),
            created_at: Set(now),
            success: Set(success),
            ..Default::default()
        };

        LoginAttempts::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to record login attempt")?;
        Ok(())
    }

    pub async fn failures_by_ip_since(&self, ip: &str, since: NaiveDateTime) -> Result<u64> {
        LoginAttempts::find()
            .filter(login_attempts::Column::Ip.eq(ip))
            .filter(login_attempts::Column::Success.eq(false))
            .filter(login_attempts::Column::CreatedAt.gte(since))
            .count(&self.conn)
            .await
            .context("Failed to count login failures by IP")
    }

    pub async fn failures_by_username_since(
        &self,
        username: &str,
        since: NaiveDateTime,
    ) -> Result<u64> {
        LoginAttempts::find()
            .filter(login_attempts::Column::Username.eq(username))
            .filter(login_attempts::Column::Success.eq(false))
            .filter(login_attempts::Column::CreatedAt.gte(since))
            .count(&self.conn)
            .await
            .context("Failed to count login failures by username")
    }

    /// Locked when either the IP or the username has reached `max_failures`
    /// failed attempts inside the window ending at `now`. Successful attempts
    /// are not subtracted.
    pub async fn is_locked_out(
        &self,
        ip: &str,
        username: Option<&str>,
        now: NaiveDateTime,
        lockout: &LoginLockoutConfig,
    ) -> Result<bool> {
        let since = now - lockout.window();

        if self.failures_by_ip_since(ip, since).await? >= lockout.max_failures {
            return Ok(true);
        }

        match username {
            Some(username) if !username.is_empty() => {
                Ok(self.failures_by_username_since(username, since).await? >= lockout.max_failures)
            }
            _ => Ok(false),
        }
    }
}
