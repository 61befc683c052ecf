use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use tokio::task;

use crate::config::SecurityConfig;
use crate::domain::{Actor, Role, UserId};
use crate::entities::{departments, roles, users};

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub department_id: Option<i32>,
    pub department: Option<String>,
    pub is_superadmin: bool,
    pub active: bool,
    pub last_login: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    /// Superadmin flag wins over the assigned role.
    #[must_use]
    pub const fn effective_role(&self) -> Role {
        if self.is_superadmin {
            Role::Superadmin
        } else {
            self.role
        }
    }

    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::new(Some(self.id), self.username.clone(), self.effective_role())
    }
}

fn to_user(
    model: users::Model,
    role: Option<roles::Model>,
    department: Option<departments::Model>,
) -> Result<User> {
    let role = role
        .with_context(|| format!("User {} references a missing role", model.username))?
        .name
        .parse::<Role>()?;

    Ok(User {
        id: UserId::new(model.id),
        username: model.username,
        email: model.email,
        role,
        department_id: model.department_id,
        department: department.map(|d| d.name),
        is_superadmin: model.is_superadmin,
        active: model.active,
        last_login: model.last_login,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role: Role,
    pub department_id: Option<i32>,
    pub is_superadmin: bool,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<Option<String>>,
    pub role: Option<Role>,
    pub department_id: Option<Option<i32>>,
    pub is_superadmin: Option<bool>,
    pub active: Option<bool>,
    pub password: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn load(&self, model: users::Model) -> Result<User> {
        let role = roles::Entity::find_by_id(model.role_id)
            .one(&self.conn)
            .await
            .context("Failed to query user role")?;

        let department = match model.department_id {
            Some(id) => departments::Entity::find_by_id(id)
                .one(&self.conn)
                .await
                .context("Failed to query user department")?,
            None => None,
        };

        to_user(model, role, department)
    }

    async fn role_id(&self, role: Role) -> Result<i32> {
        let row = roles::Entity::find()
            .filter(roles::Column::Name.eq(role.as_str()))
            .one(&self.conn)
            .await
            .context("Failed to query role")?
            .with_context(|| format!("Role {role} is not seeded"))?;
        Ok(row.id)
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        match user {
            Some(model) => Ok(Some(self.load(model).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        match user {
            Some(model) => Ok(Some(self.load(model).await?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .find_also_related(roles::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        let departments: HashMap<i32, departments::Model> = departments::Entity::find()
            .all(&self.conn)
            .await
            .context("Failed to list departments")?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        rows.into_iter()
            .map(|(model, role)| {
                let department = model
                    .department_id
                    .and_then(|id| departments.get(&id).cloned());
                to_user(model, role, department)
            })
            .collect()
    }

    /// Verify password for a user; returns the user only when it matches.
    ///
    /// Runs in `spawn_blocking` because Argon2 hashing is CPU-intensive.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || verify_password_hash(&password_hash, &password))
            .await
            .context("Password verification task panicked")??;

        if is_valid {
            Ok(Some(self.load(user).await?))
        } else {
            Ok(None)
        }
    }

    pub async fn create(
        &self,
        new_user: NewUser,
        security: &SecurityConfig,
        now: NaiveDateTime,
    ) -> Result<User> {
        let role_id = self.role_id(new_user.role).await?;

        let password = new_user.password;
        let security = security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .context("Password hashing task panicked")??;

        let model = users::ActiveModel {
            username: Set(new_user.username),
            password_hash: Set(password_hash),
            email: Set(new_user.email),
            role_id: Set(role_id),
            department_id: Set(new_user.department_id),
            is_superadmin: Set(new_user.is_superadmin),
            active: Set(true),
            session_token: Set(None),
            last_login: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert user")?;

        self.load(model).await
    }

    pub async fn update(
        &self,
        id: UserId,
        changes: UserChanges,
        security: &SecurityConfig,
        now: NaiveDateTime,
    ) -> Result<Option<User>> {
        let Some(model) = users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
        else {
            return Ok(None);
        };

        // Sessions carry the role granted at login; any change to it ends them.
        let mut privileges_changed = changes
            .is_superadmin
            .is_some_and(|flag| flag != model.is_superadmin);
        let current_role_id = model.role_id;

        let mut active: users::ActiveModel = model.into();

        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(role) = changes.role {
            let role_id = self.role_id(role).await?;
            privileges_changed |= role_id != current_role_id;
            active.role_id = Set(role_id);
        }
        if let Some(department_id) = changes.department_id {
            active.department_id = Set(department_id);
        }
        if let Some(is_superadmin) = changes.is_superadmin {
            active.is_superadmin = Set(is_superadmin);
        }
        if let Some(is_active) = changes.active {
            active.active = Set(is_active);
            if !is_active {
                active.session_token = Set(None);
            }
        }
        if privileges_changed {
            active.session_token = Set(None);
        }
        if let Some(password) = changes.password {
            let security = security.clone();
            let hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
                .await
                .context("Password hashing task panicked")??;
            active.password_hash = Set(hash);
        }
        active.updated_at = Set(now);

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;
        Ok(Some(self.load(model).await?))
    }

    pub async fn delete(&self, id: UserId) -> Result<bool> {
        let result = users::Entity::delete_by_id(id.value())
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;
        Ok(result.rows_affected > 0)
    }

    /// Stores a fresh session token and login time, invalidating older sessions.
    pub async fn start_session(&self, id: UserId, token: &str, now: NaiveDateTime) -> Result<()> {
        users::Entity::update_many()
            .col_expr(
                users::Column::SessionToken,
                sea_orm::sea_query::Expr::value(token),
            )
            .col_expr(users::Column::LastLogin, sea_orm::sea_query::Expr::value(now))
            .filter(users::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to store session token")?;
        Ok(())
    }

    pub async fn end_session(&self, id: UserId) -> Result<()> {
        users::Entity::update_many()
            .col_expr(
                users::Column::SessionToken,
                sea_orm::sea_query::Expr::value(Option::<String>::None),
            )
            .filter(users::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to clear session token")?;
        Ok(())
    }

    /// True when `token` is still the active session of an active user.
    pub async fn session_is_current(&self, id: UserId, token: &str) -> Result<bool> {
        let user = users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user session")?;

        Ok(user.is_some_and(|u| u.active && u.session_token.as_deref() == Some(token)))
    }

    /// Addresses of active users holding `role`.
    pub async fn emails_for_role(&self, role: Role) -> Result<Vec<String>> {
        let role_id = self.role_id(role).await?;

        let rows = users::Entity::find()
            .filter(users::Column::RoleId.eq(role_id))
            .filter(users::Column::Active.eq(true))
            .filter(users::Column::Email.is_not_null())
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query role recipients")?;

        Ok(rows
            .into_iter()
            .filter_map(|u| u.email)
            .filter(|e| !e.trim().is_empty())
            .collect())
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the crate's default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Checks `password` against a PHC-formatted argon2 hash. Blocking.
pub fn verify_password_hash(password_hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Random 64 character hex token for sessions.
#[must_use]
pub fn generate_session_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_shape() {
        let token = generate_session_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn test_hash_password_verifies() {
        let hash = hash_password("correct horse", None).unwrap();
        assert!(verify_password_hash(&hash, "correct horse").unwrap());
        assert!(!verify_password_hash(&hash, "wrong").unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(verify_password_hash("plain-text", "plain-text").is_err());
    }
}
