//! `SeaORM` implementation of the `UserAdminService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{AuditEntry, Department, NewUser, RoleRow, Store, User, UserChanges};
use crate::domain::{Actor, Role, UserId};
use crate::services::audit::AuditSink;
use crate::services::user_admin_service::{
    AuditPage, CreateUserRequest, UpdateUserRequest, UserAdminError, UserAdminService,
};

pub struct SeaOrmUserAdminService {
    store: Store,
    security: SecurityConfig,
    audit: Arc<dyn AuditSink>,
}

impl SeaOrmUserAdminService {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            security,
            audit,
        }
    }

    fn validate_password(&self, password: &str) -> Result<(), UserAdminError> {
        if password.chars().count() < self.security.min_password_length {
            return Err(UserAdminError::Validation(format!(
                "Password must be at least {} characters",
                self.security.min_password_length
            )));
        }
        Ok(())
    }

    async fn ensure_department(&self, id: Option<i32>) -> Result<(), UserAdminError> {
        if let Some(id) = id
            && self.store.get_department(id).await?.is_none()
        {
            return Err(UserAdminError::Validation(format!(
                "Department {id} does not exist"
            )));
        }
        Ok(())
    }
}

fn require_admin(actor: &Actor) -> Result<(), UserAdminError> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(UserAdminError::Forbidden(
            "Administrator role required".to_string(),
        ))
    }
}

/// Granting or touching Superadmin privileges is reserved to Superadmins.
fn require_superadmin_for(actor: &Actor, grants_superadmin: bool) -> Result<(), UserAdminError> {
    if grants_superadmin && actor.role != Role::Superadmin {
        return Err(UserAdminError::Forbidden(
            "Only a superadmin can manage superadmin accounts".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: Option<String>) -> Result<Option<String>, UserAdminError> {
    match email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()) {
        Some(email) if !email.contains('@') => Err(UserAdminError::Validation(format!(
            "Invalid email address {email:?}"
        ))),
        other => Ok(other),
    }
}

#[async_trait]
impl UserAdminService for SeaOrmUserAdminService {
    async fn list_users(&self, actor: &Actor) -> Result<Vec<User>, UserAdminError> {
        require_admin(actor)?;
        Ok(self.store.user_repo().list().await?)
    }

    async fn create_user(
        &self,
        actor: &Actor,
        request: CreateUserRequest,
    ) -> Result<User, UserAdminError> {
        require_admin(actor)?;
        require_superadmin_for(
            actor,
            request.is_superadmin || request.role == Role::Superadmin,
        )?;

        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(UserAdminError::Validation(
                "Username is required".to_string(),
            ));
        }
        self.validate_password(&request.password)?;
        let email = validate_email(request.email)?;
        self.ensure_department(request.department_id).await?;

        let repo = self.store.user_repo();
        if repo.get_by_username(&username).await?.is_some() {
            return Err(UserAdminError::Conflict(format!(
                "Username {username} is already taken"
            )));
        }

        let user = repo
            .create(
                NewUser {
                    username,
                    password: request.password,
                    email,
                    role: request.role,
                    department_id: request.department_id,
                    is_superadmin: request.is_superadmin,
                },
                &self.security,
                Utc::now().naive_utc(),
            )
            .await?;

        info!(
            event = "user_created",
            username = %user.username,
            role = %user.role,
            actor = %actor.username,
        );
        self.audit
            .record(actor.user_id, "users", Some(&user.username), "create")
            .await;

        Ok(user)
    }

    async fn update_user(
        &self,
        actor: &Actor,
        id: UserId,
        request: UpdateUserRequest,
    ) -> Result<User, UserAdminError> {
        require_admin(actor)?;

        let repo = self.store.user_repo();
        let existing = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| UserAdminError::NotFound(format!("User {id}")))?;

        require_superadmin_for(
            actor,
            existing.effective_role() == Role::Superadmin
                || request.is_superadmin == Some(true)
                || request.role == Some(Role::Superadmin),
        )?;

        if actor.is_user(id) && request.active == Some(false) {
            return Err(UserAdminError::Validation(
                "You cannot deactivate your own account".to_string(),
            ));
        }
        if let Some(password) = &request.password {
            self.validate_password(password)?;
        }
        let email = match request.email {
            Some(email) => Some(validate_email(email)?),
            None => None,
        };
        if let Some(department_id) = request.department_id {
            self.ensure_department(department_id).await?;
        }

        let user = repo
            .update(
                id,
                UserChanges {
                    email,
                    role: request.role,
                    department_id: request.department_id,
                    is_superadmin: request.is_superadmin,
                    active: request.active,
                    password: request.password,
                },
                &self.security,
                Utc::now().naive_utc(),
            )
            .await?
            .ok_or_else(|| UserAdminError::NotFound(format!("User {id}")))?;

        self.audit
            .record(actor.user_id, "users", Some(&user.username), "update")
            .await;

        Ok(user)
    }

    async fn delete_user(&self, actor: &Actor, id: UserId) -> Result<(), UserAdminError> {
        require_admin(actor)?;

        if actor.is_user(id) {
            return Err(UserAdminError::Validation(
                "You cannot delete your own account".to_string(),
            ));
        }

        let repo = self.store.user_repo();
        let existing = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| UserAdminError::NotFound(format!("User {id}")))?;
        require_superadmin_for(actor, existing.effective_role() == Role::Superadmin)?;

        repo.delete(id).await?;

        info!(
            event = "user_deleted",
            username = %existing.username,
            actor = %actor.username,
        );
        self.audit
            .record(actor.user_id, "users", Some(&existing.username), "delete")
            .await;

        Ok(())
    }

    async fn list_roles(&self, actor: &Actor) -> Result<Vec<RoleRow>, UserAdminError> {
        require_admin(actor)?;
        Ok(self.store.list_roles().await?)
    }

    async fn list_departments(&self) -> Result<Vec<Department>, UserAdminError> {
        Ok(self.store.list_departments().await?)
    }

    async fn create_department(
        &self,
        actor: &Actor,
        name: &str,
    ) -> Result<Department, UserAdminError> {
        require_admin(actor)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(UserAdminError::Validation(
                "Department name is required".to_string(),
            ));
        }

        let exists = self
            .store
            .list_departments()
            .await?
            .iter()
            .any(|d| d.name.eq_ignore_ascii_case(name));
        if exists {
            return Err(UserAdminError::Conflict(format!(
                "Department {name} already exists"
            )));
        }

        let department = self.store.create_department(name).await?;
        self.audit
            .record(actor.user_id, "departments", Some(&department.name), "create")
            .await;

        Ok(department)
    }

    async fn audit_log(
        &self,
        actor: &Actor,
        page: u64,
        page_size: u64,
    ) -> Result<AuditPage, UserAdminError> {
        require_admin(actor)?;

        let page = page.max(1);
        let (items, total_pages): (Vec<AuditEntry>, u64) =
            self.store.list_audit(page, page_size.clamp(1, 200)).await?;

        Ok(AuditPage {
            items,
            page,
            total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_superadmin_grants_superadmin() {
        let admin = Actor::new(Some(UserId::new(1)), "admin", Role::Admin);
        let root = Actor::new(None, "superadmin", Role::Superadmin);

        assert!(require_superadmin_for(&admin, false).is_ok());
        assert!(matches!(
            require_superadmin_for(&admin, true),
            Err(UserAdminError::Forbidden(_))
        ));
        assert!(require_superadmin_for(&root, true).is_ok());
    }

    #[test]
    fn test_non_admin_rejected() {
        let clerk = Actor::new(Some(UserId::new(2)), "luis", Role::Warehouse);
        assert!(require_admin(&clerk).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(Some("  ".to_string())).unwrap(), None);
        assert_eq!(
            validate_email(Some(" a@b.mx ".to_string())).unwrap(),
            Some("a@b.mx".to_string())
        );
        assert!(validate_email(Some("nobody".to_string())).is_err());
    }
}
