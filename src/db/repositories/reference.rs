use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use crate::entities::{departments, prelude::*, roles};

/// Roles and departments.
pub struct ReferenceRepository {
    conn: DatabaseConnection,
}

impl ReferenceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_roles(&self) -> Result<Vec<roles::Model>> {
        Roles::find()
            .order_by_asc(roles::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list roles")
    }

    pub async fn list_departments(&self) -> Result<Vec<departments::Model>> {
        Departments::find()
            .order_by_asc(departments::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list departments")
    }

    pub async fn get_department(&self, id: i32) -> Result<Option<departments::Model>> {
        Departments::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query department")
    }

    pub async fn create_department(&self, name: &str) -> Result<departments::Model> {
        departments::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert department")
    }
}
