use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set};

use crate::entities::{audit_log, prelude::*};

pub struct AuditRepository {
    conn: DatabaseConnection,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(
        &self,
        actor_user_id: Option<i32>,
        module: &str,
        object: Option<&str>,
        action: &str,
        now: NaiveDateTime,
    ) -> Result<()> {
        let active_model = audit_log::ActiveModel {
            actor_user_id: Set(actor_user_id),
            module: Set(module.to_string()),
            object: Set(object.map(str::to_string)),
            action: Set(action.to_string()),
            created_at: Set(now),
            ..Default::default()
        };

        AuditLog::insert(active_model)
            .exec(&self.conn)
            .await
            .context("Failed to insert audit entry")?;
        Ok(())
    }

    /// Newest first. `page` starts at 1.
    pub async fn list(&self, page: u64, page_size: u64) -> Result<(Vec<audit_log::Model>, u64)> {
        let paginator = AuditLog::find()
            .order_by_desc(audit_log::Column::CreatedAt)
            .order_by_desc(audit_log::Column::Id)
            .paginate(&self.conn, page_size.max(1));

        let total_pages = paginator.num_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total_pages))
    }

    pub async fn count(&self) -> Result<u64> {
        AuditLog::find()
            .count(&self.conn)
            .await
            .context("Failed to count audit entries")
    }
}
