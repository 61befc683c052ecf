use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::OnConflict,
};

use crate::entities::{prelude::*, products};

pub struct CatalogRepository {
    conn: DatabaseConnection,
}

impl CatalogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Product names starting with `prefix`, alphabetically.
    pub async fn suggestions(&self, prefix: &str, limit: u64) -> Result<Vec<String>> {
        let mut query = Products::find().order_by_asc(products::Column::Name);

        let prefix = prefix.trim();
        if !prefix.is_empty() {
            query = query.filter(products::Column::Name.starts_with(prefix));
        }

        let rows = query
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query product suggestions")?;

        Ok(rows.into_iter().map(|p| p.name).collect())
    }
}

/// Inserts names not yet in the catalog. Runs on the caller's connection so it
/// joins an open transaction.
pub async fn remember_products<C>(conn: &C, names: &[String]) -> Result<()>
where
    C: ConnectionTrait,
{
    for name in names {
        if name.is_empty() {
            continue;
        }

        let model = products::ActiveModel {
            name: Set(name.clone()),
            ..Default::default()
        };

        Products::insert(model)
            .on_conflict(
                OnConflict::column(products::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .context("Failed to upsert product")?;
    }

    Ok(())
}
