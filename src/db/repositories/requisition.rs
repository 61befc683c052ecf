use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;
use std::str::FromStr;

use super::catalog::remember_products;
use crate::domain::{RequisitionId, RequisitionStatus, UserId};
use crate::entities::{prelude::*, requisition_lines, requisitions};
use crate::models::requisition::{
    NewRequisition, Requisition, RequisitionEdit, RequisitionFilter, RequisitionLine,
    requisition_number,
};

/// Attempts at finding a free number when two requisitions share a millisecond.
const NUMBER_ATTEMPTS: i64 = 50;

fn to_line(model: requisition_lines::Model) -> Result<RequisitionLine> {
    let quantity = Decimal::from_str(&model.quantity)
        .with_context(|| format!("Invalid stored quantity {:?}", model.quantity))?;

    Ok(RequisitionLine {
        product: model.product,
        quantity,
        unit: model.unit,
    })
}

fn to_requisition(
    model: requisitions::Model,
    lines: Vec<requisition_lines::Model>,
) -> Result<Requisition> {
    let lines = lines.into_iter().map(to_line).collect::<Result<Vec<_>>>()?;

    Ok(Requisition {
        id: RequisitionId::new(model.id),
        status: model.status.parse()?,
        priority: model.priority.parse()?,
        number: model.number,
        created_at: model.created_at,
        updated_at: model.updated_at,
        requester_name: model.requester_name,
        requester_id: model.requester_id.map(UserId::new),
        requester_email: model.requester_email,
        department: model.department,
        observations: model.observations,
        creator_id: model.creator_id.map(UserId::new),
        status_comment: model.status_comment,
        archived_document_url: model.archived_document_url,
        lines,
    })
}

async fn insert_lines<C>(conn: &C, requisition_id: i32, lines: &[RequisitionLine]) -> Result<()>
where
    C: ConnectionTrait,
{
    if lines.is_empty() {
        return Ok(());
    }

    let models = lines
        .iter()
        .enumerate()
        .map(|(position, line)| requisition_lines::ActiveModel {
            requisition_id: Set(requisition_id),
            position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
            product: Set(line.product.clone()),
            quantity: Set(line.quantity.normalize().to_string()),
            unit: Set(line.unit.clone()),
            ..Default::default()
        });

    RequisitionLines::insert_many(models)
        .exec(conn)
        .await
        .context("Failed to insert requisition lines")?;

    let names: Vec<String> = lines.iter().map(|l| l.product.clone()).collect();
    remember_products(conn, &names).await
}

pub struct RequisitionRepository {
    conn: DatabaseConnection,
}

impl RequisitionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn lines_for(&self, id: i32) -> Result<Vec<requisition_lines::Model>> {
        RequisitionLines::find()
            .filter(requisition_lines::Column::RequisitionId.eq(id))
            .order_by_asc(requisition_lines::Column::Position)
            .all(&self.conn)
            .await
            .context("Failed to query requisition lines")
    }

    /// Loads lines for many requisitions with a single query.
    async fn attach_lines(&self, rows: Vec<requisitions::Model>) -> Result<Vec<Requisition>> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

        let mut by_requisition: HashMap<i32, Vec<requisition_lines::Model>> = HashMap::new();
        if !ids.is_empty() {
            let lines = RequisitionLines::find()
                .filter(requisition_lines::Column::RequisitionId.is_in(ids))
                .order_by_asc(requisition_lines::Column::Position)
                .all(&self.conn)
                .await
                .context("Failed to query requisition lines")?;

            for line in lines {
                by_requisition
                    .entry(line.requisition_id)
                    .or_default()
                    .push(line);
            }
        }

        rows.into_iter()
            .map(|row| {
                let lines = by_requisition.remove(&row.id).unwrap_or_default();
                to_requisition(row, lines)
            })
            .collect()
    }

    pub async fn get(&self, id: RequisitionId) -> Result<Option<Requisition>> {
        let row = Requisitions::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query requisition")?;

        match row {
            Some(row) => {
                let lines = self.lines_for(row.id).await?;
                Ok(Some(to_requisition(row, lines)?))
            }
            None => Ok(None),
        }
    }

    /// Newest first.
    pub async fn list(&self, filter: &RequisitionFilter) -> Result<Vec<Requisition>> {
        let mut query = Requisitions::find()
            .order_by_desc(requisitions::Column::CreatedAt)
            .order_by_desc(requisitions::Column::Id);

        if let Some(creator_id) = filter.creator_id {
            query = query.filter(requisitions::Column::CreatorId.eq(creator_id.value()));
        }
        if let Some(status) = filter.status {
            query = query.filter(requisitions::Column::Status.eq(status.as_str()));
        }
        if let Some(department) = &filter.department {
            query = query.filter(requisitions::Column::Department.eq(department.as_str()));
        }

        let rows = query
            .all(&self.conn)
            .await
            .context("Failed to list requisitions")?;

        self.attach_lines(rows).await
    }

    /// Inserts the requisition, its lines and any new product names in one
    /// transaction. The number is unique even for same-millisecond inserts.
    pub async fn create(&self, new: NewRequisition) -> Result<Requisition> {
        let txn = self.conn.begin().await?;

        let mut number = None;
        for offset in 0..NUMBER_ATTEMPTS {
            let candidate = requisition_number(new.created_at + Duration::milliseconds(offset));
            let taken = Requisitions::find()
                .filter(requisitions::Column::Number.eq(candidate.as_str()))
                .count(&txn)
                .await
                .context("Failed to check requisition number")?;
            if taken == 0 {
                number = Some(candidate);
                break;
            }
        }
        let number = number.context("No free requisition number for this instant")?;

        let row = requisitions::ActiveModel {
            number: Set(number),
            created_at: Set(new.created_at),
            updated_at: Set(new.created_at),
            requester_name: Set(new.requester_name),
            requester_id: Set(new.requester_id.map(i32::from)),
            requester_email: Set(new.requester_email),
            department: Set(new.department),
            priority: Set(new.priority.as_str().to_string()),
            status: Set(RequisitionStatus::INITIAL.as_str().to_string()),
            observations: Set(new.observations),
            creator_id: Set(new.creator_id.map(i32::from)),
            status_comment: Set(None),
            archived_document_url: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert requisition")?;

        insert_lines(&txn, row.id, &new.lines).await?;

        txn.commit().await?;

        let lines = self.lines_for(row.id).await?;
        to_requisition(row, lines)
    }

    /// Replaces the editable fields and all lines. Returns `None` when the row is gone.
    pub async fn update(
        &self,
        id: RequisitionId,
        edit: RequisitionEdit,
        now: NaiveDateTime,
    ) -> Result<Option<Requisition>> {
        let txn = self.conn.begin().await?;

        let Some(row) = Requisitions::find_by_id(id.value())
            .one(&txn)
            .await
            .context("Failed to query requisition for update")?
        else {
            return Ok(None);
        };

        let mut active: requisitions::ActiveModel = row.into();
        active.department = Set(edit.department);
        active.priority = Set(edit.priority.as_str().to_string());
        active.observations = Set(edit.observations);
        active.updated_at = Set(now);
        active
            .update(&txn)
            .await
            .context("Failed to update requisition")?;

        RequisitionLines::delete_many()
            .filter(requisition_lines::Column::RequisitionId.eq(id.value()))
            .exec(&txn)
            .await
            .context("Failed to clear requisition lines")?;

        insert_lines(&txn, id.value(), &edit.lines).await?;

        txn.commit().await?;

        self.get(id).await
    }

    /// Sets the status and, when given, overwrites the status comment.
    pub async fn update_status(
        &self,
        id: RequisitionId,
        status: RequisitionStatus,
        comment: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<()> {
        let txn = self.conn.begin().await?;

        let row = Requisitions::find_by_id(id.value())
            .one(&txn)
            .await
            .context("Failed to query requisition for status update")?
            .with_context(|| format!("Requisition {id} disappeared during status update"))?;

        let mut active: requisitions::ActiveModel = row.into();
        active.status = Set(status.as_str().to_string());
        if let Some(comment) = comment {
            active.status_comment = Set(Some(comment.to_string()));
        }
        active.updated_at = Set(now);
        active
            .update(&txn)
            .await
            .context("Failed to update requisition status")?;

        txn.commit().await?;
        Ok(())
    }

    pub async fn set_archived_url(&self, id: RequisitionId, url: &str) -> Result<()> {
        Requisitions::update_many()
            .col_expr(
                requisitions::Column::ArchivedDocumentUrl,
                sea_orm::sea_query::Expr::value(url),
            )
            .filter(requisitions::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await
            .context("Failed to record archived document URL")?;
        Ok(())
    }

    /// Deletes lines and the requisition row together.
    pub async fn delete(&self, id: RequisitionId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        RequisitionLines::delete_many()
            .filter(requisition_lines::Column::RequisitionId.eq(id.value()))
            .exec(&txn)
            .await
            .context("Failed to delete requisition lines")?;

        let result = Requisitions::delete_by_id(id.value())
            .exec(&txn)
            .await
            .context("Failed to delete requisition")?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    /// Requisitions in one of `statuses` created strictly before `cutoff`, oldest first.
    pub async fn find_archivable(
        &self,
        statuses: &[RequisitionStatus],
        cutoff: NaiveDateTime,
    ) -> Result<Vec<Requisition>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

        let rows = Requisitions::find()
            .filter(requisitions::Column::Status.is_in(keys))
            .filter(requisitions::Column::CreatedAt.lt(cutoff))
            .order_by_asc(requisitions::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to select archivable requisitions")?;

        self.attach_lines(rows).await
    }

    pub async fn count(&self) -> Result<u64> {
        Requisitions::find()
            .count(&self.conn)
            .await
            .context("Failed to count requisitions")
    }
}
