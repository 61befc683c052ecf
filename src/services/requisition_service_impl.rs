//! `SeaORM` implementation of the `RequisitionService` trait.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::config::WorkflowConfig;
use crate::db::Store;
use crate::domain::{Actor, RequisitionId, allowed_transitions, requisition_access, title_case};
use crate::models::requisition::{
    NewRequisition, Requisition, RequisitionEdit, RequisitionFilter, RequisitionLine,
};
use crate::notify::WorkflowNotifications;
use crate::services::audit::AuditSink;
use crate::services::requisition_service::{
    CreateRequisition, LineInput, ListQuery, RequisitionDetail, RequisitionError,
    RequisitionService, UpdateRequisition,
};

pub struct SeaOrmRequisitionService {
    store: Store,
    workflow: WorkflowConfig,
    audit: Arc<dyn AuditSink>,
    notifications: WorkflowNotifications,
}

impl SeaOrmRequisitionService {
    #[must_use]
    pub fn new(
        store: Store,
        workflow: WorkflowConfig,
        audit: Arc<dyn AuditSink>,
        notifications: WorkflowNotifications,
    ) -> Self {
        Self {
            store,
            workflow,
            audit,
            notifications,
        }
    }

    fn detail(
        &self,
        requisition: Requisition,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> RequisitionDetail {
        let access = requisition_access(
            requisition.creator_id,
            requisition.status,
            requisition.created_at,
            actor,
            now,
            self.workflow.edit_window(),
        );
        let allowed_statuses = allowed_transitions(actor.role, requisition.status)
            .into_iter()
            .collect();

        RequisitionDetail {
            requisition,
            access,
            allowed_statuses,
        }
    }

    async fn load(&self, id: RequisitionId) -> Result<Requisition, RequisitionError> {
        self.store
            .requisition_repo()
            .get(id)
            .await?
            .ok_or(RequisitionError::NotFound(id))
    }
}

fn can_view(actor: &Actor, requisition: &Requisition) -> bool {
    actor.role.sees_all_requisitions()
        || requisition
            .creator_id
            .is_some_and(|creator| actor.is_user(creator))
}

fn clean_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Trims, title-cases products and parses quantities.
pub fn validate_lines(lines: Vec<LineInput>) -> Result<Vec<RequisitionLine>, RequisitionError> {
    if lines.is_empty() {
        return Err(RequisitionError::Validation(
            "A requisition needs at least one line".to_string(),
        ));
    }

    lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| {
            let position = index + 1;

            let product = title_case(&line.product);
            if product.is_empty() {
                return Err(RequisitionError::Validation(format!(
                    "Line {position}: product is required"
                )));
            }

            let unit = line.unit.trim().to_string();
            if unit.is_empty() {
                return Err(RequisitionError::Validation(format!(
                    "Line {position}: unit is required"
                )));
            }

            let quantity = Decimal::from_str(line.quantity.trim()).map_err(|_| {
                RequisitionError::Validation(format!(
                    "Line {position}: quantity {:?} is not a number",
                    line.quantity
                ))
            })?;
            if quantity <= Decimal::ZERO {
                return Err(RequisitionError::Validation(format!(
                    "Line {position}: quantity must be greater than zero"
                )));
            }

            Ok(RequisitionLine {
                product,
                quantity,
                unit,
            })
        })
        .collect()
}

#[async_trait]
impl RequisitionService for SeaOrmRequisitionService {
    async fn create(
        &self,
        actor: &Actor,
        input: CreateRequisition,
    ) -> Result<RequisitionDetail, RequisitionError> {
        let lines = validate_lines(input.lines)?;

        let requester = match actor.user_id {
            Some(id) => self.store.user_repo().get_by_id(id).await?,
            None => None,
        };

        let department = clean_text(input.department)
            .or_else(|| requester.as_ref().and_then(|u| u.department.clone()))
            .ok_or_else(|| RequisitionError::Validation("Department is required".to_string()))?;

        let now = Utc::now().naive_utc();
        let requisition = self
            .store
            .requisition_repo()
            .create(NewRequisition {
                created_at: now,
                requester_name: actor.username.clone(),
                requester_id: actor.user_id,
                requester_email: requester.and_then(|u| u.email),
                department,
                priority: input.priority,
                observations: clean_text(input.observations),
                creator_id: actor.user_id,
                lines,
            })
            .await?;

        metrics::counter!("rqflow_requisitions_created_total").increment(1);
        info!(
            event = "requisition_created",
            requisition = %requisition.number,
            actor = %actor.username,
            lines = requisition.lines.len(),
        );

        self.audit
            .record(
                actor.user_id,
                "requisitions",
                Some(&requisition.number),
                "create",
            )
            .await;
        self.notifications.status_reached(&requisition, None).await;

        Ok(self.detail(requisition, actor, now))
    }

    async fn get(
        &self,
        actor: &Actor,
        id: RequisitionId,
    ) -> Result<RequisitionDetail, RequisitionError> {
        let requisition = self.load(id).await?;

        if !can_view(actor, &requisition) {
            return Err(RequisitionError::Forbidden(
                "Requisition belongs to another user".to_string(),
            ));
        }

        Ok(self.detail(requisition, actor, Utc::now().naive_utc()))
    }

    async fn list(
        &self,
        actor: &Actor,
        query: ListQuery,
    ) -> Result<Vec<Requisition>, RequisitionError> {
        let creator_id = if actor.role.sees_all_requisitions() {
            None
        } else {
            match actor.user_id {
                Some(id) => Some(id),
                None => return Ok(Vec::new()),
            }
        };

        let filter = RequisitionFilter {
            creator_id,
            status: query.status,
            department: clean_text(query.department),
        };

        Ok(self.store.requisition_repo().list(&filter).await?)
    }

    async fn update(
        &self,
        actor: &Actor,
        id: RequisitionId,
        input: UpdateRequisition,
    ) -> Result<RequisitionDetail, RequisitionError> {
        let existing = self.load(id).await?;
        let now = Utc::now().naive_utc();

        if !self.detail(existing, actor, now).access.can_edit {
            return Err(RequisitionError::Forbidden(
                "Requisition can no longer be edited".to_string(),
            ));
        }

        let department = clean_text(Some(input.department))
            .ok_or_else(|| RequisitionError::Validation("Department is required".to_string()))?;
        let lines = validate_lines(input.lines)?;

        let updated = self
            .store
            .requisition_repo()
            .update(
                id,
                RequisitionEdit {
                    department,
                    priority: input.priority,
                    observations: clean_text(input.observations),
                    lines,
                },
                now,
            )
            .await?
            .ok_or(RequisitionError::NotFound(id))?;

        self.audit
            .record(actor.user_id, "requisitions", Some(&updated.number), "update")
            .await;

        Ok(self.detail(updated, actor, now))
    }

    async fn delete(&self, actor: &Actor, id: RequisitionId) -> Result<(), RequisitionError> {
        let existing = self.load(id).await?;
        let number = existing.number.clone();

        if !self
            .detail(existing, actor, Utc::now().naive_utc())
            .access
            .can_delete
        {
            return Err(RequisitionError::Forbidden(
                "Requisition can no longer be deleted".to_string(),
            ));
        }

        if !self.store.requisition_repo().delete(id).await? {
            return Err(RequisitionError::NotFound(id));
        }

        info!(
            event = "requisition_deleted",
            requisition = %number,
            actor = %actor.username,
        );
        self.audit
            .record(actor.user_id, "requisitions", Some(&number), "delete")
            .await;

        Ok(())
    }

    async fn product_suggestions(
        &self,
        prefix: &str,
        limit: u64,
    ) -> Result<Vec<String>, RequisitionError> {
        let prefix = title_case(prefix);
        Ok(self.store.product_suggestions(&prefix, limit).await?)
    }
}
