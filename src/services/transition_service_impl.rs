//! `SeaORM` implementation of the `TransitionService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::Store;
use crate::domain::{Actor, RequisitionId, RequisitionStatus, allowed_transitions};
use crate::notify::WorkflowNotifications;
use crate::services::audit::AuditSink;
use crate::services::transition_service::{
    TransitionError, TransitionOutcome, TransitionService, TransitionWarning,
};

pub struct SeaOrmTransitionService {
    store: Store,
    audit: Arc<dyn AuditSink>,
    notifications: WorkflowNotifications,
}

impl SeaOrmTransitionService {
    #[must_use]
    pub fn new(
        store: Store,
        audit: Arc<dyn AuditSink>,
        notifications: WorkflowNotifications,
    ) -> Self {
        Self {
            store,
            audit,
            notifications,
        }
    }
}

fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

#[async_trait]
impl TransitionService for SeaOrmTransitionService {
    async fn transition(
        &self,
        actor: &Actor,
        id: RequisitionId,
        new_status: RequisitionStatus,
        comment: Option<String>,
    ) -> Result<TransitionOutcome, TransitionError> {
        let repo = self.store.requisition_repo();

        let requisition = repo
            .get(id)
            .await?
            .ok_or(TransitionError::NotFound(id))?;

        let current = requisition.status;
        if !allowed_transitions(actor.role, current).contains(&new_status) {
            metrics::counter!("rqflow_transitions_total", "outcome" => "rejected").increment(1);
            return Err(TransitionError::NotAllowed {
                role: actor.role,
                from: current,
                to: new_status,
            });
        }

        let comment = normalize_comment(comment);
        let comment_changed = comment
            .as_deref()
            .is_some_and(|c| requisition.status_comment.as_deref() != Some(c));

        if new_status == current && !comment_changed {
            return Ok(TransitionOutcome::Unchanged);
        }

        let now = Utc::now().naive_utc();
        if let Err(e) = repo
            .update_status(id, new_status, comment.as_deref(), now)
            .await
        {
            error!(
                event = "transition_failed",
                requisition = %requisition.number,
                from = %current,
                to = %new_status,
                actor = %actor.username,
                error = ?e,
                "Failed to persist status change"
            );
            metrics::counter!("rqflow_transitions_total", "outcome" => "failed").increment(1);
            return Err(e.into());
        }

        metrics::counter!("rqflow_transitions_total", "outcome" => "applied").increment(1);
        info!(
            event = "status_changed",
            requisition = %requisition.number,
            from = %current,
            to = %new_status,
            actor = %actor.username,
        );

        self.audit
            .record(
                actor.user_id,
                "requisitions",
                Some(&requisition.number),
                &format!("status {current} -> {new_status}"),
            )
            .await;

        let mut updated = requisition;
        updated.status = new_status;
        if comment.is_some() {
            updated.status_comment.clone_from(&comment);
        }
        updated.updated_at = now;
        self.notifications.status_reached(&updated, Some(current)).await;

        let warning = (new_status.expects_comment() && comment.is_none())
            .then_some(TransitionWarning::MissingComment);

        Ok(TransitionOutcome::Applied {
            from: current,
            to: new_status,
            warning,
        })
    }
}
