//! Domain service for requisition status changes.
//!
//! Validates a requested status against the role table, persists it in one
//! transaction, then audits and queues notifications.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Actor, RequisitionId, RequisitionStatus, Role};

/// Errors specific to status transitions.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Requisition {0} not found")]
    NotFound(RequisitionId),

    #[error("Role {role} cannot move a requisition from {from} to {to}")]
    NotAllowed {
        role: Role,
        from: RequisitionStatus,
        to: RequisitionStatus,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<sea_orm::DbErr> for TransitionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<anyhow::Error> for TransitionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionWarning {
    /// A rejection or cancellation was stored without an explanation.
    MissingComment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// Same status and no new comment; nothing was written.
    Unchanged,
    Applied {
        from: RequisitionStatus,
        to: RequisitionStatus,
        warning: Option<TransitionWarning>,
    },
}

#[async_trait::async_trait]
pub trait TransitionService: Send + Sync {
    /// Moves a requisition to `new_status` on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// - [`TransitionError::NotFound`] if the requisition does not exist
    /// - [`TransitionError::NotAllowed`] if the role may not set `new_status`
    ///   from the current status; the stored status is left as it was
    /// - [`TransitionError::Persistence`] if the update could not be committed
    async fn transition(
        &self,
        actor: &Actor,
        id: RequisitionId,
        new_status: RequisitionStatus,
        comment: Option<String>,
    ) -> Result<TransitionOutcome, TransitionError>;
}
