//! Domain service for creating, reading, editing and deleting requisitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Actor, Priority, RequisitionAccess, RequisitionId, RequisitionStatus};
use crate::models::requisition::Requisition;

/// Errors specific to requisition operations.
#[derive(Debug, Error)]
pub enum RequisitionError {
    #[error("Requisition {0} not found")]
    NotFound(RequisitionId),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<sea_orm::DbErr> for RequisitionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<anyhow::Error> for RequisitionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }
}

/// A line as submitted by a client; the quantity is parsed during validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LineInput {
    pub product: String,
    pub quantity: String,
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequisition {
    /// Falls back to the requester's own department.
    pub department: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub observations: Option<String>,
    pub lines: Vec<LineInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequisition {
    pub department: String,
    pub priority: Priority,
    pub observations: Option<String>,
    pub lines: Vec<LineInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<RequisitionStatus>,
    pub department: Option<String>,
}

/// A requisition together with what the viewing actor may do with it.
#[derive(Debug, Clone, Serialize)]
pub struct RequisitionDetail {
    #[serde(flatten)]
    pub requisition: Requisition,
    pub access: RequisitionAccess,
    pub allowed_statuses: Vec<RequisitionStatus>,
}

#[async_trait::async_trait]
pub trait RequisitionService: Send + Sync {
    /// Creates a requisition in the initial status.
    ///
    /// # Errors
    ///
    /// Returns [`RequisitionError::Validation`] when there are no lines, a
    /// quantity is not a positive decimal, or no department can be determined.
    async fn create(
        &self,
        actor: &Actor,
        input: CreateRequisition,
    ) -> Result<RequisitionDetail, RequisitionError>;

    async fn get(
        &self,
        actor: &Actor,
        id: RequisitionId,
    ) -> Result<RequisitionDetail, RequisitionError>;

    /// Requesters only see their own requisitions.
    async fn list(
        &self,
        actor: &Actor,
        query: ListQuery,
    ) -> Result<Vec<Requisition>, RequisitionError>;

    /// # Errors
    ///
    /// Returns [`RequisitionError::Forbidden`] outside the edit window.
    async fn update(
        &self,
        actor: &Actor,
        id: RequisitionId,
        input: UpdateRequisition,
    ) -> Result<RequisitionDetail, RequisitionError>;

    async fn delete(&self, actor: &Actor, id: RequisitionId) -> Result<(), RequisitionError>;

    async fn product_suggestions(
        &self,
        prefix: &str,
        limit: u64,
    ) -> Result<Vec<String>, RequisitionError>;
}
