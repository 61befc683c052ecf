use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Priority, RequisitionId, RequisitionStatus, UserId};

/// One requested item. `product` is stored title-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionLine {
    pub product: String,
    pub quantity: Decimal,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Requisition {
    pub id: RequisitionId,
    pub number: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub requester_name: String,
    pub requester_id: Option<UserId>,
    pub requester_email: Option<String>,
    pub department: String,
    pub priority: Priority,
    pub status: RequisitionStatus,
    pub observations: Option<String>,
    pub creator_id: Option<UserId>,
    pub status_comment: Option<String>,
    pub archived_document_url: Option<String>,
    pub lines: Vec<RequisitionLine>,
}

/// Row data for a requisition about to be inserted. The number is derived
/// from `created_at` at insert time.
#[derive(Debug, Clone)]
pub struct NewRequisition {
    pub created_at: NaiveDateTime,
    pub requester_name: String,
    pub requester_id: Option<UserId>,
    pub requester_email: Option<String>,
    pub department: String,
    pub priority: Priority,
    pub observations: Option<String>,
    pub creator_id: Option<UserId>,
    pub lines: Vec<RequisitionLine>,
}

/// Editable fields of an existing requisition. Lines are replaced wholesale.
#[derive(Debug, Clone)]
pub struct RequisitionEdit {
    pub department: String,
    pub priority: Priority,
    pub observations: Option<String>,
    pub lines: Vec<RequisitionLine>,
}

#[derive(Debug, Clone, Default)]
pub struct RequisitionFilter {
    /// Restricts results to requisitions created by this user.
    pub creator_id: Option<UserId>,
    pub status: Option<RequisitionStatus>,
    pub department: Option<String>,
}

/// Requisition number for a creation instant: `RQ-` plus the UTC timestamp
/// down to milliseconds.
#[must_use]
pub fn requisition_number(created_at: NaiveDateTime) -> String {
    format!("RQ-{}", created_at.format("%Y%m%d%H%M%S%3f"))
}
