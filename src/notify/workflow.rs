use std::sync::Arc;
use tracing::warn;

use super::{Notification, NotificationSink, templates};
use crate::db::Store;
use crate::domain::{RequisitionStatus, Role};
use crate::models::requisition::Requisition;

/// Role whose members are told that a requisition reached `status`.
#[must_use]
pub const fn notified_role(status: RequisitionStatus) -> Option<Role> {
    match status {
        RequisitionStatus::PendingWarehouseReview => Some(Role::Warehouse),
        RequisitionStatus::WarehouseApproved | RequisitionStatus::PendingQuote => {
            Some(Role::Purchasing)
        }
        _ => None,
    }
}

/// Turns workflow events into queued mail.
#[derive(Clone)]
pub struct WorkflowNotifications {
    store: Store,
    sink: Arc<dyn NotificationSink>,
    app_url: String,
}

impl WorkflowNotifications {
    #[must_use]
    pub fn new(store: Store, sink: Arc<dyn NotificationSink>, app_url: impl Into<String>) -> Self {
        Self {
            store,
            sink,
            app_url: app_url.into(),
        }
    }

    /// Queues one message for the requester and, when the new status calls
    /// for it, one message for the responsible role. Lookup and enqueue
    /// failures are logged only.
    pub async fn status_reached(
        &self,
        requisition: &Requisition,
        previous: Option<RequisitionStatus>,
    ) {
        let subject = templates::subject(requisition);
        let body = templates::body(requisition, previous, &self.app_url);

        let requester = requisition
            .requester_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());

        if let Some(email) = requester {
            self.enqueue(requisition, vec![email.to_string()], &subject, &body);
        }

        let Some(role) = notified_role(requisition.status) else {
            return;
        };

        match self.store.user_repo().emails_for_role(role).await {
            Ok(emails) => {
                let recipients: Vec<String> = emails
                    .into_iter()
                    .filter(|e| Some(e.as_str()) != requester)
                    .collect();
                if !recipients.is_empty() {
                    self.enqueue(requisition, recipients, &subject, &body);
                }
            }
            Err(e) => {
                warn!(
                    event = "notification_recipients_failed",
                    requisition = %requisition.number,
                    role = %role,
                    error = %e,
                    "Could not resolve notification recipients"
                );
            }
        }
    }

    fn enqueue(
        &self,
        requisition: &Requisition,
        recipients: Vec<String>,
        subject: &str,
        body: &str,
    ) {
        let notification = Notification {
            recipients,
            subject: subject.to_string(),
            body_html: body.to_string(),
        };

        if let Err(e) = self.sink.enqueue(notification) {
            warn!(
                event = "notification_enqueue_failed",
                requisition = %requisition.number,
                error = %e,
                "Could not queue notification"
            );
        }
    }
}
