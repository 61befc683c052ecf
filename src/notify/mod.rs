//! Mail notifications for workflow events.
//!
//! Callers hand a [`Notification`] to a [`NotificationSink`]; the production
//! sink is [`NotificationQueue`], whose single worker task delivers each
//! message once through a [`Notifier`]. Delivery failures are logged and
//! dropped.

pub mod queue;
pub mod smtp;
pub mod templates;
pub mod workflow;

pub use queue::NotificationQueue;
pub use smtp::{LogNotifier, SmtpNotifier};
pub use workflow::WorkflowNotifications;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body_html: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification queue is closed")]
    QueueClosed,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body_html: &str,
    ) -> anyhow::Result<()>;
}

/// Accepts notifications without waiting for delivery.
pub trait NotificationSink: Send + Sync {
    fn enqueue(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// SMTP when mail is enabled, otherwise log-only.
pub fn notifier_from_config(config: &MailConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    if config.enabled {
        Ok(Arc::new(SmtpNotifier::new(config)?))
    } else {
        Ok(Arc::new(LogNotifier))
    }
}
