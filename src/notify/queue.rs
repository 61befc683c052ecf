use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Notification, NotificationSink, Notifier, NotifyError};

/// Unbounded channel drained by one worker task.
///
/// Each notification gets exactly one delivery attempt.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationQueue {
    /// Spawns the worker. It exits once every queue handle has been dropped.
    #[must_use]
    pub fn start(notifier: Arc<dyn Notifier>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();

        let worker = tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                deliver(notifier.as_ref(), &notification).await;
            }
            debug!("Notification worker stopped");
        });

        (Self { tx }, worker)
    }
}

async fn deliver(notifier: &dyn Notifier, notification: &Notification) {
    if notification.recipients.is_empty() {
        return;
    }

    match notifier
        .send(
            &notification.recipients,
            &notification.subject,
            &notification.body_html,
        )
        .await
    {
        Ok(()) => {
            metrics::counter!("rqflow_notifications_total", "outcome" => "sent").increment(1);
            debug!(
                event = "notification_sent",
                recipients = notification.recipients.len(),
                subject = %notification.subject,
            );
        }
        Err(e) => {
            metrics::counter!("rqflow_notifications_total", "outcome" => "failed").increment(1);
            warn!(
                event = "notification_failed",
                recipients = ?notification.recipients,
                subject = %notification.subject,
                error = %e,
                "Notification dropped after failed delivery"
            );
        }
    }
}

impl NotificationSink for NotificationQueue {
    fn enqueue(&self, notification: Notification) -> Result<(), NotifyError> {
        self.tx
            .send(notification)
            .map_err(|_| NotifyError::QueueClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FlakyNotifier {
        attempts: AtomicUsize,
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send(
            &self,
            _recipients: &[String],
            subject: &str,
            _body_html: &str,
        ) -> anyhow::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if subject == "fail" {
                anyhow::bail!("smtp unavailable");
            }
            self.delivered.lock().unwrap().push(subject.to_string());
            Ok(())
        }
    }

    fn notification(subject: &str) -> Notification {
        Notification {
            recipients: vec!["a@example.com".to_string()],
            subject: subject.to_string(),
            body_html: "<p>x</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_retried() {
        let notifier = Arc::new(FlakyNotifier::default());
        let (queue, worker) = NotificationQueue::start(notifier.clone());

        queue.enqueue(notification("fail")).unwrap();
        queue.enqueue(notification("ok")).unwrap();
        drop(queue);
        worker.await.unwrap();

        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(*notifier.delivered.lock().unwrap(), vec!["ok".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_recipients_skipped() {
        let notifier = Arc::new(FlakyNotifier::default());
        let (queue, worker) = NotificationQueue::start(notifier.clone());

        let mut empty = notification("ok");
        empty.recipients.clear();
        queue.enqueue(empty).unwrap();
        drop(queue);
        worker.await.unwrap();

        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 0);
    }
}
