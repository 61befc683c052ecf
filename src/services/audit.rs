//! Append-only audit trail.

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::db::Store;
use crate::domain::UserId;

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Best-effort: failures are logged and never reach the caller.
    async fn record(
        &self,
        actor_id: Option<UserId>,
        module: &str,
        object: Option<&str>,
        action: &str,
    );
}

pub struct StoreAuditSink {
    store: Store,
}

impl StoreAuditSink {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuditSink for StoreAuditSink {
    async fn record(
        &self,
        actor_id: Option<UserId>,
        module: &str,
        object: Option<&str>,
        action: &str,
    ) {
        let now = Utc::now().naive_utc();

        if let Err(e) = self
            .store
            .audit_repo()
            .add(actor_id.map(i32::from), module, object, action, now)
            .await
        {
            warn!(
                event = "audit_write_failed",
                module,
                object,
                action,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }
}
