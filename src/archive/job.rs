use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{ArchiveUploader, DocumentRenderer, RequisitionDocument};
use crate::config::Config;
use crate::db::Store;
use crate::domain::RequisitionStatus;
use crate::models::requisition::Requisition;
use crate::services::audit::AuditSink;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    /// Candidates returned by the selection.
    pub examined: usize,
    /// Documents uploaded during this run.
    pub archived: usize,
    pub deleted: usize,
    /// Candidates left in place because a step failed.
    pub skipped: usize,
}

/// Removes finished requisitions once they are older than the retention
/// period, keeping an uploaded copy of each.
///
/// The uploaded URL is stored on the row before it is deleted, so a run
/// interrupted between the two steps is completed by the next one without a
/// second upload.
#[derive(Clone)]
pub struct ArchivalJob {
    store: Store,
    renderer: Arc<dyn DocumentRenderer>,
    uploader: Arc<dyn ArchiveUploader>,
    audit: Arc<dyn AuditSink>,
    staging_dir: PathBuf,
    retention: Duration,
    terminal_statuses: Vec<RequisitionStatus>,
    running: Arc<Mutex<()>>,
}

impl ArchivalJob {
    #[must_use]
    pub fn new(
        store: Store,
        config: &Config,
        renderer: Arc<dyn DocumentRenderer>,
        uploader: Arc<dyn ArchiveUploader>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            renderer,
            uploader,
            audit,
            staging_dir: PathBuf::from(&config.archive.staging_path),
            retention: config.workflow.retention(),
            terminal_statuses: config.workflow.terminal_statuses.clone(),
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Runs unless another run of this job is in progress, in which case
    /// `None` is returned immediately.
    pub async fn run_exclusive(&self) -> Option<Result<ArchiveReport>> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!(
                event = "job_skipped",
                job_name = "archive_requisitions",
                "Archival already running"
            );
            return None;
        };

        Some(self.run_at(Utc::now().naive_utc()).await)
    }

    pub async fn run(&self) -> Result<ArchiveReport> {
        self.run_at(Utc::now().naive_utc()).await
    }

    /// # Errors
    ///
    /// Only when the candidate selection fails; per-requisition failures are
    /// logged and counted as skipped.
    pub async fn run_at(&self, now: NaiveDateTime) -> Result<ArchiveReport> {
        let cutoff = now - self.retention;
        let repo = self.store.requisition_repo();

        let candidates = repo
            .find_archivable(&self.terminal_statuses, cutoff)
            .await
            .context("Failed to select requisitions for archival")?;

        let mut report = ArchiveReport {
            examined: candidates.len(),
            ..ArchiveReport::default()
        };

        for requisition in candidates {
            let url = match requisition
                .archived_document_url
                .clone()
                .filter(|u| !u.trim().is_empty())
            {
                Some(url) => url,
                None => match self.archive_document(&requisition, now).await {
                    Ok(Some(url)) => {
                        report.archived += 1;
                        url
                    }
                    Ok(None) => {
                        report.skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(
                            event = "archive_failed",
                            requisition = %requisition.number,
                            error = %format!("{e:#}"),
                            "Requisition kept, archiving failed"
                        );
                        report.skipped += 1;
                        continue;
                    }
                },
            };

            match repo.delete(requisition.id).await {
                Ok(false) => {}
                Ok(true) => {
                    report.deleted += 1;
                    info!(
                        event = "requisition_archived",
                        requisition = %requisition.number,
                        url = %url,
                    );
                    self.audit
                        .record(
                            None,
                            "archive",
                            Some(&requisition.number),
                            &format!("archived to {url} and deleted"),
                        )
                        .await;
                }
                Err(e) => {
                    warn!(
                        event = "archive_delete_failed",
                        requisition = %requisition.number,
                        error = %format!("{e:#}"),
                        "Archived requisition could not be deleted"
                    );
                    report.skipped += 1;
                }
            }
        }

        metrics::counter!("rqflow_archived_total")
            .increment(u64::try_from(report.archived).unwrap_or(u64::MAX));
        metrics::counter!("rqflow_archive_deleted_total")
            .increment(u64::try_from(report.deleted).unwrap_or(u64::MAX));

        Ok(report)
    }

    /// Renders, stages and uploads one document, then records the URL.
    /// `Ok(None)` means the uploader declined.
    async fn archive_document(
        &self,
        requisition: &Requisition,
        now: NaiveDateTime,
    ) -> Result<Option<String>> {
        let document = RequisitionDocument {
            requisition: requisition.clone(),
            generated_at: now,
        };
        let bytes = self.renderer.render(&document)?;
        let filename = document.file_name(self.renderer.extension());

        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.staging_dir.display()))?;
        let path = self.staging_dir.join(&filename);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let Some(url) = self.uploader.upload(&filename, &path).await else {
            return Ok(None);
        };

        self.store
            .requisition_repo()
            .set_archived_url(requisition.id, &url)
            .await?;

        remove_staged(&path).await;
        Ok(Some(url))
    }
}

async fn remove_staged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove staged document");
    }
}
