use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::archive::ArchivalJob;
use crate::config::SchedulerConfig;

pub struct Scheduler {
    job: ArchivalJob,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

async fn run_archive(job: &ArchivalJob) {
    let start = std::time::Instant::now();
    info!(
        event = "job_started",
        job_name = "archive_requisitions",
        "Starting scheduled archival"
    );

    match job.run_exclusive().await {
        Some(Ok(report)) => info!(
            event = "job_finished",
            job_name = "archive_requisitions",
            examined = report.examined,
            archived = report.archived,
            deleted = report.deleted,
            skipped = report.skipped,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled archival finished"
        ),
        Some(Err(e)) => error!(
            event = "job_failed",
            job_name = "archive_requisitions",
            error = %format!("{e:#}"),
            "Scheduled archival failed"
        ),
        None => {}
    }
}

impl Scheduler {
    #[must_use]
    pub fn new(job: ArchivalJob, config: SchedulerConfig) -> Self {
        Self {
            job,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Runs until [`Scheduler::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        match self.config.archive_cron.as_deref().filter(|c| !c.is_empty()) {
            Some(cron_expr) => self.run_with_cron(cron_expr).await,
            None => self.run_with_interval().await,
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let running = Arc::clone(&self.running);
        let archival = self.job.clone();
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let running = Arc::clone(&running);
            let archival = archival.clone();
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                run_archive(&archival).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Archival scheduled with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let hours = self.config.archive_interval_hours.max(1);
        info!("Archival scheduled every {}h", hours);

        let mut ticker = interval(Duration::from_secs(u64::from(hours) * 60 * 60));
        // The first tick completes immediately; archival waits a full period.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !*self.running.read().await {
                break;
            }
            run_archive(&self.job).await;
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
