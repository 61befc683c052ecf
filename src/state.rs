use std::sync::Arc;
use tokio::sync::RwLock;

use crate::archive::{ArchivalJob, ArchiveUploader, HtmlDocumentRenderer, uploader_from_config};
use crate::config::Config;
use crate::db::Store;
use crate::notify::{
    NotificationQueue, NotificationSink, WorkflowNotifications, notifier_from_config,
};
use crate::services::{
    AuditSink, AuthService, RequisitionService, SeaOrmAuthService, SeaOrmRequisitionService,
    SeaOrmTransitionService, SeaOrmUserAdminService, StoreAuditSink, TransitionService,
    UserAdminService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub audit: Arc<dyn AuditSink>,

    pub requisition_service: Arc<dyn RequisitionService>,

    pub transition_service: Arc<dyn TransitionService>,

    pub auth_service: Arc<dyn AuthService>,

    pub user_admin_service: Arc<dyn UserAdminService>,

    pub archival_job: ArchivalJob,
}

impl SharedState {
    /// Connects the database and starts the notification worker.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let notifier = notifier_from_config(&config.mail)?;
        let (queue, _worker) = NotificationQueue::start(notifier);
        let uploader = uploader_from_config(&config.archive)?;

        Self::with_collaborators(config, Arc::new(queue), uploader).await
    }

    /// Same as [`SharedState::new`] with caller-provided delivery and upload
    /// collaborators.
    pub async fn with_collaborators(
        config: Config,
        notifications: Arc<dyn NotificationSink>,
        uploader: Arc<dyn ArchiveUploader>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let audit: Arc<dyn AuditSink> = Arc::new(StoreAuditSink::new(store.clone()));
        let notifications =
            WorkflowNotifications::new(store.clone(), notifications, config.mail.app_url.clone());

        let requisition_service = Arc::new(SeaOrmRequisitionService::new(
            store.clone(),
            config.workflow.clone(),
            audit.clone(),
            notifications.clone(),
        ));

        let transition_service = Arc::new(SeaOrmTransitionService::new(
            store.clone(),
            audit.clone(),
            notifications,
        ));

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
            config.admin.clone(),
            audit.clone(),
        )?);

        let user_admin_service = Arc::new(SeaOrmUserAdminService::new(
            store.clone(),
            config.security.clone(),
            audit.clone(),
        ));

        let archival_job = ArchivalJob::new(
            store.clone(),
            &config,
            Arc::new(HtmlDocumentRenderer),
            uploader,
            audit.clone(),
        );

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            audit,
            requisition_service,
            transition_service,
            auth_service,
            user_admin_service,
            archival_job,
        })
    }
}
