#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rqflow::archive::ArchiveUploader;
use rqflow::config::Config;
use rqflow::db::NewUser;
use rqflow::domain::{Actor, Role};
use rqflow::notify::{Notification, NotificationSink, NotifyError};
use rqflow::state::SharedState;

pub const ADMIN_PASSWORD: &str = "admin-secret-123";

/// Config pointing at a fresh SQLite file and staging directory under the
/// system temp dir.
pub fn test_config() -> Config {
    let id = uuid::Uuid::new_v4();
    let dir = std::env::temp_dir().join(format!("rqflow-test-{id}"));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite://{}?mode=rwc", dir.join("rqflow.db").display());
    config.archive.staging_path = dir.join("archive").display().to_string();
    config.admin.password = Some(ADMIN_PASSWORD.to_string());
    config.server.secure_cookies = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

impl NotificationSink for RecordingSink {
    fn enqueue(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Records every upload and answers with a fixed URL, or fails when `url` is `None`.
pub struct FakeUploader {
    pub url: Option<String>,
    pub uploads: Mutex<Vec<String>>,
}

impl FakeUploader {
    pub fn succeeding() -> Self {
        Self {
            url: Some("https://files.example.com/doc".to_string()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            url: None,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl ArchiveUploader for FakeUploader {
    async fn upload(&self, filename: &str, local_path: &Path) -> Option<String> {
        assert!(local_path.exists(), "staged file missing: {}", local_path.display());
        self.uploads.lock().unwrap().push(filename.to_string());
        self.url.as_ref().map(|u| format!("{u}/{filename}"))
    }
}

pub struct TestContext {
    pub state: Arc<SharedState>,
    pub sink: Arc<RecordingSink>,
    pub uploader: Arc<FakeUploader>,
    pub staging: PathBuf,
}

pub async fn setup_with(config: Config, uploader: FakeUploader) -> TestContext {
    let staging = PathBuf::from(&config.archive.staging_path);
    let sink = Arc::new(RecordingSink::default());
    let uploader = Arc::new(uploader);

    let state = SharedState::with_collaborators(config, sink.clone(), uploader.clone())
        .await
        .expect("Failed to create shared state");

    TestContext {
        state: Arc::new(state),
        sink,
        uploader,
        staging,
    }
}

pub async fn setup() -> TestContext {
    setup_with(test_config(), FakeUploader::succeeding()).await
}

impl TestContext {
    /// Inserts an active user and returns the actor it logs in as.
    pub async fn create_user(&self, username: &str, role: Role, email: Option<&str>) -> Actor {
        let config = self.state.config.read().await.clone();
        let department = self
            .state
            .store
            .create_department(&format!("Depto {username}"))
            .await
            .unwrap();

        let user = self
            .state
            .store
            .user_repo()
            .create(
                NewUser {
                    username: username.to_string(),
                    password: "password-123".to_string(),
                    email: email.map(str::to_string),
                    role,
                    department_id: Some(department.id),
                    is_superadmin: role == Role::Superadmin,
                },
                &config.security,
                chrono::Utc::now().naive_utc(),
            )
            .await
            .unwrap();

        user.actor()
    }
}

pub fn admin_actor() -> Actor {
    Actor::new(None, "superadmin", Role::Superadmin)
}
