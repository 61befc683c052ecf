use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::RequisitionStatus;

/// Environment variable holding the environment-admin password.
pub const ADMIN_PASSWORD_ENV: &str = "RQFLOW_ADMIN_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub workflow: WorkflowConfig,

    pub scheduler: SchedulerConfig,

    pub mail: MailConfig,

    pub archive: ArchiveConfig,

    pub admin: AdminConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/rqflow.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Idle minutes before a session expires.
    pub session_idle_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8085,
            cors_allowed_origins: vec![
                "http://localhost:8085".to_string(),
                "http://127.0.0.1:8085".to_string(),
            ],
            secure_cookies: true,
            session_idle_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB
    pub argon2_memory_cost_kib: u32,

    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    pub min_password_length: usize,

    pub login_lockout: LoginLockoutConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 8,
            login_lockout: LoginLockoutConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginLockoutConfig {
    /// Failed attempts inside the window that trigger a lockout.
    pub max_failures: u64,

    /// Sliding window for counting failures.
    pub window_minutes: i64,

    /// Trusted proxy IP addresses allowed to provide `X-Forwarded-For`.
    ///
    /// When empty, forwarded headers are ignored and the socket peer address is used.
    pub trusted_proxy_ips: Vec<String>,
}

impl Default for LoginLockoutConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            window_minutes: 10,
            trusted_proxy_ips: Vec::new(),
        }
    }
}

impl LoginLockoutConfig {
    #[must_use]
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.window_minutes)
    }
}

/// Time windows of the requisition workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Minutes after creation during which the creator may edit or delete.
    pub edit_window_minutes: i64,

    /// Days a terminal requisition is kept before archival.
    pub retention_days: i64,

    /// Statuses the archival job treats as finished.
    pub terminal_statuses: Vec<RequisitionStatus>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            edit_window_minutes: 30,
            retention_days: 15,
            terminal_statuses: RequisitionStatus::TERMINAL.to_vec(),
        }
    }
}

impl WorkflowConfig {
    #[must_use]
    pub fn edit_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.edit_window_minutes)
    }

    #[must_use]
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Cron expression (with seconds) for the archival job. Takes precedence
    /// over `archive_interval_hours` when set.
    pub archive_cron: Option<String>,

    pub archive_interval_hours: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            archive_cron: Some("0 0 3 * * *".to_string()),
            archive_interval_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// When disabled, notifications are only written to the log.
    pub enabled: bool,

    pub smtp_host: String,

    pub smtp_port: u16,

    pub smtp_username: Option<String>,

    pub smtp_password: Option<String>,

    pub from: String,

    /// Base URL of the web front end, used for links in mail bodies.
    pub app_url: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            smtp_username: None,
            smtp_password: None,
            from: "Requisiciones <no-reply@localhost>".to_string(),
            app_url: "http://localhost:8085".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory where documents are rendered before upload.
    pub staging_path: String,

    /// Endpoint receiving a multipart `file` upload and answering with JSON
    /// containing the public URL. Archival is skipped while unset.
    pub upload_url: Option<String>,

    pub upload_token: Option<String>,

    pub upload_timeout_seconds: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            staging_path: "./data/archive".to_string(),
            upload_url: None,
            upload_token: None,
            upload_timeout_seconds: 30,
        }
    }
}

/// Non-persisted superuser materialized from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,

    /// Usually left empty and supplied through `RQFLOW_ADMIN_PASSWORD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "superadmin".to_string(),
            password: None,
        }
    }
}

impl AdminConfig {
    /// Password from config, falling back to the environment.
    #[must_use]
    pub fn resolved_password(&self) -> Option<String> {
        self.password
            .clone()
            .or_else(|| std::env::var(ADMIN_PASSWORD_ENV).ok())
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    /// Emit log lines as JSON objects instead of human-readable text.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            json_logs: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("rqflow").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".rqflow").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workflow.edit_window_minutes < 0 {
            anyhow::bail!("workflow.edit_window_minutes cannot be negative");
        }

        if self.workflow.retention_days < 0 {
            anyhow::bail!("workflow.retention_days cannot be negative");
        }

        if self.workflow.terminal_statuses.is_empty() {
            anyhow::bail!("workflow.terminal_statuses cannot be empty");
        }

        if self.security.login_lockout.max_failures == 0 {
            anyhow::bail!("security.login_lockout.max_failures must be > 0");
        }

        if self.scheduler.enabled
            && self.scheduler.archive_interval_hours == 0
            && self.scheduler.archive_cron.is_none()
        {
            anyhow::bail!("Archive interval must be > 0 or a cron expression must be set");
        }

        if let Some(upload_url) = &self.archive.upload_url {
            url::Url::parse(upload_url)
                .with_context(|| format!("Invalid archive.upload_url: {upload_url}"))?;
        }

        if self.mail.enabled && self.mail.smtp_host.is_empty() {
            anyhow::bail!("mail.smtp_host cannot be empty when mail is enabled");
        }

        Ok(())
    }
}
