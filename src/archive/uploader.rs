use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::ArchiveConfig;

/// Sends an archived document to external storage.
#[async_trait]
pub trait ArchiveUploader: Send + Sync {
    /// Public URL of the stored document, or `None` when the upload failed.
    async fn upload(&self, filename: &str, local_path: &Path) -> Option<String>;
}

/// Used while no upload endpoint is configured; archival never completes.
pub struct DisabledUploader;

#[async_trait]
impl ArchiveUploader for DisabledUploader {
    async fn upload(&self, filename: &str, _local_path: &Path) -> Option<String> {
        warn!(
            event = "archive_upload_skipped",
            filename, "archive.upload_url is not set; document kept locally"
        );
        None
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    url: Option<String>,
    web_view_link: Option<String>,
}

fn content_type(filename: &str) -> mime_guess::Mime {
    mime_guess::from_path(filename).first_or_octet_stream()
}

/// Multipart POST of the document as field `file`.
///
/// The endpoint must answer with JSON carrying `url` or `webViewLink`.
pub struct HttpArchiveUploader {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpArchiveUploader {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rqflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build upload HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
        })
    }

    async fn try_upload(&self, filename: &str, local_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type(filename).essence_str())
            .context("Invalid upload MIME type")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Upload request failed")?
            .error_for_status()
            .context("Upload rejected")?;

        let body: UploadResponse = response
            .json()
            .await
            .context("Upload response is not valid JSON")?;

        body.url
            .or(body.web_view_link)
            .filter(|u| !u.trim().is_empty())
            .context("Upload response has no URL")
    }
}

#[async_trait]
impl ArchiveUploader for HttpArchiveUploader {
    async fn upload(&self, filename: &str, local_path: &Path) -> Option<String> {
        match self.try_upload(filename, local_path).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(
                    event = "archive_upload_failed",
                    filename,
                    error = %format!("{e:#}"),
                    "Archive upload failed"
                );
                None
            }
        }
    }
}

/// HTTP uploader when an endpoint is configured, otherwise [`DisabledUploader`].
pub fn uploader_from_config(config: &ArchiveConfig) -> Result<Arc<dyn ArchiveUploader>> {
    match config.upload_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => Ok(Arc::new(HttpArchiveUploader::new(
            url,
            config.upload_token.clone(),
            Duration::from_secs(config.upload_timeout_seconds),
        )?)),
        None => Ok(Arc::new(DisabledUploader)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::post};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/upload")
    }

    fn staged_file() -> std::path::PathBuf {
        let path = std::env::temp_dir()
            .join(format!("rqflow-upload-{}.html", uuid::Uuid::new_v4()));
        std::fs::write(&path, "<html></html>").unwrap();
        path
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type("RQ-7.html").essence_str(), "text/html");
        assert_eq!(content_type("RQ-7.pdf").essence_str(), "application/pdf");
        assert_eq!(
            content_type("RQ-7").essence_str(),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_upload_returns_url() {
        let endpoint = serve(Router::new().route(
            "/upload",
            post(|| async { Json(json!({"webViewLink": "https://files.example.com/d/1"})) }),
        ))
        .await;

        let uploader = HttpArchiveUploader::new(endpoint, None, Duration::from_secs(5)).unwrap();
        let path = staged_file();
        let url = uploader.upload("RQ-1.html", &path).await;

        assert_eq!(url.as_deref(), Some("https://files.example.com/d/1"));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_upload_failure_is_none() {
        let endpoint = serve(Router::new().route(
            "/upload",
            post(|| async { axum::http::StatusCode::UNAUTHORIZED }),
        ))
        .await;

        let uploader =
            HttpArchiveUploader::new(endpoint, Some("t".to_string()), Duration::from_secs(5))
                .unwrap();
        let path = staged_file();

        assert!(uploader.upload("RQ-1.html", &path).await.is_none());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let uploader =
            HttpArchiveUploader::new("http://127.0.0.1:9/upload", None, Duration::from_secs(1))
                .unwrap();
        let missing = std::env::temp_dir().join("rqflow-does-not-exist.html");
        assert!(uploader.upload("x.html", &missing).await.is_none());
    }
}
