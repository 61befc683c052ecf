//! System endpoints: health probes and on-demand maintenance tasks.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::archive::ArchiveReport;
use crate::services::SessionUser;

#[derive(Debug, Serialize)]
pub struct HealthLiveResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthReadyResponse {
    pub ready: bool,
    pub database: bool,
}

/// GET /system/health/live
pub async fn health_live(State(state): State<Arc<AppState>>) -> Json<HealthLiveResponse> {
    Json(HealthLiveResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// GET /system/health/ready
pub async fn health_ready(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthReadyResponse>) {
    let database = state.store().ping().await.is_ok();
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthReadyResponse {
            ready: database,
            database,
        }),
    )
}

/// POST /system/tasks/archive
///
/// Runs the archival job now; 409 while a run is already in progress.
pub async fn trigger_archive(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<ApiResponse<ArchiveReport>>, ApiError> {
    if !user.role.is_admin() {
        return Err(ApiError::Forbidden(
            "Administrator role required".to_string(),
        ));
    }

    tracing::info!(
        event = "job_started",
        job_name = "archive_requisitions",
        actor = %user.username,
        "Manual archival requested"
    );

    match state.archival_job().run_exclusive().await {
        Some(result) => Ok(Json(ApiResponse::success(result?))),
        None => Err(ApiError::Conflict(
            "Archival is already running".to_string(),
        )),
    }
}
