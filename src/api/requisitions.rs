use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, TransitionRequest};
use crate::domain::RequisitionId;
use crate::models::requisition::Requisition;
use crate::services::{
    CreateRequisition, ListQuery, RequisitionDetail, SessionUser, TransitionOutcome,
    UpdateRequisition,
};

/// GET /requisitions
pub async fn list_requisitions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Requisition>>>, ApiError> {
    let items = state
        .requisition_service()
        .list(&user.actor(), query)
        .await?;

    Ok(Json(ApiResponse::success(items)))
}

/// POST /requisitions
pub async fn create_requisition(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<CreateRequisition>,
) -> Result<(StatusCode, Json<ApiResponse<RequisitionDetail>>), ApiError> {
    let detail = state
        .requisition_service()
        .create(&user.actor(), payload)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(detail))))
}

/// GET /requisitions/{id}
pub async fn get_requisition(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<RequisitionDetail>>, ApiError> {
    let detail = state
        .requisition_service()
        .get(&user.actor(), RequisitionId::new(id))
        .await?;

    Ok(Json(ApiResponse::success(detail)))
}

/// PUT /requisitions/{id}
pub async fn update_requisition(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRequisition>,
) -> Result<Json<ApiResponse<RequisitionDetail>>, ApiError> {
    let detail = state
        .requisition_service()
        .update(&user.actor(), RequisitionId::new(id), payload)
        .await?;

    Ok(Json(ApiResponse::success(detail)))
}

/// DELETE /requisitions/{id}
pub async fn delete_requisition(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .requisition_service()
        .delete(&user.actor(), RequisitionId::new(id))
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Requisition deleted",
    ))))
}

/// POST /requisitions/{id}/status
///
/// Responds with the outcome; `unchanged` when nothing had to be written.
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<i32>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<ApiResponse<TransitionOutcome>>, ApiError> {
    let outcome = state
        .transition_service()
        .transition(
            &user.actor(),
            RequisitionId::new(id),
            payload.status,
            payload.comment,
        )
        .await?;

    Ok(Json(ApiResponse::success(outcome)))
}
