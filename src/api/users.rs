//! Administration endpoints: users, roles, departments and the audit log.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{
    ApiError, ApiResponse, AppState, AuditQuery, CreateDepartmentRequest, MessageResponse,
};
use crate::db::{Department, RoleRow, User};
use crate::domain::UserId;
use crate::services::{AuditPage, CreateUserRequest, SessionUser, UpdateUserRequest};

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let users = state.user_admin_service().list_users(&user.actor()).await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    let created = state
        .user_admin_service()
        .create_user(&user.actor(), payload)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let updated = state
        .user_admin_service()
        .update_user(&user.actor(), UserId::new(id), payload)
        .await?;

    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .user_admin_service()
        .delete_user(&user.actor(), UserId::new(id))
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "User deleted",
    ))))
}

pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<ApiResponse<Vec<RoleRow>>>, ApiError> {
    let roles = state.user_admin_service().list_roles(&user.actor()).await?;
    Ok(Json(ApiResponse::success(roles)))
}

pub async fn list_departments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Department>>>, ApiError> {
    let departments = state.user_admin_service().list_departments().await?;
    Ok(Json(ApiResponse::success(departments)))
}

pub async fn create_department(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<CreateDepartmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Department>>), ApiError> {
    let department = state
        .user_admin_service()
        .create_department(&user.actor(), &payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(department))))
}

/// GET /audit?page=&page_size=
pub async fn get_audit_log(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiResponse<AuditPage>>, ApiError> {
    let page = state
        .user_admin_service()
        .audit_log(
            &user.actor(),
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(50),
        )
        .await?;

    Ok(Json(ApiResponse::success(page)))
}
