use axum::{
    Extension, Json,
    extract::{ConnectInfo, Request, State},
    http::{Extensions, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse, SessionUserDto};
use crate::services::SessionUser;

const SESSION_KEY: &str = "user";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl From<&SessionUser> for SessionUserDto {
    fn from(user: &SessionUser) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username.clone(),
            role: user.role,
            is_admin: user.role.is_admin(),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Requires a session whose token is still current, and exposes its
/// [`SessionUser`] to handlers as an extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = session
        .get::<SessionUser>(SESSION_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    if !state.auth_service().validate_session(&user).await? {
        let _ = session.flush().await;
        return Err(ApiError::Unauthorized("Session expired".to_string()));
    }

    tracing::Span::current().record("user_id", user.username.as_str());
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Peer address, or the first `X-Forwarded-For` entry when the peer is a
/// trusted proxy.
fn client_ip(headers: &HeaderMap, extensions: &Extensions, trusted_proxies: &[String]) -> String {
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let Some(peer) = peer else {
        return "unknown".to_string();
    };

    let trusted = trusted_proxies
        .iter()
        .filter_map(|ip| ip.parse::<IpAddr>().ok())
        .any(|ip| ip == peer);

    if trusted
        && let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next().map(str::trim)
        && first.parse::<IpAddr>().is_ok()
    {
        return first.to_string();
    }

    peer.to_string()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    extensions: Extensions,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionUserDto>>, ApiError> {
    if payload.username.trim().is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let trusted = state
        .config()
        .read()
        .await
        .security
        .login_lockout
        .trusted_proxy_ips
        .clone();
    let ip = client_ip(&headers, &extensions, &trusted);

    let user = state
        .auth_service()
        .login(&payload.username, &payload.password, &ip)
        .await?;

    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;
    session
        .insert(SESSION_KEY, &user)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    Ok(Json(ApiResponse::success(SessionUserDto::from(&user))))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if let Ok(Some(user)) = session.get::<SessionUser>(SESSION_KEY).await {
        state.auth_service().logout(&user).await?;
    }
    let _ = session.flush().await;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Logged out",
    ))))
}

/// GET /auth/me
pub async fn get_current_user(
    Extension(user): Extension<SessionUser>,
) -> Json<ApiResponse<SessionUserDto>> {
    Json(ApiResponse::success(SessionUserDto::from(&user)))
}

/// PUT /auth/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service()
        .change_password(&user, &payload.current_password, &payload.new_password)
        .await?;

    tracing::info!("Password changed for user: {}", user.username);

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extensions_from(addr: &str) -> Extensions {
        let mut ext = Extensions::new();
        ext.insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
        ext
    }

    #[test]
    fn test_client_ip_ignores_untrusted_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9".parse().unwrap());

        let ip = client_ip(&headers, &extensions_from("10.0.0.5:4000"), &[]);
        assert_eq!(ip, "10.0.0.5");
    }

    #[test]
    fn test_client_ip_uses_trusted_proxy_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());

        let ip = client_ip(
            &headers,
            &extensions_from("10.0.0.5:4000"),
            &["10.0.0.5".to_string()],
        );
        assert_eq!(ip, "203.0.113.9");
    }

    #[test]
    fn test_client_ip_without_connect_info() {
        assert_eq!(
            client_ip(&HeaderMap::new(), &Extensions::new(), &[]),
            "unknown"
        );
    }
}
