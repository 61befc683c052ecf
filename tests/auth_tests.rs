mod common;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use common::{ADMIN_PASSWORD, setup};
use rqflow::config::LoginLockoutConfig;
use rqflow::domain::Role;
use rqflow::services::{AuthError, AuthStrategy};

const IP: &str = "192.0.2.10";

#[tokio::test]
async fn test_lockout_after_repeated_failures_from_one_ip() {
    let ctx = setup().await;
    ctx.create_user("ana", Role::Requester, None).await;
    let auth = &ctx.state.auth_service;

    for attempt in 0..5 {
        let username = format!("ghost{attempt}");
        let err = auth.login(&username, "wrong", IP).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    let err = auth.login("ana", "password-123", IP).await.unwrap_err();
    assert!(matches!(err, AuthError::LockedOut));
    assert_eq!(err.to_string(), AuthError::InvalidCredentials.to_string());

    let user = auth
        .login("ana", "password-123", "192.0.2.99")
        .await
        .unwrap();
    assert_eq!(user.username, "ana");
}

#[tokio::test]
async fn test_lockout_follows_username_across_ips() {
    let ctx = setup().await;
    ctx.create_user("ana", Role::Requester, None).await;
    let auth = &ctx.state.auth_service;

    for attempt in 0..5 {
        let ip = format!("198.51.100.{}", attempt + 1);
        let err = auth.login("ana", "wrong", &ip).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    let err = auth
        .login("ana", "password-123", "203.0.113.50")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::LockedOut));

    let other = ctx.create_user("luis", Role::Warehouse, None).await;
    let user = auth
        .login("luis", "password-123", "203.0.113.50")
        .await
        .unwrap();
    assert_eq!(user.user_id, other.user_id);
}

fn failed_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 5, 4)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

#[tokio::test]
async fn test_lockout_window_expires() {
    let ctx = setup().await;
    let attempts = ctx.state.store.login_attempt_repo();
    let lockout = LoginLockoutConfig::default();

    for _ in 0..5 {
        attempts
            .record(Some("ana"), IP, false, failed_at())
            .await
            .unwrap();
    }

    let expired = failed_at() + Duration::minutes(10) + Duration::seconds(1);
    for (now, ip, expected) in [
        (failed_at() + Duration::minutes(9), IP, true),
        (failed_at() + Duration::minutes(10), "203.0.113.7", true),
        (expired, IP, false),
        (expired, "203.0.113.7", false),
    ] {
        let locked = attempts
            .is_locked_out(ip, Some("ana"), now, &lockout)
            .await
            .unwrap();
        assert_eq!(locked, expected, "{now} from {ip}");
    }
}

#[tokio::test]
async fn test_environment_admin_wrong_password() {
    let ctx = setup().await;
    let auth = &ctx.state.auth_service;

    let err = auth
        .login("superadmin", "admin-secret-12", IP)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    let session = auth.login("superadmin", ADMIN_PASSWORD, IP).await.unwrap();
    assert_eq!(session.strategy, AuthStrategy::EnvironmentAdmin);
}

#[tokio::test]
async fn test_success_does_not_reset_failures() {
    let ctx = setup().await;
    ctx.create_user("ana", Role::Requester, None).await;
    let auth = &ctx.state.auth_service;

    for _ in 0..4 {
        auth.login("ana", "wrong", IP).await.unwrap_err();
    }
    auth.login("ana", "password-123", IP).await.unwrap();
    auth.login("ana", "wrong", IP).await.unwrap_err();

    let err = auth.login("ana", "password-123", IP).await.unwrap_err();
    assert!(matches!(err, AuthError::LockedOut));
}

#[tokio::test]
async fn test_environment_admin_login() {
    let ctx = setup().await;

    let session = ctx
        .state
        .auth_service
        .login("superadmin", ADMIN_PASSWORD, IP)
        .await
        .unwrap();

    assert_eq!(session.strategy, AuthStrategy::EnvironmentAdmin);
    assert_eq!(session.role, Role::Superadmin);
    assert!(session.user_id.is_none());
    assert!(
        ctx.state
            .auth_service
            .validate_session(&session)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_newer_login_invalidates_older_session() {
    let ctx = setup().await;
    ctx.create_user("ana", Role::Requester, None).await;
    let auth = &ctx.state.auth_service;

    let first = auth.login("ana", "password-123", IP).await.unwrap();
    let second = auth.login("ana", "password-123", IP).await.unwrap();

    assert!(!auth.validate_session(&first).await.unwrap());
    assert!(auth.validate_session(&second).await.unwrap());

    auth.logout(&second).await.unwrap();
    assert!(!auth.validate_session(&second).await.unwrap());
}

#[tokio::test]
async fn test_change_password() {
    let ctx = setup().await;
    ctx.create_user("ana", Role::Requester, None).await;
    let auth = &ctx.state.auth_service;

    let session = auth.login("ana", "password-123", IP).await.unwrap();

    let err = auth
        .change_password(&session, "password-123", "short")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    auth.change_password(&session, "password-123", "new-password-456")
        .await
        .unwrap();

    assert!(auth.login("ana", "password-123", "192.0.2.50").await.is_err());
    auth.login("ana", "new-password-456", "192.0.2.51")
        .await
        .unwrap();
}
