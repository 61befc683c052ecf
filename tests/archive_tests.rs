mod common;

use chrono::{Duration, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use common::{FakeUploader, TestContext, setup, setup_with, test_config};
use rqflow::domain::{Priority, RequisitionId, RequisitionStatus};
use rqflow::models::requisition::{NewRequisition, RequisitionLine};

async fn insert(
    ctx: &TestContext,
    created_at: NaiveDateTime,
    status: RequisitionStatus,
) -> RequisitionId {
    let repo = ctx.state.store.requisition_repo();
    let requisition = repo
        .create(NewRequisition {
            created_at,
            requester_name: "ana".to_string(),
            requester_id: None,
            requester_email: None,
            department: "Mantenimiento".to_string(),
            priority: Priority::Medium,
            observations: None,
            creator_id: None,
            lines: vec![RequisitionLine {
                product: "Guantes".to_string(),
                quantity: Decimal::new(2, 0),
                unit: "par".to_string(),
            }],
        })
        .await
        .unwrap();

    repo.update_status(requisition.id, status, None, created_at)
        .await
        .unwrap();
    requisition.id
}

#[tokio::test]
async fn test_archives_only_old_terminal_requisitions() {
    let ctx = setup().await;
    let now = Utc::now().naive_utc();

    let old_closed = insert(&ctx, now - Duration::days(200), RequisitionStatus::Closed).await;
    let old_cancelled = insert(&ctx, now - Duration::days(190), RequisitionStatus::Cancelled).await;
    let recent_closed = insert(&ctx, now - Duration::days(10), RequisitionStatus::Closed).await;
    let old_open = insert(&ctx, now - Duration::days(300), RequisitionStatus::Purchased).await;

    let report = ctx.state.archival_job.run_at(now).await.unwrap();

    assert_eq!(report.examined, 2);
    assert_eq!(report.archived, 2);
    assert_eq!(report.deleted, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(ctx.uploader.upload_count(), 2);

    let repo = ctx.state.store.requisition_repo();
    assert!(repo.get(old_closed).await.unwrap().is_none());
    assert!(repo.get(old_cancelled).await.unwrap().is_none());
    assert!(repo.get(recent_closed).await.unwrap().is_some());
    assert!(repo.get(old_open).await.unwrap().is_some());

    let (entries, _) = ctx.state.store.audit_repo().list(1, 50).await.unwrap();
    let archive_entries = entries.iter().filter(|e| e.module == "archive").count();
    assert_eq!(archive_entries, 2);

    let staged = std::fs::read_dir(&ctx.staging)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(staged, 0);
}

#[tokio::test]
async fn test_failed_upload_keeps_requisition() {
    let ctx = setup_with(test_config(), FakeUploader::failing()).await;
    let now = Utc::now().naive_utc();

    let id = insert(&ctx, now - Duration::days(200), RequisitionStatus::Closed).await;

    let report = ctx.state.archival_job.run_at(now).await.unwrap();

    assert_eq!(report.examined, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.skipped, 1);

    let kept = ctx
        .state
        .store
        .requisition_repo()
        .get(id)
        .await
        .unwrap()
        .unwrap();
    assert!(kept.archived_document_url.is_none());
}

#[tokio::test]
async fn test_existing_url_is_not_uploaded_again() {
    let ctx = setup().await;
    let now = Utc::now().naive_utc();

    let id = insert(&ctx, now - Duration::days(200), RequisitionStatus::PurchasingRejected).await;
    ctx.state
        .store
        .requisition_repo()
        .set_archived_url(id, "https://files.example.com/earlier.html")
        .await
        .unwrap();

    let report = ctx.state.archival_job.run_at(now).await.unwrap();

    assert_eq!(report.archived, 0);
    assert_eq!(report.deleted, 1);
    assert_eq!(ctx.uploader.upload_count(), 0);
}

#[tokio::test]
async fn test_retention_boundary_is_exclusive() {
    let ctx = setup().await;
    let now = Utc::now().naive_utc();
    let retention = ctx.state.config.read().await.workflow.retention();

    let on_cutoff = insert(&ctx, now - retention, RequisitionStatus::Closed).await;

    let report = ctx.state.archival_job.run_at(now).await.unwrap();
    assert_eq!(report.examined, 0);
    assert!(
        ctx.state
            .store
            .requisition_repo()
            .get(on_cutoff)
            .await
            .unwrap()
            .is_some()
    );
}
