mod common;

use common::{admin_actor, setup};
use rqflow::domain::{RequisitionStatus, Role};
use rqflow::services::{
    CreateRequisition, LineInput, ListQuery, RequisitionError, TransitionError,
    TransitionOutcome, TransitionWarning,
};
use sea_orm::ConnectionTrait;

fn sample_input() -> CreateRequisition {
    CreateRequisition {
        department: None,
        priority: rqflow::domain::Priority::High,
        observations: Some("  urgente  ".to_string()),
        lines: vec![
            LineInput {
                product: "  tornillo   hexagonal ".to_string(),
                quantity: "12.5".to_string(),
                unit: "pz".to_string(),
            },
            LineInput {
                product: "CINTA aislante".to_string(),
                quantity: "3".to_string(),
                unit: "rollo".to_string(),
            },
        ],
    }
}

#[tokio::test]
async fn test_create_normalizes_lines_and_notifies_warehouse() {
    let ctx = setup().await;
    let requester = ctx
        .create_user("ana", Role::Requester, Some("ana@example.com"))
        .await;
    ctx.create_user("almacen1", Role::Warehouse, Some("almacen@example.com"))
        .await;

    let detail = ctx
        .state
        .requisition_service
        .create(&requester, sample_input())
        .await
        .unwrap();

    let req = &detail.requisition;
    assert_eq!(req.status, RequisitionStatus::PendingWarehouseReview);
    assert!(req.number.starts_with("RQ-"));
    assert_eq!(req.department, "Depto ana");
    assert_eq!(req.observations.as_deref(), Some("urgente"));
    assert_eq!(req.lines[0].product, "Tornillo Hexagonal");
    assert_eq!(req.lines[1].product, "Cinta Aislante");
    assert!(detail.access.can_edit);

    let sent = ctx.sink.take();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].recipients, vec!["ana@example.com".to_string()]);
    assert_eq!(sent[1].recipients, vec!["almacen@example.com".to_string()]);

    let suggestions = ctx
        .state
        .requisition_service
        .product_suggestions("Tor", 10)
        .await
        .unwrap();
    assert_eq!(suggestions, vec!["Tornillo Hexagonal".to_string()]);
}

#[tokio::test]
async fn test_create_rejects_invalid_quantity() {
    let ctx = setup().await;
    let requester = ctx.create_user("ana", Role::Requester, None).await;

    let mut input = sample_input();
    input.lines[1].quantity = "0".to_string();

    let err = ctx
        .state
        .requisition_service
        .create(&requester, input)
        .await
        .unwrap_err();
    assert!(matches!(err, RequisitionError::Validation(_)));
    assert_eq!(ctx.state.store.requisition_repo().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_warehouse_approval_notifies_purchasing_once() {
    let ctx = setup().await;
    let requester = ctx
        .create_user("ana", Role::Requester, Some("ana@example.com"))
        .await;
    let warehouse = ctx
        .create_user("almacen1", Role::Warehouse, Some("almacen@example.com"))
        .await;
    ctx.create_user("compras1", Role::Purchasing, Some("compras@example.com"))
        .await;

    let detail = ctx
        .state
        .requisition_service
        .create(&requester, sample_input())
        .await
        .unwrap();
    ctx.sink.take();

    let outcome = ctx
        .state
        .transition_service
        .transition(
            &warehouse,
            detail.requisition.id,
            RequisitionStatus::WarehouseApproved,
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TransitionOutcome::Applied {
            from: RequisitionStatus::PendingWarehouseReview,
            to: RequisitionStatus::WarehouseApproved,
            warning: None,
        }
    );

    let sent = ctx.sink.take();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].recipients, vec!["ana@example.com".to_string()]);
    let purchasing: Vec<_> = sent
        .iter()
        .filter(|n| n.recipients.contains(&"compras@example.com".to_string()))
        .collect();
    assert_eq!(purchasing.len(), 1);
    assert_eq!(purchasing[0].recipients.len(), 1);
}

#[tokio::test]
async fn test_unchanged_status_writes_nothing() {
    let ctx = setup().await;
    let requester = ctx.create_user("ana", Role::Requester, None).await;
    let warehouse = ctx.create_user("almacen1", Role::Warehouse, None).await;

    let id = ctx
        .state
        .requisition_service
        .create(&requester, sample_input())
        .await
        .unwrap()
        .requisition
        .id;
    ctx.sink.take();
    let audit_before = ctx.state.store.audit_repo().count().await.unwrap();

    let outcome = ctx
        .state
        .transition_service
        .transition(
            &warehouse,
            id,
            RequisitionStatus::PendingWarehouseReview,
            Some("   ".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(outcome, TransitionOutcome::Unchanged);
    assert_eq!(ctx.state.store.audit_repo().count().await.unwrap(), audit_before);
    assert!(ctx.sink.take().is_empty());
}

#[tokio::test]
async fn test_disallowed_transition_keeps_status() {
    let ctx = setup().await;
    let requester = ctx.create_user("ana", Role::Requester, None).await;
    let purchasing = ctx.create_user("compras1", Role::Purchasing, None).await;

    let id = ctx
        .state
        .requisition_service
        .create(&requester, sample_input())
        .await
        .unwrap()
        .requisition
        .id;

    let err = ctx
        .state
        .transition_service
        .transition(&purchasing, id, RequisitionStatus::Closed, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransitionError::NotAllowed { .. }));

    let err = ctx
        .state
        .transition_service
        .transition(&requester, id, RequisitionStatus::Cancelled, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransitionError::NotAllowed { .. }));

    let stored = ctx
        .state
        .store
        .requisition_repo()
        .get(id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, RequisitionStatus::PendingWarehouseReview);
}

#[tokio::test]
async fn test_failed_status_write_records_nothing() {
    let ctx = setup().await;
    let requester = ctx
        .create_user("ana", Role::Requester, Some("ana@example.com"))
        .await;
    let warehouse = ctx
        .create_user("almacen1", Role::Warehouse, Some("almacen@example.com"))
        .await;
    ctx.create_user("compras1", Role::Purchasing, Some("compras@example.com"))
        .await;

    let id = ctx
        .state
        .requisition_service
        .create(&requester, sample_input())
        .await
        .unwrap()
        .requisition
        .id;
    ctx.sink.take();
    let audit_before = ctx.state.store.audit_repo().count().await.unwrap();

    ctx.state
        .store
        .conn
        .execute_unprepared(
            "CREATE TRIGGER reject_status_write BEFORE UPDATE OF status ON requisitions \
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;",
        )
        .await
        .unwrap();

    let err = ctx
        .state
        .transition_service
        .transition(&warehouse, id, RequisitionStatus::WarehouseApproved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransitionError::Persistence(_)));

    assert_eq!(ctx.state.store.audit_repo().count().await.unwrap(), audit_before);
    assert!(ctx.sink.take().is_empty());
    let stored = ctx
        .state
        .store
        .requisition_repo()
        .get(id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, RequisitionStatus::PendingWarehouseReview);
}

#[tokio::test]
async fn test_rejection_without_comment_warns() {
    let ctx = setup().await;
    let requester = ctx.create_user("ana", Role::Requester, None).await;
    let warehouse = ctx.create_user("almacen1", Role::Warehouse, None).await;

    let id = ctx
        .state
        .requisition_service
        .create(&requester, sample_input())
        .await
        .unwrap()
        .requisition
        .id;

    let outcome = ctx
        .state
        .transition_service
        .transition(&warehouse, id, RequisitionStatus::WarehouseRejected, None)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TransitionOutcome::Applied {
            from: RequisitionStatus::PendingWarehouseReview,
            to: RequisitionStatus::WarehouseRejected,
            warning: Some(TransitionWarning::MissingComment),
        }
    );
}

#[tokio::test]
async fn test_admin_can_set_any_status_with_comment() {
    let ctx = setup().await;
    let requester = ctx.create_user("ana", Role::Requester, None).await;

    let id = ctx
        .state
        .requisition_service
        .create(&requester, sample_input())
        .await
        .unwrap()
        .requisition
        .id;

    ctx.state
        .transition_service
        .transition(
            &admin_actor(),
            id,
            RequisitionStatus::Closed,
            Some("cerrada manualmente".to_string()),
        )
        .await
        .unwrap();

    let stored = ctx
        .state
        .store
        .requisition_repo()
        .get(id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, RequisitionStatus::Closed);
    assert_eq!(stored.status_comment.as_deref(), Some("cerrada manualmente"));

    let (entries, _) = ctx.state.store.audit_repo().list(1, 50).await.unwrap();
    assert!(
        entries
            .iter()
            .any(|e| e.action == "status pending_warehouse_review -> closed"
                && e.actor_user_id.is_none())
    );
}

#[tokio::test]
async fn test_requesters_only_see_their_own() {
    let ctx = setup().await;
    let ana = ctx.create_user("ana", Role::Requester, None).await;
    let luis = ctx.create_user("luis", Role::Requester, None).await;
    let warehouse = ctx.create_user("almacen1", Role::Warehouse, None).await;

    let id = ctx
        .state
        .requisition_service
        .create(&ana, sample_input())
        .await
        .unwrap()
        .requisition
        .id;
    ctx.state
        .requisition_service
        .create(&luis, sample_input())
        .await
        .unwrap();

    let own = ctx
        .state
        .requisition_service
        .list(&ana, ListQuery::default())
        .await
        .unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].id, id);

    let all = ctx
        .state
        .requisition_service
        .list(&warehouse, ListQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let err = ctx
        .state
        .requisition_service
        .get(&luis, id)
        .await
        .unwrap_err();
    assert!(matches!(err, RequisitionError::Forbidden(_)));
}

#[tokio::test]
async fn test_other_users_cannot_delete() {
    let ctx = setup().await;
    let ana = ctx.create_user("ana", Role::Requester, None).await;
    let warehouse = ctx.create_user("almacen1", Role::Warehouse, None).await;

    let id = ctx
        .state
        .requisition_service
        .create(&ana, sample_input())
        .await
        .unwrap()
        .requisition
        .id;

    let err = ctx
        .state
        .requisition_service
        .delete(&warehouse, id)
        .await
        .unwrap_err();
    assert!(matches!(err, RequisitionError::Forbidden(_)));

    ctx.state
        .requisition_service
        .delete(&ana, id)
        .await
        .unwrap();
    assert!(
        ctx.state
            .store
            .requisition_repo()
            .get(id)
            .await
            .unwrap()
            .is_none()
    );
}
