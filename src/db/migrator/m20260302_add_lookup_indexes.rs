use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Archival sweep filters on status + created_at
        manager
            .create_index(
                Index::create()
                    .name("idx_requisitions_status_created_at")
                    .table(Requisitions::Table)
                    .col(Requisitions::Status)
                    .col(Requisitions::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requisition_lines_requisition_id")
                    .table(RequisitionLines::Table)
                    .col(RequisitionLines::RequisitionId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Lockout counts by ip/username inside a time window
        manager
            .create_index(
                Index::create()
                    .name("idx_login_attempts_created_at")
                    .table(LoginAttempts::Table)
                    .col(LoginAttempts::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_log_created_at")
                    .table(AuditLog::Table)
                    .col(AuditLog::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_audit_log_created_at")
                    .table(AuditLog::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_login_attempts_created_at")
                    .table(LoginAttempts::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_requisition_lines_requisition_id")
                    .table(RequisitionLines::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_requisitions_status_created_at")
                    .table(Requisitions::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum Requisitions {
    Table,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum RequisitionLines {
    Table,
    RequisitionId,
}

#[derive(Iden)]
enum LoginAttempts {
    Table,
    CreatedAt,
}

#[derive(Iden)]
enum AuditLog {
    Table,
    CreatedAt,
}
