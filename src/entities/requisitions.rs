use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "requisitions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// "RQ-" followed by the UTC creation timestamp; never rewritten.
    #[sea_orm(unique)]
    pub number: String,

    pub created_at: DateTime,

    pub updated_at: DateTime,

    /// Requester snapshot taken at creation time, not a live reference.
    pub requester_name: String,

    pub requester_id: Option<i32>,

    pub requester_email: Option<String>,

    pub department: String,

    pub priority: String,

    /// Key from `RequisitionStatus::as_str`
    pub status: String,

    pub observations: Option<String>,

    /// `None` when created by the environment admin.
    pub creator_id: Option<i32>,

    pub status_comment: Option<String>,

    /// Set once the archived document has been uploaded.
    pub archived_document_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::requisition_lines::Entity")]
    RequisitionLines,
}

impl Related<super::requisition_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequisitionLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
