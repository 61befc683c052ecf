use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "requisition_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub requisition_id: i32,

    /// Order of the line inside its requisition, starting at 0.
    pub position: i32,

    pub product: String,

    /// Canonical decimal text, parsed with `rust_decimal`.
    pub quantity: String,

    pub unit: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::requisitions::Entity",
        from = "Column::RequisitionId",
        to = "super::requisitions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Requisitions,
}

impl Related<super::requisitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requisitions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
