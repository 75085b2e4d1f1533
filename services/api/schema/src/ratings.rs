use sea_orm::entity::prelude::*;

/// Per-user, per-direction score. Created with value 0 when an application is approved.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ratings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub direction_id: i32,
    pub value: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Owner,
    #[sea_orm(
        belongs_to = "super::directions::Entity",
        from = "Column::DirectionId",
        to = "super::directions::Column::Id"
    )]
    Direction,
}

impl Related<super::directions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Direction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
