use sea_orm::entity::prelude::*;

/// Pending request by a user to join a direction.
///
/// Rows are deleted when resolved; the `(user_id, direction_id)` unique index keeps at most
/// one open application per pair.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "applications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub direction_id: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
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
