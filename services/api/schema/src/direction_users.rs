use sea_orm::entity::prelude::*;

/// Direction participants (many-to-many directions ↔ users).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "direction_users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub direction_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::directions::Entity",
        from = "Column::DirectionId",
        to = "super::directions::Column::Id"
    )]
    Direction,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::directions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Direction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
