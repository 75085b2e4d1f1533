use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Directions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Directions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Directions::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Directions::Description).text().not_null())
                    .col(ColumnDef::new(Directions::MentorId).uuid().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Directions::Table, Directions::MentorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Directions::Table)
                    .col(Directions::MentorId)
                    .name("idx_directions_mentor_id")
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DirectionUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DirectionUsers::DirectionId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DirectionUsers::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(DirectionUsers::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(DirectionUsers::DirectionId)
                            .col(DirectionUsers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(DirectionUsers::Table, DirectionUsers::DirectionId)
                            .to(Directions::Table, Directions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(DirectionUsers::Table, DirectionUsers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Applications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Applications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Applications::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Applications::DirectionId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Applications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Applications::Table, Applications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Applications::Table, Applications::DirectionId)
                            .to(Directions::Table, Directions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Applications::Table)
                    .col(Applications::UserId)
                    .col(Applications::DirectionId)
                    .unique()
                    .name("uq_applications_user_direction")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Applications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DirectionUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Directions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Directions {
    Table,
    Id,
    Name,
    Description,
    MentorId,
}

#[derive(Iden)]
enum DirectionUsers {
    Table,
    DirectionId,
    UserId,
    JoinedAt,
}

#[derive(Iden)]
enum Applications {
    Table,
    Id,
    UserId,
    DirectionId,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
