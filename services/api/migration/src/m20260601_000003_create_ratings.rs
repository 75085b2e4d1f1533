use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Ratings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Ratings::UserId).uuid().not_null())
                    .col(ColumnDef::new(Ratings::DirectionId).integer().not_null())
                    .col(
                        ColumnDef::new(Ratings::Value)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Ratings::Table, Ratings::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Ratings::Table, Ratings::DirectionId)
                            .to(Directions::Table, Directions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Ratings::Table)
                    .col(Ratings::UserId)
                    .col(Ratings::DirectionId)
                    .unique()
                    .name("uq_ratings_user_direction")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Ratings::Table)
                    .col(Ratings::DirectionId)
                    .col(Ratings::Value)
                    .name("idx_ratings_direction_value")
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RatingTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RatingTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RatingTransactions::RatingId).uuid().not_null())
                    .col(ColumnDef::new(RatingTransactions::AuthorId).uuid().not_null())
                    .col(
                        ColumnDef::new(RatingTransactions::ValueChange)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RatingTransactions::Reason).text().not_null())
                    .col(
                        ColumnDef::new(RatingTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RatingTransactions::Table, RatingTransactions::RatingId)
                            .to(Ratings::Table, Ratings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(RatingTransactions::Table, RatingTransactions::AuthorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(RatingTransactions::Table)
                    .col(RatingTransactions::RatingId)
                    .name("idx_rating_transactions_rating_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RatingTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ratings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Ratings {
    Table,
    Id,
    UserId,
    DirectionId,
    Value,
    CreatedAt,
}

#[derive(Iden)]
enum RatingTransactions {
    Table,
    Id,
    RatingId,
    AuthorId,
    ValueChange,
    Reason,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}

#[derive(Iden)]
enum Directions {
    Table,
    Id,
}
