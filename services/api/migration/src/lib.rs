use sea_orm_migration::prelude::*;

mod m20260601_000001_create_users_and_roles;
mod m20260601_000002_create_directions;
mod m20260601_000003_create_ratings;
mod m20260601_000004_create_auth_tables;
mod m20260601_000005_create_achievements;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260601_000001_create_users_and_roles::Migration),
            Box::new(m20260601_000002_create_directions::Migration),
            Box::new(m20260601_000003_create_ratings::Migration),
            Box::new(m20260601_000004_create_auth_tables::Migration),
            Box::new(m20260601_000005_create_achievements::Migration),
        ]
    }
}
