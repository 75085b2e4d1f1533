use sea_orm::entity::prelude::*;

/// Outstanding SMS code for one phone number and purpose.
///
/// `purpose` is one of `registration`, `password_reset`, `phone_change`; `new_phone` is only
/// set for phone changes. Unique on `(purpose, phone_number)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "phone_verifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub purpose: String,
    pub phone_number: String,
    pub new_phone: Option<String>,
    pub code: String,
    pub attempts: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
