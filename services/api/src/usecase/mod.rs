pub mod achievement;
pub mod application;
pub mod auth;
pub mod direction;
pub mod rating;
pub mod user;
pub mod verification;

use uuid::Uuid;

use crate::domain::authz::Subject;
use crate::domain::repository::UserRepository;
use crate::error::ApiError;

/// Load the caller behind a validated access token. A token for a deleted user is a 404.
pub(crate) async fn subject_of<U: UserRepository>(
    users: &U,
    user_id: Uuid,
) -> Result<Subject, ApiError> {
    users
        .load_subject(user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))
}
