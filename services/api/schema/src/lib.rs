//! sea-orm entities for the Cohort API database.

pub mod achievements;
pub mod applications;
pub mod direction_users;
pub mod directions;
pub mod phone_verifications;
pub mod profiles;
pub mod rating_transactions;
pub mod ratings;
pub mod refresh_tokens;
pub mod roles;
pub mod user_achievements;
pub mod user_roles;
pub mod users;
