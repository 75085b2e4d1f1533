#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cohort_domain::pagination::Window;

use crate::domain::authz::Subject;
use crate::domain::types::{
    Achievement, Application, CodeRequest, Direction, DirectionPatch, NewDirection,
    PhoneVerification, Profile, ProfilePatch, Rating, RatingTransaction, RefreshTokenRecord,
    Role, User, UserAchievement, UserSummary, VerificationPurpose,
};
use crate::error::ApiError;

/// Reference roles and role membership.
pub trait RoleRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, ApiError>;

    /// Insert a role, returning the existing row if the name is already taken.
    async fn create(&self, name: &str) -> Result<Role, ApiError>;

    /// Grant a role. Granting a held role is a no-op.
    async fn grant(&self, user_id: Uuid, role_id: i32) -> Result<(), ApiError>;
}

pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, ApiError>;

    /// Insert user, empty profile and initial role membership in one transaction.
    ///
    /// A duplicate phone yields [`ApiError::UserExists`].
    async fn create_with_profile(&self, user: &User, role_id: i32) -> Result<(), ApiError>;

    /// Store a new password hash, stamp `updated_at` with `changed_at` and drop every
    /// refresh token in one transaction.
    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), ApiError>;

    /// Move the user to `new_phone` and delete the verification record in one transaction.
    ///
    /// A record already consumed by a concurrent confirm yields
    /// [`ApiError::VerificationNotFound`] and leaves the phone unchanged.
    async fn change_phone(
        &self,
        user_id: Uuid,
        new_phone: &str,
        verification_id: Uuid,
    ) -> Result<(), ApiError>;

    /// Resolve identity, role membership and mentored directions of a caller.
    async fn load_subject(&self, user_id: Uuid) -> Result<Option<Subject>, ApiError>;

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ApiError>;

    async fn update_profile(&self, user_id: Uuid, patch: ProfilePatch)
    -> Result<Profile, ApiError>;

    /// Public summaries in the order of `ids`; unknown ids are skipped.
    async fn summaries(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, ApiError>;
}

pub trait DirectionRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Direction>, ApiError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Direction>, ApiError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Direction>, ApiError>;

    /// A name collision yields [`ApiError::DirectionExists`].
    async fn create(&self, direction: &NewDirection) -> Result<Direction, ApiError>;

    /// Apply `patch` and return the stored row. A name collision yields
    /// [`ApiError::DirectionExists`].
    async fn update(&self, id: i32, patch: DirectionPatch) -> Result<Direction, ApiError>;

    async fn joined_by(&self, user_id: Uuid) -> Result<Vec<Direction>, ApiError>;

    async fn participant_ids(&self, direction_id: i32) -> Result<Vec<Uuid>, ApiError>;

    async fn is_member(&self, direction_id: i32, user_id: Uuid) -> Result<bool, ApiError>;
}

pub trait ApplicationRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>, ApiError>;

    async fn find_pending(
        &self,
        user_id: Uuid,
        direction_id: i32,
    ) -> Result<Option<Application>, ApiError>;

    /// A concurrent duplicate yields [`ApiError::AlreadyApplied`].
    async fn create(&self, application: &Application) -> Result<(), ApiError>;

    async fn list_all(&self) -> Result<Vec<Application>, ApiError>;

    async fn list_for_directions(
        &self,
        direction_ids: &[i32],
    ) -> Result<Vec<Application>, ApiError>;

    /// Consume the application, add the membership and open `rating`, atomically.
    ///
    /// Yields [`ApiError::NotFound`] when the application was already consumed.
    async fn approve(&self, application: &Application, rating: &Rating) -> Result<(), ApiError>;

    /// Delete the application. Returns `false` if it no longer exists.
    async fn decline(&self, id: Uuid) -> Result<bool, ApiError>;
}

pub trait RatingRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Rating>, ApiError>;

    /// Transactions of a rating, oldest first.
    async fn transactions(&self, rating_id: Uuid) -> Result<Vec<RatingTransaction>, ApiError>;

    /// Append `entry` and add its delta to the rating in one transaction, returning the
    /// updated rating.
    async fn add_delta(&self, entry: &RatingTransaction) -> Result<Rating, ApiError>;

    /// Ratings of a direction, highest value first.
    async fn list_for_direction(
        &self,
        direction_id: i32,
        window: Window,
    ) -> Result<Vec<Rating>, ApiError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Rating>, ApiError>;

    async fn authored_by(&self, author_id: Uuid) -> Result<Vec<RatingTransaction>, ApiError>;
}

pub trait RefreshTokenRepository: Send + Sync {
    /// Store a token, dropping the oldest ones beyond `MAX_REFRESH_TOKENS`.
    async fn store(&self, record: &RefreshTokenRecord) -> Result<(), ApiError>;

    async fn find(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, ApiError>;

    async fn delete(&self, id: Uuid) -> Result<(), ApiError>;

    /// Delete `old_id` and store `next` in one transaction.
    async fn rotate(&self, old_id: Uuid, next: &RefreshTokenRecord) -> Result<(), ApiError>;

    /// Delete every token of the user, returning how many were removed.
    async fn delete_all(&self, user_id: Uuid) -> Result<u64, ApiError>;
}

pub trait VerificationRepository: Send + Sync {
    /// Record a code request under the rate-limit policy.
    ///
    /// The existing record is locked for the check-and-update so concurrent requests for
    /// the same phone cannot slip past the limits.
    async fn record_request(&self, request: &CodeRequest) -> Result<PhoneVerification, ApiError>;

    async fn find(
        &self,
        purpose: VerificationPurpose,
        phone: &str,
    ) -> Result<Option<PhoneVerification>, ApiError>;

    /// Consume a record. `false` when it was already gone.
    async fn delete(&self, id: Uuid) -> Result<bool, ApiError>;
}

pub trait AchievementRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Achievement>, ApiError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Achievement>, ApiError>;

    /// Grant an achievement. Granting a held achievement is a no-op.
    async fn give(&self, user_id: Uuid, achievement_id: i32) -> Result<(), ApiError>;

    async fn of_user(&self, user_id: Uuid) -> Result<Vec<UserAchievement>, ApiError>;
}

/// Outbound text messages.
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<(), ApiError>;
}

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, ApiError>;

    fn verify(&self, password: &str, hash: &str) -> Result<bool, ApiError>;
}
