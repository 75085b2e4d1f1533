use chrono::{DateTime, Utc};
use uuid::Uuid;

use cohort_domain::validate::validate_email;

use crate::domain::authz::{AccessPolicy, Action, Decision, Resource};
use crate::domain::repository::{
    AchievementRepository, DirectionRepository, RatingRepository, RoleRepository, UserRepository,
};
use crate::domain::types::{
    Direction, Profile, ProfilePatch, Rating, RatingTransaction, Role, UserAchievement,
};
use crate::error::{ApiError, Operation};
use crate::usecase::subject_of;

/// Everything shown on a profile page. Private fields are `None` when redacted.
#[derive(Debug)]
pub struct ProfileView {
    pub user_id: Uuid,
    pub phone_number: Option<String>,
    pub profile: Profile,
    pub roles: Vec<Role>,
    pub joined: Vec<Direction>,
    pub mentored: Vec<Direction>,
    pub ratings: Vec<Rating>,
    pub achievements: Vec<UserAchievement>,
    pub authored_transactions: Option<Vec<RatingTransaction>>,
    pub created_at: DateTime<Utc>,
}

// ── GetProfile ───────────────────────────────────────────────────────────────

pub struct GetProfileUseCase<U, R, D, Ra, Ac>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
    Ra: RatingRepository,
    Ac: AchievementRepository,
{
    pub users: U,
    pub policy: AccessPolicy<R>,
    pub directions: D,
    pub ratings: Ra,
    pub achievements: Ac,
}

impl<U, R, D, Ra, Ac> GetProfileUseCase<U, R, D, Ra, Ac>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
    Ra: RatingRepository,
    Ac: AchievementRepository,
{
    /// Profile of `target` as seen by `viewer`.
    ///
    /// Phone, email, contact and authored transactions are only shown to the user
    /// themselves, mentors and admins.
    pub async fn execute(&self, viewer: Uuid, target: Uuid) -> Result<ProfileView, ApiError> {
        let viewer = subject_of(&self.users, viewer).await?;
        let user = self
            .users
            .find_by_id(target)
            .await?
            .ok_or(ApiError::NotFound("user"))?;
        let owner = subject_of(&self.users, target).await?;

        let private = self
            .policy
            .authorize(&viewer, Resource::User(target), Action::ViewPrivateProfile)
            .await?
            == Decision::Allow;

        let mut profile = self
            .users
            .find_profile(target)
            .await?
            .unwrap_or_else(|| Profile::empty(target));
        let authored_transactions = if private {
            Some(self.ratings.authored_by(target).await?)
        } else {
            profile.email = None;
            profile.contact = None;
            None
        };

        Ok(ProfileView {
            user_id: user.id,
            phone_number: private.then_some(user.phone_number),
            profile,
            roles: owner.roles,
            joined: self.directions.joined_by(target).await?,
            mentored: owner.mentored,
            ratings: self.ratings.list_for_user(target).await?,
            achievements: self.achievements.of_user(target).await?,
            authored_transactions,
            created_at: user.created_at,
        })
    }
}

// ── EditProfile ──────────────────────────────────────────────────────────────

pub struct EditProfileUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> EditProfileUseCase<U> {
    pub async fn execute(&self, caller: Uuid, patch: ProfilePatch) -> Result<Profile, ApiError> {
        if patch.is_empty() {
            return Err(ApiError::MissingField("profile"));
        }
        if let Some(email) = &patch.email {
            if !validate_email(email) {
                return Err(ApiError::BadEmail);
            }
        }
        self.users
            .find_by_id(caller)
            .await?
            .ok_or(ApiError::NotFound("user"))?;
        self.users
            .update_profile(caller, patch)
            .await
            .map_err(|e| e.during(Operation::ProfileEdit))
    }
}

// ── GrantRole ────────────────────────────────────────────────────────────────

pub struct GrantRoleUseCase<U, R>
where
    U: UserRepository,
    R: RoleRepository,
{
    pub users: U,
    pub policy: AccessPolicy<R>,
}

impl<U, R> GrantRoleUseCase<U, R>
where
    U: UserRepository,
    R: RoleRepository,
{
    pub async fn execute(&self, caller: Uuid, target: Uuid, role: &str) -> Result<Role, ApiError> {
        let subject = subject_of(&self.users, caller).await?;
        self.policy
            .ensure(&subject, Resource::User(target), Action::GrantRole)
            .await?;

        self.users
            .find_by_id(target)
            .await?
            .ok_or(ApiError::NotFound("user"))?;
        let roles = &self.policy.helper.roles;
        let role = roles
            .find_by_name(role)
            .await?
            .ok_or(ApiError::NotFound("role"))?;
        roles
            .grant(target, role.id)
            .await
            .map_err(|e| e.during(Operation::RoleCreation))?;
        tracing::info!(user_id = %target, role = %role.name, granted_by = %caller, "role granted");
        Ok(role)
    }
}
