//! Role checks and the access policy every workflow goes through.
//!
//! [`AccessPolicy::authorize`] answers `(subject, resource, action)` with a [`Decision`].
//! It is built on three primitives: [`has_object`] (identity membership), [`is_direction_mentor`]
//! and [`RoleHelper::has_role`], which resolves a role name against the stored reference rows
//! before comparing identities.

use std::str::FromStr;

use uuid::Uuid;

use cohort_domain::role::RoleName;

use crate::domain::repository::RoleRepository;
use crate::domain::types::{Direction, Rating, Role, User};
use crate::error::ApiError;

/// Anything with a stable identity: a UUID, an integer id, or neither.
pub trait Identified {
    fn uuid(&self) -> Option<Uuid> {
        None
    }

    fn id(&self) -> Option<i64> {
        None
    }
}

impl Identified for Role {
    fn id(&self) -> Option<i64> {
        Some(self.id.into())
    }
}

impl Identified for Direction {
    fn id(&self) -> Option<i64> {
        Some(self.id.into())
    }
}

impl Identified for User {
    fn uuid(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl Identified for Rating {
    fn uuid(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

/// Whether `target` is in `collection`, compared by UUID when it has one, else by id.
pub fn has_object<T, C>(target: &T, collection: &[C]) -> bool
where
    T: Identified + ?Sized,
    C: Identified,
{
    if let Some(uuid) = target.uuid() {
        return collection.iter().any(|c| c.uuid() == Some(uuid));
    }
    if let Some(id) = target.id() {
        return collection.iter().any(|c| c.id() == Some(id));
    }
    false
}

/// An authenticated caller with the relations permission checks need.
#[derive(Debug, Clone)]
pub struct Subject {
    pub user_id: Uuid,
    pub roles: Vec<Role>,
    pub mentored: Vec<Direction>,
}

pub fn is_direction_mentor(direction: &Direction, subject: &Subject) -> bool {
    has_object(direction, &subject.mentored)
}

/// Resolves role names against the stored roles.
pub struct RoleHelper<R: RoleRepository> {
    pub roles: R,
}

impl<R: RoleRepository> RoleHelper<R> {
    /// `false` when the role is not seeded.
    pub async fn has_role(&self, name: RoleName, candidates: &[Role]) -> Result<bool, ApiError> {
        let role = self.roles.find_by_name(name.as_str()).await?;
        Ok(role.is_some_and(|r| has_object(&r, candidates)))
    }
}

/// How direction mentorship and the admin role combine for application and rating changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MentorAdminRule {
    /// The direction's mentor or any admin.
    #[default]
    Either,
    /// Only an admin who also mentors the direction.
    Both,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown mentor/admin rule: {0}")]
pub struct UnknownRule(String);

impl FromStr for MentorAdminRule {
    type Err = UnknownRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "either" => Ok(Self::Either),
            "both" => Ok(Self::Both),
            other => Err(UnknownRule(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadCatalog,
    Apply,
    ListApplications,
    ResolveApplication,
    ViewRatingHistory,
    AddRatingDelta,
    ManageDirections,
    GrantAchievement,
    GrantRole,
    ViewPrivateProfile,
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// Lists and reference data not tied to one owner.
    Catalog,
    Direction(&'a Direction),
    Rating {
        rating: &'a Rating,
        direction: &'a Direction,
    },
    User(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed { Self::Allow } else { Self::Deny }
    }
}

pub struct AccessPolicy<R: RoleRepository> {
    pub helper: RoleHelper<R>,
    pub rule: MentorAdminRule,
}

impl<R: RoleRepository> AccessPolicy<R> {
    pub fn new(roles: R, rule: MentorAdminRule) -> Self {
        Self {
            helper: RoleHelper { roles },
            rule,
        }
    }

    pub async fn authorize(
        &self,
        subject: &Subject,
        resource: Resource<'_>,
        action: Action,
    ) -> Result<Decision, ApiError> {
        let allowed = match (action, resource) {
            (Action::ReadCatalog, _) => true,
            (Action::Apply, _) => self.has(RoleName::User, subject).await?,
            (Action::ListApplications, _) => {
                self.has(RoleName::Mentor, subject).await?
                    || self.has(RoleName::Admin, subject).await?
            }
            (Action::ResolveApplication, Resource::Direction(direction))
            | (Action::AddRatingDelta, Resource::Rating { direction, .. }) => {
                let mentor = is_direction_mentor(direction, subject);
                let admin = self.has(RoleName::Admin, subject).await?;
                match self.rule {
                    MentorAdminRule::Either => mentor || admin,
                    MentorAdminRule::Both => mentor && admin,
                }
            }
            (Action::ViewRatingHistory, Resource::Rating { rating, .. }) => {
                rating.user_id == subject.user_id
                    || self.has(RoleName::Mentor, subject).await?
                    || self.has(RoleName::Admin, subject).await?
            }
            (Action::ManageDirections | Action::GrantRole, _) => {
                self.has(RoleName::Admin, subject).await?
            }
            (Action::GrantAchievement, _) => self.has(RoleName::Mentor, subject).await?,
            (Action::ViewPrivateProfile, Resource::User(user_id)) => {
                user_id == subject.user_id
                    || self.has(RoleName::Mentor, subject).await?
                    || self.has(RoleName::Admin, subject).await?
            }
            _ => false,
        };
        Ok(allowed.into())
    }

    /// [`authorize`](Self::authorize), turning a denial into [`ApiError::Unauthorized`].
    pub async fn ensure(
        &self,
        subject: &Subject,
        resource: Resource<'_>,
        action: Action,
    ) -> Result<(), ApiError> {
        match self.authorize(subject, resource, action).await? {
            Decision::Allow => Ok(()),
            Decision::Deny => {
                tracing::debug!(user_id = %subject.user_id, ?action, "access denied");
                Err(ApiError::Unauthorized)
            }
        }
    }

    async fn has(&self, name: RoleName, subject: &Subject) -> Result<bool, ApiError> {
        self.helper.has_role(name, &subject.roles).await
    }
}
