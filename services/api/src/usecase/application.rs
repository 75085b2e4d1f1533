//! Join-request lifecycle: apply, then approve or decline.
//!
//! An application row exists only while it is pending. Approval consumes it and, in the
//! same transaction, adds the direction membership and opens a zero rating; decline just
//! deletes it. Either way the row is consumed exactly once.

use chrono::Utc;
use uuid::Uuid;

use cohort_domain::role::RoleName;

use crate::domain::authz::{AccessPolicy, Action, Resource};
use crate::domain::repository::{
    ApplicationRepository, DirectionRepository, RoleRepository, UserRepository,
};
use crate::domain::types::{Application, Direction, Rating};
use crate::error::{ApiError, Operation};
use crate::usecase::subject_of;

// ── Apply ────────────────────────────────────────────────────────────────────

pub struct ApplyUseCase<U, R, D, A>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
    A: ApplicationRepository,
{
    pub users: U,
    pub policy: AccessPolicy<R>,
    pub directions: D,
    pub applications: A,
}

impl<U, R, D, A> ApplyUseCase<U, R, D, A>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
    A: ApplicationRepository,
{
    pub async fn execute(&self, caller: Uuid, direction_id: i32) -> Result<Application, ApiError> {
        let subject = subject_of(&self.users, caller).await?;
        self.policy
            .ensure(&subject, Resource::Catalog, Action::Apply)
            .await?;

        self.directions
            .find_by_id(direction_id)
            .await?
            .ok_or(ApiError::NotFound("direction"))?;
        if self
            .applications
            .find_pending(caller, direction_id)
            .await?
            .is_some()
        {
            return Err(ApiError::AlreadyApplied);
        }
        if self.directions.is_member(direction_id, caller).await? {
            return Err(ApiError::AlreadyInDirection);
        }

        let application = Application {
            id: Uuid::now_v7(),
            user_id: caller,
            direction_id,
            created_at: Utc::now(),
        };
        self.applications
            .create(&application)
            .await
            .map_err(|e| e.during(Operation::ApplicationCreate))?;
        tracing::info!(application_id = %application.id, direction_id, "application created");
        Ok(application)
    }
}

// ── ListApplications ─────────────────────────────────────────────────────────

pub struct ListApplicationsUseCase<U, R, A>
where
    U: UserRepository,
    R: RoleRepository,
    A: ApplicationRepository,
{
    pub users: U,
    pub policy: AccessPolicy<R>,
    pub applications: A,
}

impl<U, R, A> ListApplicationsUseCase<U, R, A>
where
    U: UserRepository,
    R: RoleRepository,
    A: ApplicationRepository,
{
    /// Admins see every pending application; mentors see those for directions they mentor.
    pub async fn execute(&self, caller: Uuid) -> Result<Vec<Application>, ApiError> {
        let subject = subject_of(&self.users, caller).await?;
        self.policy
            .ensure(&subject, Resource::Catalog, Action::ListApplications)
            .await?;

        let admin = self
            .policy
            .helper
            .has_role(RoleName::Admin, &subject.roles)
            .await?;
        if admin {
            return self.applications.list_all().await;
        }
        let ids: Vec<i32> = subject.mentored.iter().map(|d| d.id).collect();
        self.applications.list_for_directions(&ids).await
    }
}

// ── Approve / Decline ────────────────────────────────────────────────────────

/// Outcome of resolving an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Approve,
    Decline,
}

impl Resolution {
    fn operation(self) -> Operation {
        match self {
            Self::Approve => Operation::ApplicationApprove,
            Self::Decline => Operation::ApplicationDecline,
        }
    }
}

pub struct ResolveApplicationUseCase<U, R, D, A>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
    A: ApplicationRepository,
{
    pub users: U,
    pub policy: AccessPolicy<R>,
    pub directions: D,
    pub applications: A,
}

impl<U, R, D, A> ResolveApplicationUseCase<U, R, D, A>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
    A: ApplicationRepository,
{
    /// Approve or decline. Returns the opened rating on approval.
    pub async fn execute(
        &self,
        caller: Uuid,
        application_id: Uuid,
        resolution: Resolution,
    ) -> Result<Option<Rating>, ApiError> {
        let subject = subject_of(&self.users, caller).await?;
        let application = self
            .applications
            .find_by_id(application_id)
            .await?
            .ok_or(ApiError::NotFound("application"))?;
        let direction = self.direction_of(&application).await?;
        self.policy
            .ensure(
                &subject,
                Resource::Direction(&direction),
                Action::ResolveApplication,
            )
            .await?;

        let op = resolution.operation();
        let rating = match resolution {
            Resolution::Approve => {
                let rating = Rating::opening(application.user_id, direction.id, Utc::now());
                self.applications
                    .approve(&application, &rating)
                    .await
                    .map_err(|e| e.during(op))?;
                Some(rating)
            }
            Resolution::Decline => {
                let deleted = self
                    .applications
                    .decline(application.id)
                    .await
                    .map_err(|e| e.during(op))?;
                if !deleted {
                    return Err(ApiError::NotFound("application"));
                }
                None
            }
        };
        tracing::info!(
            application_id = %application.id,
            resolved_by = %caller,
            ?resolution,
            "application resolved"
        );
        Ok(rating)
    }

    async fn direction_of(&self, application: &Application) -> Result<Direction, ApiError> {
        self.directions
            .find_by_id(application.direction_id)
            .await?
            .ok_or(ApiError::NotFound("direction"))
    }
}
