use uuid::Uuid;

use cohort_domain::pagination::Window;

use crate::domain::authz::{AccessPolicy, Action, Resource};
use crate::domain::repository::{
    DirectionRepository, RatingRepository, RoleRepository, UserRepository,
};
use crate::domain::types::{Direction, DirectionPatch, NewDirection, Rating, UserSummary};
use crate::error::{ApiError, Operation};
use crate::usecase::subject_of;

// ── ListDirections ───────────────────────────────────────────────────────────

pub struct ListDirectionsUseCase<D: DirectionRepository> {
    pub directions: D,
}

impl<D: DirectionRepository> ListDirectionsUseCase<D> {
    pub async fn execute(&self) -> Result<Vec<Direction>, ApiError> {
        self.directions.list().await
    }
}

// ── GetDirection ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct DirectionDetail {
    pub direction: Direction,
    pub mentor: Option<UserSummary>,
    pub participants: Vec<UserSummary>,
}

pub struct GetDirectionUseCase<D, U>
where
    D: DirectionRepository,
    U: UserRepository,
{
    pub directions: D,
    pub users: U,
}

impl<D, U> GetDirectionUseCase<D, U>
where
    D: DirectionRepository,
    U: UserRepository,
{
    pub async fn execute(&self, id: i32) -> Result<DirectionDetail, ApiError> {
        let direction = self
            .directions
            .find_by_id(id)
            .await?
            .ok_or(ApiError::NotFound("direction"))?;
        let mentor = self
            .users
            .summaries(&[direction.mentor_id])
            .await?
            .into_iter()
            .next();
        let ids = self.directions.participant_ids(id).await?;
        let participants = self.users.summaries(&ids).await?;
        Ok(DirectionDetail {
            direction,
            mentor,
            participants,
        })
    }
}

// ── CreateDirection ──────────────────────────────────────────────────────────

pub struct CreateDirectionInput {
    pub name: String,
    pub description: String,
    pub mentor_id: Uuid,
}

pub struct CreateDirectionUseCase<U, R, D>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
{
    pub users: U,
    pub policy: AccessPolicy<R>,
    pub directions: D,
}

impl<U, R, D> CreateDirectionUseCase<U, R, D>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
{
    pub async fn execute(
        &self,
        caller: Uuid,
        input: CreateDirectionInput,
    ) -> Result<Direction, ApiError> {
        let subject = subject_of(&self.users, caller).await?;
        self.policy
            .ensure(&subject, Resource::Catalog, Action::ManageDirections)
            .await?;

        if input.name.trim().is_empty() {
            return Err(ApiError::MissingField("name"));
        }
        if self.directions.find_by_name(&input.name).await?.is_some() {
            return Err(ApiError::DirectionExists);
        }
        self.users
            .find_by_id(input.mentor_id)
            .await?
            .ok_or(ApiError::NotFound("mentor"))?;

        let direction = self
            .directions
            .create(&NewDirection {
                name: input.name,
                description: input.description,
                mentor_id: input.mentor_id,
            })
            .await
            .map_err(|e| e.during(Operation::DirectionCreate))?;
        tracing::info!(direction_id = direction.id, "direction created");
        Ok(direction)
    }
}

// ── EditDirection ────────────────────────────────────────────────────────────

pub struct EditDirectionUseCase<U, R, D>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
{
    pub users: U,
    pub policy: AccessPolicy<R>,
    pub directions: D,
}

impl<U, R, D> EditDirectionUseCase<U, R, D>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
{
    pub async fn execute(
        &self,
        caller: Uuid,
        id: i32,
        patch: DirectionPatch,
    ) -> Result<Direction, ApiError> {
        let subject = subject_of(&self.users, caller).await?;
        self.policy
            .ensure(&subject, Resource::Catalog, Action::ManageDirections)
            .await?;

        let current = self
            .directions
            .find_by_id(id)
            .await?
            .ok_or(ApiError::NotFound("direction"))?;
        if patch.is_empty() {
            return Err(ApiError::MissingField("name, description or mentor"));
        }
        if let Some(name) = &patch.name {
            if name != &current.name && self.directions.find_by_name(name).await?.is_some() {
                return Err(ApiError::DirectionExists);
            }
        }
        if let Some(mentor_id) = patch.mentor_id {
            self.users
                .find_by_id(mentor_id)
                .await?
                .ok_or(ApiError::NotFound("mentor"))?;
        }

        self.directions
            .update(id, patch)
            .await
            .map_err(|e| e.during(Operation::DirectionEdit))
    }
}

// ── DirectionRatings ─────────────────────────────────────────────────────────

pub struct DirectionRatingsUseCase<D, Ra>
where
    D: DirectionRepository,
    Ra: RatingRepository,
{
    pub directions: D,
    pub ratings: Ra,
}

impl<D, Ra> DirectionRatingsUseCase<D, Ra>
where
    D: DirectionRepository,
    Ra: RatingRepository,
{
    pub async fn execute(&self, id: i32, window: Window) -> Result<Vec<Rating>, ApiError> {
        self.directions
            .find_by_id(id)
            .await?
            .ok_or(ApiError::NotFound("direction"))?;
        self.ratings.list_for_direction(id, window).await
    }
}
