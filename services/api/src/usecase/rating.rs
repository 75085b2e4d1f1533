use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::authz::{AccessPolicy, Action, Decision, Resource};
use crate::domain::repository::{
    DirectionRepository, RatingRepository, RoleRepository, UserRepository,
};
use crate::domain::types::{Direction, Rating, RatingTransaction};
use crate::error::{ApiError, Operation};
use crate::usecase::subject_of;

/// Accept a JSON integer or a numeric string.
pub fn parse_value_change(raw: &Value) -> Result<i32, ApiError> {
    let parsed = match raw {
        Value::Null => return Err(ApiError::MissingField("value_change")),
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };
    parsed.ok_or(ApiError::NotANumber("value_change"))
}

async fn load<D, Ra>(
    directions: &D,
    ratings: &Ra,
    rating_id: Uuid,
) -> Result<(Rating, Direction), ApiError>
where
    D: DirectionRepository,
    Ra: RatingRepository,
{
    let rating = ratings
        .find_by_id(rating_id)
        .await?
        .ok_or(ApiError::NotFound("rating"))?;
    let direction = directions
        .find_by_id(rating.direction_id)
        .await?
        .ok_or(ApiError::NotFound("direction"))?;
    Ok((rating, direction))
}

// ── GetRating ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RatingView {
    pub rating: Rating,
    /// `None` when the caller may not see the history.
    pub transactions: Option<Vec<RatingTransaction>>,
}

pub struct GetRatingUseCase<U, R, D, Ra>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
    Ra: RatingRepository,
{
    pub users: U,
    pub policy: AccessPolicy<R>,
    pub directions: D,
    pub ratings: Ra,
}

impl<U, R, D, Ra> GetRatingUseCase<U, R, D, Ra>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
    Ra: RatingRepository,
{
    pub async fn execute(&self, caller: Uuid, rating_id: Uuid) -> Result<RatingView, ApiError> {
        let subject = subject_of(&self.users, caller).await?;
        let (rating, direction) = load(&self.directions, &self.ratings, rating_id).await?;

        let resource = Resource::Rating {
            rating: &rating,
            direction: &direction,
        };
        let transactions = match self
            .policy
            .authorize(&subject, resource, Action::ViewRatingHistory)
            .await?
        {
            Decision::Allow => Some(self.ratings.transactions(rating.id).await?),
            Decision::Deny => None,
        };
        Ok(RatingView {
            rating,
            transactions,
        })
    }
}

// ── AddRatingDelta ───────────────────────────────────────────────────────────

pub struct AddRatingDeltaInput {
    pub value_change: Value,
    pub reason: Option<String>,
}

pub struct AddRatingDeltaUseCase<U, R, D, Ra>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
    Ra: RatingRepository,
{
    pub users: U,
    pub policy: AccessPolicy<R>,
    pub directions: D,
    pub ratings: Ra,
}

impl<U, R, D, Ra> AddRatingDeltaUseCase<U, R, D, Ra>
where
    U: UserRepository,
    R: RoleRepository,
    D: DirectionRepository,
    Ra: RatingRepository,
{
    /// Append a transaction and apply its delta. Returns the updated rating.
    pub async fn execute(
        &self,
        caller: Uuid,
        rating_id: Uuid,
        input: AddRatingDeltaInput,
    ) -> Result<(Rating, RatingTransaction), ApiError> {
        let subject = subject_of(&self.users, caller).await?;
        let (rating, direction) = load(&self.directions, &self.ratings, rating_id).await?;
        self.policy
            .ensure(
                &subject,
                Resource::Rating {
                    rating: &rating,
                    direction: &direction,
                },
                Action::AddRatingDelta,
            )
            .await?;

        let value_change = parse_value_change(&input.value_change)?;
        let reason = input
            .reason
            .map(|r| r.trim().to_owned())
            .filter(|r| !r.is_empty())
            .ok_or(ApiError::MissingField("reason"))?;

        let entry = RatingTransaction {
            id: Uuid::now_v7(),
            rating_id: rating.id,
            author_id: caller,
            value_change,
            reason,
            created_at: Utc::now(),
        };
        let updated = self
            .ratings
            .add_delta(&entry)
            .await
            .map_err(|e| e.during(Operation::RatingAdd))?;
        tracing::info!(
            rating_id = %rating.id,
            author_id = %caller,
            value_change,
            value = updated.value,
            "rating changed"
        );
        Ok((updated, entry))
    }
}
