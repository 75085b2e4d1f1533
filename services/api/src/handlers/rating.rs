use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use cohort_core::envelope::ApiResponse;

use crate::domain::types::{Rating, RatingTransaction};
use crate::error::ApiError;
use crate::handlers::identity::Identity;
use crate::handlers::parse_uuid;
use crate::state::AppState;
use crate::usecase::rating::{AddRatingDeltaInput, AddRatingDeltaUseCase, GetRatingUseCase};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub uuid: String,
    pub user_uuid: String,
    pub direction_id: i32,
    pub value: i32,
    #[serde(serialize_with = "cohort_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Rating> for RatingResponse {
    fn from(r: Rating) -> Self {
        Self {
            uuid: r.id.to_string(),
            user_uuid: r.user_id.to_string(),
            direction_id: r.direction_id,
            value: r.value,
            created_at: r.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingTransactionResponse {
    pub uuid: String,
    pub rating_uuid: String,
    pub author_uuid: String,
    pub value_change: i32,
    pub reason: String,
    #[serde(serialize_with = "cohort_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<RatingTransaction> for RatingTransactionResponse {
    fn from(t: RatingTransaction) -> Self {
        Self {
            uuid: t.id.to_string(),
            rating_uuid: t.rating_id.to_string(),
            author_uuid: t.author_id.to_string(),
            value_change: t.value_change,
            reason: t.reason,
            created_at: t.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct RatingDetailResponse {
    #[serde(flatten)]
    pub rating: RatingResponse,
    /// Omitted when the caller may not see the history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<RatingTransactionResponse>>,
}

#[derive(Serialize)]
pub struct RatingChangedResponse {
    pub rating: RatingResponse,
    pub transaction: RatingTransactionResponse,
}

// ── GET /ratings/{uuid} ──────────────────────────────────────────────────────

pub async fn get_rating(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RatingDetailResponse>, ApiError> {
    let rating_id = parse_uuid(&id)?;
    let usecase = GetRatingUseCase {
        users: state.user_repo(),
        policy: state.policy(),
        directions: state.direction_repo(),
        ratings: state.rating_repo(),
    };
    let view = usecase.execute(identity.user_id, rating_id).await?;
    Ok(ApiResponse::ok(RatingDetailResponse {
        rating: view.rating.into(),
        transactions: view
            .transactions
            .map(|ts| ts.into_iter().map(Into::into).collect()),
    }))
}

// ── POST /ratings/{uuid} ─────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRatingDeltaRequest {
    #[serde(default)]
    pub value_change: serde_json::Value,
    pub reason: Option<String>,
}

pub async fn add_rating_delta(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AddRatingDeltaRequest>,
) -> Result<ApiResponse<RatingChangedResponse>, ApiError> {
    let rating_id = parse_uuid(&id)?;
    let usecase = AddRatingDeltaUseCase {
        users: state.user_repo(),
        policy: state.policy(),
        directions: state.direction_repo(),
        ratings: state.rating_repo(),
    };
    let (rating, transaction) = usecase
        .execute(
            identity.user_id,
            rating_id,
            AddRatingDeltaInput {
                value_change: body.value_change,
                reason: body.reason,
            },
        )
        .await?;
    Ok(ApiResponse::ok(RatingChangedResponse {
        rating: rating.into(),
        transaction: transaction.into(),
    }))
}
