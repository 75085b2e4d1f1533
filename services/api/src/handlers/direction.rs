use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use cohort_core::envelope::{ApiResponse, Created};
use cohort_domain::pagination::WindowQuery;

use crate::domain::types::{Direction, DirectionPatch, UserSummary};
use crate::error::ApiError;
use crate::handlers::application::ApplicationResponse;
use crate::handlers::identity::Identity;
use crate::handlers::rating::RatingResponse;
use crate::handlers::{parse_id, parse_uuid, required};
use crate::state::AppState;
use crate::usecase::application::ApplyUseCase;
use crate::usecase::direction::{
    CreateDirectionInput, CreateDirectionUseCase, DirectionRatingsUseCase, EditDirectionUseCase,
    GetDirectionUseCase, ListDirectionsUseCase,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub mentor_uuid: String,
}

impl From<Direction> for DirectionResponse {
    fn from(d: Direction) -> Self {
        Self {
            id: d.id,
            name: d.name,
            description: d.description,
            mentor_uuid: d.mentor_id.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryResponse {
    pub uuid: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
}

impl From<UserSummary> for UserSummaryResponse {
    fn from(u: UserSummary) -> Self {
        Self {
            uuid: u.id.to_string(),
            first_name: u.first_name,
            last_name: u.last_name,
            photo_url: u.photo_url,
        }
    }
}

#[derive(Serialize)]
pub struct DirectionDetailResponse {
    #[serde(flatten)]
    pub direction: DirectionResponse,
    pub mentor: Option<UserSummaryResponse>,
    pub participants: Vec<UserSummaryResponse>,
}

// ── GET /directions ──────────────────────────────────────────────────────────

pub async fn list_directions(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<DirectionResponse>>, ApiError> {
    let usecase = ListDirectionsUseCase {
        directions: state.direction_repo(),
    };
    let directions = usecase.execute().await?;
    Ok(ApiResponse::ok(
        directions.into_iter().map(Into::into).collect(),
    ))
}

// ── GET /directions/{id} ─────────────────────────────────────────────────────

pub async fn get_direction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<DirectionDetailResponse>, ApiError> {
    let id = parse_id(&id)?;
    let usecase = GetDirectionUseCase {
        directions: state.direction_repo(),
        users: state.user_repo(),
    };
    let detail = usecase.execute(id).await?;
    Ok(ApiResponse::ok(DirectionDetailResponse {
        direction: detail.direction.into(),
        mentor: detail.mentor.map(Into::into),
        participants: detail.participants.into_iter().map(Into::into).collect(),
    }))
}

// ── POST /directions ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDirectionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub mentor_uuid: Option<String>,
}

pub async fn create_direction(
    identity: Identity,
    State(state): State<AppState>,
    Json(body): Json<CreateDirectionRequest>,
) -> Result<Created<DirectionResponse>, ApiError> {
    let input = CreateDirectionInput {
        name: required(body.name, "name")?,
        description: required(body.description, "description")?,
        mentor_id: parse_uuid(&required(body.mentor_uuid, "mentorUuid")?)?,
    };
    let usecase = CreateDirectionUseCase {
        users: state.user_repo(),
        policy: state.policy(),
        directions: state.direction_repo(),
    };
    let direction = usecase.execute(identity.user_id, input).await?;
    Ok(Created(direction.into()))
}

// ── PATCH /directions/{id} ───────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditDirectionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub mentor_uuid: Option<String>,
}

pub async fn edit_direction(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<EditDirectionRequest>,
) -> Result<ApiResponse<DirectionResponse>, ApiError> {
    let id = parse_id(&id)?;
    let patch = DirectionPatch {
        name: body.name,
        description: body.description,
        mentor_id: body.mentor_uuid.as_deref().map(parse_uuid).transpose()?,
    };
    let usecase = EditDirectionUseCase {
        users: state.user_repo(),
        policy: state.policy(),
        directions: state.direction_repo(),
    };
    let direction = usecase.execute(identity.user_id, id, patch).await?;
    Ok(ApiResponse::ok(direction.into()))
}

// ── GET /directions/{id}/ratings ─────────────────────────────────────────────

pub async fn direction_ratings(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(window): Query<WindowQuery>,
) -> Result<ApiResponse<Vec<RatingResponse>>, ApiError> {
    let id = parse_id(&id)?;
    let usecase = DirectionRatingsUseCase {
        directions: state.direction_repo(),
        ratings: state.rating_repo(),
    };
    let ratings = usecase.execute(id, window.into()).await?;
    Ok(ApiResponse::ok(ratings.into_iter().map(Into::into).collect()))
}

// ── POST /directions/apply ───────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub direction_id: Option<i32>,
}

pub async fn apply(
    identity: Identity,
    State(state): State<AppState>,
    Json(body): Json<ApplyRequest>,
) -> Result<Created<ApplicationResponse>, ApiError> {
    let direction_id = required(body.direction_id, "directionId")?;
    let usecase = ApplyUseCase {
        users: state.user_repo(),
        policy: state.policy(),
        directions: state.direction_repo(),
        applications: state.application_repo(),
    };
    let application = usecase.execute(identity.user_id, direction_id).await?;
    Ok(Created(application.into()))
}
