use anyhow::anyhow;
use axum::extract::{Path, State};
use serde::Serialize;

use cohort_core::envelope::{ApiResponse, Message};

use crate::domain::types::Application;
use crate::error::ApiError;
use crate::handlers::identity::Identity;
use crate::handlers::parse_uuid;
use crate::handlers::rating::RatingResponse;
use crate::state::AppState;
use crate::usecase::application::{
    ListApplicationsUseCase, Resolution, ResolveApplicationUseCase,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub uuid: String,
    pub user_uuid: String,
    pub direction_id: i32,
    #[serde(serialize_with = "cohort_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Application> for ApplicationResponse {
    fn from(a: Application) -> Self {
        Self {
            uuid: a.id.to_string(),
            user_uuid: a.user_id.to_string(),
            direction_id: a.direction_id,
            created_at: a.created_at,
        }
    }
}

// ── GET /applications ────────────────────────────────────────────────────────

pub async fn list_applications(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<ApplicationResponse>>, ApiError> {
    let usecase = ListApplicationsUseCase {
        users: state.user_repo(),
        policy: state.policy(),
        applications: state.application_repo(),
    };
    let applications = usecase.execute(identity.user_id).await?;
    Ok(ApiResponse::ok(
        applications.into_iter().map(Into::into).collect(),
    ))
}

// ── POST /applications/{uuid}/approve | decline ──────────────────────────────

async fn resolve(
    identity: Identity,
    state: AppState,
    raw_id: &str,
    resolution: Resolution,
) -> Result<Option<RatingResponse>, ApiError> {
    let application_id = parse_uuid(raw_id)?;
    let usecase = ResolveApplicationUseCase {
        users: state.user_repo(),
        policy: state.policy(),
        directions: state.direction_repo(),
        applications: state.application_repo(),
    };
    let rating = usecase
        .execute(identity.user_id, application_id, resolution)
        .await?;
    Ok(rating.map(Into::into))
}

pub async fn approve_application(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RatingResponse>, ApiError> {
    let rating = resolve(identity, state, &id, Resolution::Approve)
        .await?
        .ok_or_else(|| anyhow!("approval returned no rating"))?;
    Ok(ApiResponse::ok(rating))
}

pub async fn decline_application(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Message>, ApiError> {
    resolve(identity, state, &id, Resolution::Decline).await?;
    Ok(ApiResponse::ok(Message::new("application declined")))
}
