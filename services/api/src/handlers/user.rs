use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cohort_core::envelope::ApiResponse;

use crate::domain::types::{Profile, ProfilePatch, Role};
use crate::error::ApiError;
use crate::handlers::achievement::UserAchievementResponse;
use crate::handlers::direction::DirectionResponse;
use crate::handlers::identity::Identity;
use crate::handlers::rating::{RatingResponse, RatingTransactionResponse};
use crate::handlers::{parse_uuid, required};
use crate::state::AppState;
use crate::usecase::user::{EditProfileUseCase, GetProfileUseCase, GrantRoleUseCase, ProfileView};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFieldsResponse {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    pub photo_url: Option<String>,
}

impl From<Profile> for ProfileFieldsResponse {
    fn from(p: Profile) -> Self {
        Self {
            first_name: p.first_name,
            last_name: p.last_name,
            email: p.email,
            contact: p.contact,
            photo_url: p.photo_url,
        }
    }
}

#[derive(Serialize)]
pub struct RoleResponse {
    pub id: i32,
    pub name: String,
}

impl From<Role> for RoleResponse {
    fn from(r: Role) -> Self {
        Self {
            id: r.id,
            name: r.name,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub profile: ProfileFieldsResponse,
    pub roles: Vec<RoleResponse>,
    pub directions: Vec<DirectionResponse>,
    pub mentored_directions: Vec<DirectionResponse>,
    pub ratings: Vec<RatingResponse>,
    pub achievements: Vec<UserAchievementResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_transactions: Option<Vec<RatingTransactionResponse>>,
    #[serde(serialize_with = "cohort_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProfileView> for ProfileResponse {
    fn from(v: ProfileView) -> Self {
        Self {
            uuid: v.user_id.to_string(),
            phone_number: v.phone_number,
            profile: v.profile.into(),
            roles: v.roles.into_iter().map(Into::into).collect(),
            directions: v.joined.into_iter().map(Into::into).collect(),
            mentored_directions: v.mentored.into_iter().map(Into::into).collect(),
            ratings: v.ratings.into_iter().map(Into::into).collect(),
            achievements: v.achievements.into_iter().map(Into::into).collect(),
            rating_transactions: v
                .authored_transactions
                .map(|ts| ts.into_iter().map(Into::into).collect()),
            created_at: v.created_at,
        }
    }
}

async fn load_profile(
    state: &AppState,
    viewer: Uuid,
    target: Uuid,
) -> Result<ProfileResponse, ApiError> {
    let usecase = GetProfileUseCase {
        users: state.user_repo(),
        policy: state.policy(),
        directions: state.direction_repo(),
        ratings: state.rating_repo(),
        achievements: state.achievement_repo(),
    };
    Ok(usecase.execute(viewer, target).await?.into())
}

// ── GET /users/profile ───────────────────────────────────────────────────────

pub async fn get_own_profile(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<ApiResponse<ProfileResponse>, ApiError> {
    let profile = load_profile(&state, identity.user_id, identity.user_id).await?;
    Ok(ApiResponse::ok(profile))
}

// ── GET /users/profile/{uuid} ────────────────────────────────────────────────

pub async fn get_profile(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<ProfileResponse>, ApiError> {
    let target = parse_uuid(&id)?;
    let profile = load_profile(&state, identity.user_id, target).await?;
    Ok(ApiResponse::ok(profile))
}

// ── PATCH /users/profile ─────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub photo_url: Option<String>,
}

pub async fn edit_profile(
    identity: Identity,
    State(state): State<AppState>,
    Json(body): Json<EditProfileRequest>,
) -> Result<ApiResponse<ProfileFieldsResponse>, ApiError> {
    let usecase = EditProfileUseCase {
        users: state.user_repo(),
    };
    let profile = usecase
        .execute(
            identity.user_id,
            ProfilePatch {
                first_name: body.first_name,
                last_name: body.last_name,
                email: body.email,
                contact: body.contact,
                photo_url: body.photo_url,
            },
        )
        .await?;
    Ok(ApiResponse::ok(profile.into()))
}

// ── POST /users/{uuid}/roles ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct GrantRoleRequest {
    pub role: Option<String>,
}

pub async fn grant_role(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<GrantRoleRequest>,
) -> Result<ApiResponse<RoleResponse>, ApiError> {
    let target = parse_uuid(&id)?;
    let role = required(body.role, "role")?;
    let usecase = GrantRoleUseCase {
        users: state.user_repo(),
        policy: state.policy(),
    };
    let role = usecase.execute(identity.user_id, target, &role).await?;
    Ok(ApiResponse::ok(role.into()))
}
