use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use cohort_core::envelope::ApiResponse;

use crate::domain::types::{Achievement, UserAchievement};
use crate::error::ApiError;
use crate::handlers::identity::Identity;
use crate::handlers::{parse_id, parse_uuid, required};
use crate::state::AppState;
use crate::usecase::achievement::{
    GetAchievementUseCase, GiveAchievementUseCase, ListAchievementsUseCase,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AchievementResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
}

impl From<Achievement> for AchievementResponse {
    fn from(a: Achievement) -> Self {
        Self {
            id: a.id,
            name: a.name,
            description: a.description,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievementResponse {
    #[serde(flatten)]
    pub achievement: AchievementResponse,
    #[serde(serialize_with = "cohort_core::serde::to_rfc3339_ms")]
    pub granted_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserAchievement> for UserAchievementResponse {
    fn from(ua: UserAchievement) -> Self {
        Self {
            achievement: ua.achievement.into(),
            granted_at: ua.granted_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantedResponse {
    pub achievement: AchievementResponse,
    pub user_uuid: String,
}

// ── GET /achievements ────────────────────────────────────────────────────────

pub async fn list_achievements(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<AchievementResponse>>, ApiError> {
    let usecase = ListAchievementsUseCase {
        achievements: state.achievement_repo(),
    };
    let achievements = usecase.execute().await?;
    Ok(ApiResponse::ok(
        achievements.into_iter().map(Into::into).collect(),
    ))
}

// ── GET /achievements/{id} ───────────────────────────────────────────────────

pub async fn get_achievement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<AchievementResponse>, ApiError> {
    let id = parse_id(&id)?;
    let usecase = GetAchievementUseCase {
        achievements: state.achievement_repo(),
    };
    Ok(ApiResponse::ok(usecase.execute(id).await?.into()))
}

// ── POST /achievements ───────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiveAchievementRequest {
    pub achievement_id: Option<i32>,
    pub user_uuid: Option<String>,
}

pub async fn give_achievement(
    identity: Identity,
    State(state): State<AppState>,
    Json(body): Json<GiveAchievementRequest>,
) -> Result<ApiResponse<GrantedResponse>, ApiError> {
    let achievement_id = required(body.achievement_id, "achievementId")?;
    let recipient = parse_uuid(&required(body.user_uuid, "userUuid")?)?;
    let usecase = GiveAchievementUseCase {
        users: state.user_repo(),
        policy: state.policy(),
        achievements: state.achievement_repo(),
    };
    let achievement = usecase
        .execute(identity.user_id, achievement_id, recipient)
        .await?;
    Ok(ApiResponse::ok(GrantedResponse {
        achievement: achievement.into(),
        user_uuid: recipient.to_string(),
    }))
}
