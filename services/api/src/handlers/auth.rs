use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use cohort_core::envelope::{ApiResponse, Created};

use crate::error::ApiError;
use crate::handlers::identity::Identity;
use crate::handlers::required;
use crate::state::AppState;
use crate::usecase::auth::{
    LoginInput, LoginUseCase, RefreshTokensUseCase, RegisterInput, RegisterUseCase,
    ResetTokensUseCase, TokenPair,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredResponse {
    pub uuid: String,
    pub phone_number: String,
    #[serde(serialize_with = "cohort_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct ResetTokensResponse {
    pub removed: u64,
}

// ── POST /auth/register ──────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub phone_token: Option<String>,
    pub password: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Created<RegisteredResponse>, ApiError> {
    let usecase = RegisterUseCase {
        users: state.user_repo(),
        roles: state.role_repo(),
        hasher: state.hasher,
        jwt_secret: state.jwt_secret.clone(),
    };
    let user = usecase
        .execute(RegisterInput {
            phone_token: required(body.phone_token, "phoneToken")?,
            password: required(body.password, "password")?,
        })
        .await?;
    Ok(Created(RegisteredResponse {
        uuid: user.id.to_string(),
        phone_number: user.phone_number,
        created_at: user.created_at,
    }))
}

// ── POST /auth/login ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub phone: Option<String>,
    pub password: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiResponse<TokenPairResponse>, ApiError> {
    let usecase = LoginUseCase {
        users: state.user_repo(),
        tokens: state.refresh_token_repo(),
        hasher: state.hasher,
        jwt_secret: state.jwt_secret.clone(),
    };
    let pair = usecase
        .execute(LoginInput {
            phone: required(body.phone, "phone")?,
            password: required(body.password, "password")?,
        })
        .await?;
    Ok(ApiResponse::ok(pair.into()))
}

// ── POST /auth/refresh-tokens ────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokensRequest {
    pub refresh_token: Option<String>,
}

pub async fn refresh_tokens(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokensRequest>,
) -> Result<ApiResponse<TokenPairResponse>, ApiError> {
    let refresh_token = required(body.refresh_token, "refreshToken")?;
    let usecase = RefreshTokensUseCase {
        tokens: state.refresh_token_repo(),
        jwt_secret: state.jwt_secret.clone(),
    };
    let pair = usecase.execute(&refresh_token).await?;
    Ok(ApiResponse::ok(pair.into()))
}

// ── GET /auth/reset-tokens ───────────────────────────────────────────────────

pub async fn reset_tokens(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<ApiResponse<ResetTokensResponse>, ApiError> {
    let usecase = ResetTokensUseCase {
        tokens: state.refresh_token_repo(),
    };
    let removed = usecase.execute(identity.user_id).await?;
    Ok(ApiResponse::ok(ResetTokensResponse { removed }))
}
