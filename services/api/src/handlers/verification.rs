use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use cohort_core::envelope::{ApiResponse, Message};

use crate::error::ApiError;
use crate::handlers::identity::Identity;
use crate::handlers::required;
use crate::state::AppState;
use crate::usecase::verification::{
    ConfirmPasswordResetCodeUseCase, ConfirmPhoneChangeUseCase, ConfirmRegistrationCodeUseCase,
    RequestPasswordResetUseCase, RequestPhoneChangeUseCase, RequestRegistrationCodeUseCase,
    SetNewPasswordInput, SetNewPasswordUseCase,
};

// ── Request / response types ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PhoneRequest {
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct PhoneCodeRequest {
    pub phone: Option<String>,
    pub code: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneTokenResponse {
    pub phone_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTokenResponse {
    pub reset_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneChangedResponse {
    pub phone_number: String,
}

// ── POST /auth/verification ──────────────────────────────────────────────────

pub async fn request_registration_code(
    State(state): State<AppState>,
    Json(body): Json<PhoneRequest>,
) -> Result<ApiResponse<Message>, ApiError> {
    let phone = required(body.phone, "phone")?;
    let usecase = RequestRegistrationCodeUseCase {
        users: state.user_repo(),
        verifications: state.verification_repo(),
        sms: state.sms.clone(),
    };
    usecase.execute(&phone).await?;
    Ok(ApiResponse::ok(Message::new("verification code sent")))
}

// ── POST /auth/verification/code ─────────────────────────────────────────────

pub async fn confirm_registration_code(
    State(state): State<AppState>,
    Json(body): Json<PhoneCodeRequest>,
) -> Result<ApiResponse<PhoneTokenResponse>, ApiError> {
    let phone = required(body.phone, "phone")?;
    let code = required(body.code, "code")?;
    let usecase = ConfirmRegistrationCodeUseCase {
        verifications: state.verification_repo(),
        jwt_secret: state.jwt_secret.clone(),
    };
    let phone_token = usecase.execute(&phone, &code).await?;
    Ok(ApiResponse::ok(PhoneTokenResponse { phone_token }))
}

// ── POST /auth/password/reset ────────────────────────────────────────────────

pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<PhoneRequest>,
) -> Result<ApiResponse<Message>, ApiError> {
    let phone = required(body.phone, "phone")?;
    let usecase = RequestPasswordResetUseCase {
        users: state.user_repo(),
        verifications: state.verification_repo(),
        sms: state.sms.clone(),
    };
    usecase.execute(&phone).await?;
    Ok(ApiResponse::ok(Message::new("verification code sent")))
}

// ── POST /auth/password/reset/code ───────────────────────────────────────────

pub async fn confirm_password_reset_code(
    State(state): State<AppState>,
    Json(body): Json<PhoneCodeRequest>,
) -> Result<ApiResponse<ResetTokenResponse>, ApiError> {
    let phone = required(body.phone, "phone")?;
    let code = required(body.code, "code")?;
    let usecase = ConfirmPasswordResetCodeUseCase {
        users: state.user_repo(),
        verifications: state.verification_repo(),
        jwt_secret: state.jwt_secret.clone(),
    };
    let reset_token = usecase.execute(&phone, &code).await?;
    Ok(ApiResponse::ok(ResetTokenResponse { reset_token }))
}

// ── POST /auth/password/reset/confirm ────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetNewPasswordRequest {
    pub reset_token: Option<String>,
    pub password: Option<String>,
}

pub async fn set_new_password(
    State(state): State<AppState>,
    Json(body): Json<SetNewPasswordRequest>,
) -> Result<ApiResponse<Message>, ApiError> {
    let usecase = SetNewPasswordUseCase {
        users: state.user_repo(),
        hasher: state.hasher,
        jwt_secret: state.jwt_secret.clone(),
    };
    usecase
        .execute(SetNewPasswordInput {
            reset_token: required(body.reset_token, "resetToken")?,
            password: required(body.password, "password")?,
        })
        .await?;
    Ok(ApiResponse::ok(Message::new("password changed")))
}

// ── POST /auth/phone/change ──────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneChangeRequest {
    pub new_phone: Option<String>,
}

pub async fn request_phone_change(
    identity: Identity,
    State(state): State<AppState>,
    Json(body): Json<PhoneChangeRequest>,
) -> Result<ApiResponse<Message>, ApiError> {
    let new_phone = required(body.new_phone, "newPhone")?;
    let usecase = RequestPhoneChangeUseCase {
        users: state.user_repo(),
        verifications: state.verification_repo(),
        sms: state.sms.clone(),
    };
    usecase.execute(identity.user_id, &new_phone).await?;
    Ok(ApiResponse::ok(Message::new("verification code sent")))
}

// ── POST /auth/phone/change/code ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CodeRequest {
    pub code: Option<String>,
}

pub async fn confirm_phone_change(
    identity: Identity,
    State(state): State<AppState>,
    Json(body): Json<CodeRequest>,
) -> Result<ApiResponse<PhoneChangedResponse>, ApiError> {
    let code = required(body.code, "code")?;
    let usecase = ConfirmPhoneChangeUseCase {
        users: state.user_repo(),
        verifications: state.verification_repo(),
    };
    let phone_number = usecase.execute(identity.user_id, &code).await?;
    Ok(ApiResponse::ok(PhoneChangedResponse { phone_number }))
}
