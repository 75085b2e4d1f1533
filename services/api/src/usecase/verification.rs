//! SMS-code flows: registration, password reset and phone change.

use anyhow::anyhow;
use chrono::Utc;
use rand::RngExt;
use uuid::Uuid;

use cohort_auth_types::token::{self, TokenKind};
use cohort_domain::validate::{validate_password, validate_phone, validate_verification_code};

use crate::domain::repository::{PasswordHasher, SmsSender, UserRepository, VerificationRepository};
use crate::domain::types::{CODE_RANGE, CodeRequest, PhoneVerification, VerificationPurpose};
use crate::error::{ApiError, Operation};

fn generate_code() -> String {
    rand::rng().random_range(CODE_RANGE).to_string()
}

fn sms_text(code: &str) -> String {
    format!("Your verification code: {code}")
}

/// Record a code request under the rate limits and text the code to `recipient`.
async fn send_code<V, S>(
    verifications: &V,
    sms: &S,
    request: CodeRequest,
    recipient: &str,
) -> Result<(), ApiError>
where
    V: VerificationRepository,
    S: SmsSender,
{
    let record = verifications
        .record_request(&request)
        .await
        .map_err(|e| e.during(Operation::VerificationCreate))?;
    sms.send(recipient, &sms_text(&record.code))
        .await
        .map_err(|e| e.during(Operation::SmsSend))?;
    tracing::info!(
        purpose = request.purpose.as_str(),
        attempts = record.attempts,
        "verification code sent"
    );
    Ok(())
}

/// Look up and check a submitted code. The record is returned for the caller to consume.
async fn check_code<V: VerificationRepository>(
    verifications: &V,
    purpose: VerificationPurpose,
    phone: &str,
    code: &str,
) -> Result<PhoneVerification, ApiError> {
    if !validate_verification_code(code) {
        return Err(ApiError::BadVerificationCode);
    }
    let record = verifications
        .find(purpose, phone)
        .await?
        .ok_or(ApiError::VerificationNotFound)?;
    if record.code != code {
        return Err(ApiError::WrongVerificationCode);
    }
    Ok(record)
}

/// Delete a checked record. Losing the race to a concurrent confirm of the same code is a 111.
async fn consume<V: VerificationRepository>(
    verifications: &V,
    record: &PhoneVerification,
) -> Result<(), ApiError> {
    let removed = verifications
        .delete(record.id)
        .await
        .map_err(|e| e.during(Operation::PhoneVerification))?;
    if !removed {
        return Err(ApiError::VerificationNotFound);
    }
    Ok(())
}

fn sign_phone_token(
    kind: TokenKind,
    user_id: Option<Uuid>,
    phone: &str,
    secret: &str,
) -> Result<String, ApiError> {
    token::issue(kind, user_id, Some(phone), secret)
        .map(|t| t.token)
        .map_err(|e| ApiError::Internal(anyhow!(e).context("sign verification token")))
}

// ── Registration ─────────────────────────────────────────────────────────────

pub struct RequestRegistrationCodeUseCase<U, V, S>
where
    U: UserRepository,
    V: VerificationRepository,
    S: SmsSender,
{
    pub users: U,
    pub verifications: V,
    pub sms: S,
}

impl<U, V, S> RequestRegistrationCodeUseCase<U, V, S>
where
    U: UserRepository,
    V: VerificationRepository,
    S: SmsSender,
{
    pub async fn execute(&self, phone: &str) -> Result<(), ApiError> {
        if !validate_phone(phone) {
            return Err(ApiError::BadPhone);
        }
        if self.users.find_by_phone(phone).await?.is_some() {
            return Err(ApiError::UserExists);
        }
        let request = CodeRequest {
            purpose: VerificationPurpose::Registration,
            phone_number: phone.to_owned(),
            new_phone: None,
            code: generate_code(),
        };
        send_code(&self.verifications, &self.sms, request, phone).await
    }
}

pub struct ConfirmRegistrationCodeUseCase<V: VerificationRepository> {
    pub verifications: V,
    pub jwt_secret: String,
}

impl<V: VerificationRepository> ConfirmRegistrationCodeUseCase<V> {
    /// Returns a phone token proving ownership of `phone`.
    pub async fn execute(&self, phone: &str, code: &str) -> Result<String, ApiError> {
        let record = check_code(
            &self.verifications,
            VerificationPurpose::Registration,
            phone,
            code,
        )
        .await?;
        consume(&self.verifications, &record).await?;
        sign_phone_token(TokenKind::Phone, None, &record.phone_number, &self.jwt_secret)
    }
}

// ── Password reset ───────────────────────────────────────────────────────────

pub struct RequestPasswordResetUseCase<U, V, S>
where
    U: UserRepository,
    V: VerificationRepository,
    S: SmsSender,
{
    pub users: U,
    pub verifications: V,
    pub sms: S,
}

impl<U, V, S> RequestPasswordResetUseCase<U, V, S>
where
    U: UserRepository,
    V: VerificationRepository,
    S: SmsSender,
{
    pub async fn execute(&self, phone: &str) -> Result<(), ApiError> {
        if !validate_phone(phone) {
            return Err(ApiError::BadPhone);
        }
        self.users
            .find_by_phone(phone)
            .await?
            .ok_or(ApiError::NotFound("user"))?;
        let request = CodeRequest {
            purpose: VerificationPurpose::PasswordReset,
            phone_number: phone.to_owned(),
            new_phone: None,
            code: generate_code(),
        };
        send_code(&self.verifications, &self.sms, request, phone).await
    }
}

pub struct ConfirmPasswordResetCodeUseCase<U, V>
where
    U: UserRepository,
    V: VerificationRepository,
{
    pub users: U,
    pub verifications: V,
    pub jwt_secret: String,
}

impl<U, V> ConfirmPasswordResetCodeUseCase<U, V>
where
    U: UserRepository,
    V: VerificationRepository,
{
    /// Returns a short-lived password-reset token for the phone's owner.
    pub async fn execute(&self, phone: &str, code: &str) -> Result<String, ApiError> {
        let record = check_code(
            &self.verifications,
            VerificationPurpose::PasswordReset,
            phone,
            code,
        )
        .await?;
        let user = self
            .users
            .find_by_phone(&record.phone_number)
            .await?
            .ok_or(ApiError::NotFound("user"))?;
        consume(&self.verifications, &record).await?;
        sign_phone_token(
            TokenKind::PasswordReset,
            Some(user.id),
            &record.phone_number,
            &self.jwt_secret,
        )
    }
}

pub struct SetNewPasswordInput {
    pub reset_token: String,
    pub password: String,
}

pub struct SetNewPasswordUseCase<U, H>
where
    U: UserRepository,
    H: PasswordHasher,
{
    pub users: U,
    pub hasher: H,
    pub jwt_secret: String,
}

impl<U, H> SetNewPasswordUseCase<U, H>
where
    U: UserRepository,
    H: PasswordHasher,
{
    pub async fn execute(&self, input: SetNewPasswordInput) -> Result<(), ApiError> {
        let claims = token::validate(
            &input.reset_token,
            &self.jwt_secret,
            TokenKind::PasswordReset,
        )
        .map_err(|_| ApiError::Unauthorized)?;
        let user_id = claims.subject().map_err(|_| ApiError::Unauthorized)?;

        if !validate_password(&input.password) {
            return Err(ApiError::BadPassword);
        }
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound("user"))?;
        // A reset token is spent once the account changes after it was issued.
        if user.updated_at.timestamp() >= claims.iat as i64 {
            return Err(ApiError::Unauthorized);
        }

        let hash = self.hasher.hash(&input.password)?;
        self.users
            .update_password(user_id, &hash, Utc::now())
            .await
            .map_err(|e| e.during(Operation::PasswordChange))?;
        tracing::info!(%user_id, "password changed");
        Ok(())
    }
}

// ── Phone change ─────────────────────────────────────────────────────────────

pub struct RequestPhoneChangeUseCase<U, V, S>
where
    U: UserRepository,
    V: VerificationRepository,
    S: SmsSender,
{
    pub users: U,
    pub verifications: V,
    pub sms: S,
}

impl<U, V, S> RequestPhoneChangeUseCase<U, V, S>
where
    U: UserRepository,
    V: VerificationRepository,
    S: SmsSender,
{
    pub async fn execute(&self, user_id: Uuid, new_phone: &str) -> Result<(), ApiError> {
        if !validate_phone(new_phone) {
            return Err(ApiError::BadPhone);
        }
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound("user"))?;
        if self.users.find_by_phone(new_phone).await?.is_some() {
            return Err(ApiError::UserExists);
        }
        let request = CodeRequest {
            purpose: VerificationPurpose::PhoneChange,
            phone_number: user.phone_number,
            new_phone: Some(new_phone.to_owned()),
            code: generate_code(),
        };
        send_code(&self.verifications, &self.sms, request, new_phone).await
    }
}

pub struct ConfirmPhoneChangeUseCase<U, V>
where
    U: UserRepository,
    V: VerificationRepository,
{
    pub users: U,
    pub verifications: V,
}

impl<U, V> ConfirmPhoneChangeUseCase<U, V>
where
    U: UserRepository,
    V: VerificationRepository,
{
    /// Returns the new phone number.
    pub async fn execute(&self, user_id: Uuid, code: &str) -> Result<String, ApiError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound("user"))?;
        let record = check_code(
            &self.verifications,
            VerificationPurpose::PhoneChange,
            &user.phone_number,
            code,
        )
        .await?;
        let new_phone = record
            .new_phone
            .ok_or_else(|| anyhow!("phone change record without target number"))
            .map_err(|e| ApiError::Internal(e).during(Operation::PhoneVerification))?;

        // The number may have been taken since the code was sent.
        if self.users.find_by_phone(&new_phone).await?.is_some() {
            return Err(ApiError::UserExists);
        }
        self.users
            .change_phone(user_id, &new_phone, record.id)
            .await
            .map_err(|e| e.during(Operation::PhoneVerification))?;
        tracing::info!(%user_id, "phone number changed");
        Ok(new_phone)
    }
}
