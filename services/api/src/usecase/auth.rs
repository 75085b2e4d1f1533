use anyhow::anyhow;
use chrono::Utc;
use uuid::Uuid;

use cohort_auth_types::token::{self, AuthError, TokenKind};
use cohort_domain::role::RoleName;
use cohort_domain::validate::validate_password;

use crate::domain::repository::{
    PasswordHasher, RefreshTokenRepository, RoleRepository, UserRepository,
};
use crate::domain::types::{RefreshTokenRecord, User};
use crate::error::{ApiError, Operation};

/// Access + refresh pair handed to a client after login or refresh.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token expiry, seconds since UNIX epoch.
    pub expires_in: u64,
}

fn sign(kind: TokenKind, user_id: Uuid, secret: &str) -> Result<token::IssuedToken, ApiError> {
    token::issue(kind, Some(user_id), None, secret)
        .map_err(|e| ApiError::Internal(anyhow!(e).context("sign token")))
}

/// Issue a fresh pair and the refresh-token record to persist.
pub fn issue_pair(
    user_id: Uuid,
    secret: &str,
) -> Result<(TokenPair, RefreshTokenRecord), ApiError> {
    let access = sign(TokenKind::Access, user_id, secret)?;
    let refresh = sign(TokenKind::Refresh, user_id, secret)?;
    let record = RefreshTokenRecord {
        id: Uuid::now_v7(),
        user_id,
        token: refresh.token.clone(),
        created_at: Utc::now(),
    };
    let pair = TokenPair {
        access_token: access.token,
        refresh_token: refresh.token,
        expires_in: access.exp,
    };
    Ok((pair, record))
}

// ── Register ─────────────────────────────────────────────────────────────────

pub struct RegisterInput {
    pub phone_token: String,
    pub password: String,
}

pub struct RegisterUseCase<U, R, H>
where
    U: UserRepository,
    R: RoleRepository,
    H: PasswordHasher,
{
    pub users: U,
    pub roles: R,
    pub hasher: H,
    pub jwt_secret: String,
}

impl<U, R, H> RegisterUseCase<U, R, H>
where
    U: UserRepository,
    R: RoleRepository,
    H: PasswordHasher,
{
    pub async fn execute(&self, input: RegisterInput) -> Result<User, ApiError> {
        let claims = token::validate(&input.phone_token, &self.jwt_secret, TokenKind::Phone)
            .map_err(|_| ApiError::BadRegistrationToken)?;
        let phone = claims.phone.ok_or(ApiError::BadRegistrationToken)?;

        if !validate_password(&input.password) {
            return Err(ApiError::BadPassword);
        }
        if self.users.find_by_phone(&phone).await?.is_some() {
            return Err(ApiError::UserExists);
        }

        let role = match self.roles.find_by_name(RoleName::User.as_str()).await? {
            Some(role) => role,
            None => self
                .roles
                .create(RoleName::User.as_str())
                .await
                .map_err(|e| e.during(Operation::RoleCreation))?,
        };

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            phone_number: phone,
            password_hash: self.hasher.hash(&input.password)?,
            created_at: now,
            updated_at: now,
        };
        self.users
            .create_with_profile(&user, role.id)
            .await
            .map_err(|e| e.during(Operation::Registration))?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }
}

// ── Login ────────────────────────────────────────────────────────────────────

pub struct LoginInput {
    pub phone: String,
    pub password: String,
}

pub struct LoginUseCase<U, T, H>
where
    U: UserRepository,
    T: RefreshTokenRepository,
    H: PasswordHasher,
{
    pub users: U,
    pub tokens: T,
    pub hasher: H,
    pub jwt_secret: String,
}

impl<U, T, H> LoginUseCase<U, T, H>
where
    U: UserRepository,
    T: RefreshTokenRepository,
    H: PasswordHasher,
{
    pub async fn execute(&self, input: LoginInput) -> Result<TokenPair, ApiError> {
        let user = self
            .users
            .find_by_phone(&input.phone)
            .await?
            .ok_or(ApiError::NotFound("user"))?;

        let matches = self
            .hasher
            .verify(&input.password, &user.password_hash)
            .map_err(|e| e.during(Operation::Login))?;
        if !matches {
            return Err(ApiError::WrongPassword);
        }

        let (pair, record) = issue_pair(user.id, &self.jwt_secret)?;
        self.tokens
            .store(&record)
            .await
            .map_err(|e| e.during(Operation::Login))?;
        Ok(pair)
    }
}

// ── RefreshTokens ────────────────────────────────────────────────────────────

pub struct RefreshTokensUseCase<T: RefreshTokenRepository> {
    pub tokens: T,
    pub jwt_secret: String,
}

impl<T: RefreshTokenRepository> RefreshTokensUseCase<T> {
    pub async fn execute(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        // Expiry is checked after the lookup so an expired token can still be discarded.
        let claims =
            token::validate_ignoring_expiry(refresh_token, &self.jwt_secret, TokenKind::Refresh)
                .map_err(|_| ApiError::BadRefreshToken)?;
        let user_id = claims.subject().map_err(|_| ApiError::BadRefreshToken)?;

        let stored = self
            .tokens
            .find(user_id, refresh_token)
            .await?
            .ok_or(ApiError::NotFound("refresh token"))?;

        if claims.is_expired() {
            self.tokens
                .delete(stored.id)
                .await
                .map_err(|e| e.during(Operation::TokenRemoval))?;
            return Err(ApiError::BadRefreshToken);
        }

        let (pair, record) = issue_pair(user_id, &self.jwt_secret)?;
        self.tokens
            .rotate(stored.id, &record)
            .await
            .map_err(|e| e.during(Operation::TokenRefresh))?;
        Ok(pair)
    }
}

// ── ResetTokens ──────────────────────────────────────────────────────────────

pub struct ResetTokensUseCase<T: RefreshTokenRepository> {
    pub tokens: T,
}

impl<T: RefreshTokenRepository> ResetTokensUseCase<T> {
    pub async fn execute(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let removed = self
            .tokens
            .delete_all(user_id)
            .await
            .map_err(|e| e.during(Operation::TokenRemoval))?;
        tracing::info!(%user_id, removed, "refresh tokens reset");
        Ok(removed)
    }
}

/// Map a token failure on an authenticated route to its error code.
pub fn access_error(err: AuthError) -> ApiError {
    match err {
        AuthError::Expired => ApiError::TokenExpired,
        _ => ApiError::TokenRequired,
    }
}
