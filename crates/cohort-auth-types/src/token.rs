//! JWT issuing and validation.
//!
//! All tokens are HS512 JWTs signed with the service secret. A `kind` claim keeps the
//! token families apart so a refresh token can never be replayed as an access token.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access-token lifetime in seconds (30 minutes).
pub const ACCESS_TOKEN_EXP: u64 = 30 * 60;

/// Refresh-token lifetime in seconds (60 days).
pub const REFRESH_TOKEN_EXP: u64 = 60 * 24 * 60 * 60;

/// Phone-verification token lifetime in seconds (1 day).
pub const PHONE_TOKEN_EXP: u64 = 24 * 60 * 60;

/// Password-reset token lifetime in seconds (15 minutes).
pub const PASSWORD_RESET_TOKEN_EXP: u64 = 15 * 60;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Token family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    /// Proof that a phone number passed SMS verification; consumed by registration.
    Phone,
    /// Proof that a password-reset code was confirmed.
    PasswordReset,
}

impl TokenKind {
    pub fn lifetime_secs(self) -> u64 {
        match self {
            Self::Access => ACCESS_TOKEN_EXP,
            Self::Refresh => REFRESH_TOKEN_EXP,
            Self::Phone => PHONE_TOKEN_EXP,
            Self::PasswordReset => PASSWORD_RESET_TOKEN_EXP,
        }
    }
}

/// JWT claims payload.
///
/// | Field | Meaning |
/// |-------|---------|
/// | `sub` | user UUID (absent on phone tokens) |
/// | `kind` | [`TokenKind`] |
/// | `phone` | verified phone number (phone tokens only) |
/// | `jti` | random token id, keeps tokens issued in the same second distinct |
/// | `iat` | issue time, seconds since UNIX epoch |
/// | `exp` | expiration, seconds since UNIX epoch |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub kind: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub jti: String,
    #[serde(default)]
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    /// Parse `sub` as a user id.
    pub fn subject(&self) -> Result<Uuid, AuthError> {
        self.sub
            .as_deref()
            .and_then(|s| s.parse().ok())
            .ok_or(AuthError::Malformed)
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= now_secs()
    }
}

/// A freshly signed token with its expiration.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub exp: u64,
}

/// Errors returned by token validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("unexpected token kind")]
    WrongKind,
    #[error("failed to sign token")]
    Signing,
}

/// Seconds since the UNIX epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Sign a token of `kind` for an optional subject and phone.
pub fn issue(
    kind: TokenKind,
    subject: Option<Uuid>,
    phone: Option<&str>,
    secret: &str,
) -> Result<IssuedToken, AuthError> {
    let iat = now_secs();
    let exp = iat + kind.lifetime_secs();
    let claims = Claims {
        sub: subject.map(|id| id.to_string()),
        kind,
        phone: phone.map(str::to_owned),
        jti: Uuid::new_v4().to_string(),
        iat,
        exp,
    };
    let token = encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::Signing)?;
    Ok(IssuedToken { token, exp })
}

fn decode_claims(token: &str, secret: &str, check_exp: bool) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(ALGORITHM);
    validation.validate_exp = check_exp;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp"]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::Malformed,
    })?;

    Ok(data.claims)
}

/// Validate signature, expiry and kind.
pub fn validate(token: &str, secret: &str, kind: TokenKind) -> Result<Claims, AuthError> {
    let claims = decode_claims(token, secret, true)?;
    if claims.kind != kind {
        return Err(AuthError::WrongKind);
    }
    Ok(claims)
}

/// Validate signature and kind but leave expiry to the caller.
///
/// The refresh flow needs the claims of an expired refresh token to find and discard
/// the stored copy.
pub fn validate_ignoring_expiry(
    token: &str,
    secret: &str,
    kind: TokenKind,
) -> Result<Claims, AuthError> {
    let claims = decode_claims(token, secret, false)?;
    if claims.kind != kind {
        return Err(AuthError::WrongKind);
    }
    Ok(claims)
}

/// Identity carried by a validated access token.
#[derive(Debug, Clone, Copy)]
pub struct TokenInfo {
    pub user_id: Uuid,
    pub access_token_exp: u64,
}

/// Validate an access token, returning the caller's identity.
pub fn validate_access_token(token: &str, secret: &str) -> Result<TokenInfo, AuthError> {
    let claims = validate(token, secret, TokenKind::Access)?;
    Ok(TokenInfo {
        user_id: claims.subject()?,
        access_token_exp: claims.exp,
    })
}
