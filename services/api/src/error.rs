use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use cohort_core::envelope::error_response;

/// Server-side operation a failure happened in. Each maps to a 2xx error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    RoleCreation,
    Registration,
    AchievementGive,
    ApplicationApprove,
    ApplicationDecline,
    ProfileEdit,
    RatingAdd,
    ApplicationCreate,
    DirectionCreate,
    DirectionEdit,
    Login,
    TokenRemoval,
    TokenRefresh,
    TokenReset,
    SmsSend,
    PhoneVerification,
    VerificationCreate,
    PasswordChange,
}

impl Operation {
    pub fn code(self) -> u16 {
        match self {
            Self::RoleCreation => 200,
            Self::Registration => 201,
            Self::AchievementGive => 202,
            Self::ApplicationApprove => 203,
            Self::ApplicationDecline => 204,
            Self::ProfileEdit => 205,
            Self::RatingAdd => 206,
            Self::ApplicationCreate => 207,
            Self::DirectionCreate => 208,
            Self::DirectionEdit => 209,
            Self::Login => 210,
            Self::TokenRemoval => 211,
            Self::TokenRefresh => 212,
            Self::TokenReset => 213,
            Self::SmsSend => 214,
            Self::PhoneVerification => 215,
            Self::VerificationCreate => 216,
            Self::PasswordChange => 217,
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::RoleCreation => "ROLE_CREATION",
            Self::Registration => "REGISTRATION",
            Self::AchievementGive => "ACHIEVEMENT_GIVE",
            Self::ApplicationApprove => "APPLICATION_APPROVE",
            Self::ApplicationDecline => "APPLICATION_DECLINE",
            Self::ProfileEdit => "PROFILE_EDIT",
            Self::RatingAdd => "RATING_ADD",
            Self::ApplicationCreate => "APPLICATION_CREATE",
            Self::DirectionCreate => "DIRECTION_CREATE",
            Self::DirectionEdit => "DIRECTION_EDIT",
            Self::Login => "LOGIN_FAIL",
            Self::TokenRemoval => "TOKEN_REMOVAL",
            Self::TokenRefresh => "TOKEN_REFRESH",
            Self::TokenReset => "TOKEN_RESET",
            Self::SmsSend => "SMS_SEND",
            Self::PhoneVerification => "PHONE_VERIFICATION",
            Self::VerificationCreate => "VERIFICATION_CREATE",
            Self::PasswordChange => "PASSWORD_CHANGE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Self::RoleCreation => "role creation",
            Self::Registration => "registration",
            Self::AchievementGive => "achievement grant",
            Self::ApplicationApprove => "application approval",
            Self::ApplicationDecline => "application decline",
            Self::ProfileEdit => "profile update",
            Self::RatingAdd => "rating update",
            Self::ApplicationCreate => "application submission",
            Self::DirectionCreate => "direction creation",
            Self::DirectionEdit => "direction update",
            Self::Login => "login",
            Self::TokenRemoval => "token removal",
            Self::TokenRefresh => "token refresh",
            Self::TokenReset => "token reset",
            Self::SmsSend => "sms delivery",
            Self::PhoneVerification => "phone verification",
            Self::VerificationCreate => "verification request",
            Self::PasswordChange => "password change",
        };
        write!(f, "{what} failed")
    }
}

/// Every error the API can answer with. The numeric code is part of the public contract.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("wrong password")]
    WrongPassword,
    #[error("password must be 6 to 24 characters long")]
    BadPassword,
    #[error("invalid registration token")]
    BadRegistrationToken,
    #[error("invalid refresh token")]
    BadRefreshToken,
    #[error("invalid email")]
    BadEmail,
    #[error("user already exists")]
    UserExists,
    #[error("direction already exists")]
    DirectionExists,
    #[error("verification code must be 5 digits")]
    BadVerificationCode,
    #[error("invalid phone number")]
    BadPhone,
    #[error("wrong verification code")]
    WrongVerificationCode,
    #[error("verification not found")]
    VerificationNotFound,
    #[error("daily sms limit reached")]
    SmsDailyLimit,
    #[error("too many sms requests, try again in a minute")]
    SmsMinuteLimit,
    #[error("access token required")]
    TokenRequired,
    #[error("invalid uuid")]
    BadUuid,
    #[error("already a member of this direction")]
    AlreadyInDirection,
    #[error("application already submitted")]
    AlreadyApplied,
    #[error("access token expired")]
    TokenExpired,
    #[error("{0} must be a number")]
    NotANumber(&'static str),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Failed(Operation, anyhow::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Tag an untagged internal failure with the operation that was running.
    ///
    /// Client errors pass through unchanged.
    pub fn during(self, op: Operation) -> Self {
        match self {
            Self::Internal(e) => Self::Failed(op, e),
            other => other,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::WrongPassword => 100,
            Self::BadPassword => 101,
            Self::BadRegistrationToken => 102,
            Self::BadRefreshToken => 103,
            Self::BadEmail => 104,
            Self::UserExists => 105,
            Self::DirectionExists => 106,
            Self::BadVerificationCode => 108,
            Self::BadPhone => 109,
            Self::WrongVerificationCode => 110,
            Self::VerificationNotFound => 111,
            Self::SmsDailyLimit => 112,
            Self::SmsMinuteLimit => 113,
            Self::TokenRequired => 114,
            Self::BadUuid => 115,
            Self::AlreadyInDirection => 116,
            Self::AlreadyApplied => 117,
            Self::TokenExpired => 118,
            Self::NotANumber(_) => 119,
            Self::MissingField(_) => 120,
            Self::Unauthorized => 401,
            Self::NotFound(_) => 404,
            Self::Failed(op, _) => op.code(),
            Self::Internal(_) => 250,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::WrongPassword => "WRONG_PASSWORD",
            Self::BadPassword => "BAD_PASSWORD",
            Self::BadRegistrationToken => "BAD_REGISTRATION_TOKEN",
            Self::BadRefreshToken => "BAD_REFRESH_TOKEN",
            Self::BadEmail => "BAD_EMAIL",
            Self::UserExists => "USER_EXISTS",
            Self::DirectionExists => "DIRECTION_EXISTS",
            Self::BadVerificationCode => "BAD_VERIFICATION_CODE",
            Self::BadPhone => "BAD_PHONE",
            Self::WrongVerificationCode => "WRONG_VERIFICATION_CODE",
            Self::VerificationNotFound => "VERIFICATION_NOTFOUND",
            Self::SmsDailyLimit => "SMS_DAILY_LIMIT",
            Self::SmsMinuteLimit => "SMS_MINUTE_LIMIT",
            Self::TokenRequired => "TOKEN_REQUIRED",
            Self::BadUuid => "BAD_UUID",
            Self::AlreadyInDirection => "ALREADY_IN_DIRECTION",
            Self::AlreadyApplied => "ALREADY_APPLIED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::NotANumber(_) => "NOT_A_NUMBER",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Failed(op, _) => op.kind(),
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::UserExists
            | Self::DirectionExists
            | Self::AlreadyInDirection
            | Self::AlreadyApplied => StatusCode::CONFLICT,
            Self::VerificationNotFound | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::SmsDailyLimit | Self::SmsMinuteLimit => StatusCode::TOO_MANY_REQUESTS,
            Self::TokenRequired | Self::TokenExpired | Self::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::Failed(..) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Server-side failures are captured here; client errors are covered by TraceLayer.
        match &self {
            Self::Failed(op, e) => {
                tracing::error!(
                    error = format!("{e:#}"),
                    code = op.code(),
                    kind = op.kind(),
                    "operation failed"
                );
            }
            Self::Internal(e) => {
                tracing::error!(
                    error = format!("{e:#}"),
                    code = 250,
                    kind = "INTERNAL",
                    "internal error"
                );
            }
            _ => {}
        }
        error_response(self.status(), self.code(), &self.to_string())
    }
}
