//! Bearer access-token extractor.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use uuid::Uuid;

use cohort_auth_types::bearer::bearer_token;
use cohort_auth_types::token::validate_access_token;

use crate::error::ApiError;
use crate::state::AppState;
use crate::usecase::auth::access_error;

/// Caller resolved from `Authorization: Bearer <access token>`.
///
/// Missing or invalid tokens reject with 114, expired ones with 118.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
}

pub fn identity_from_headers(headers: &HeaderMap, secret: &str) -> Result<Identity, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::TokenRequired)?;
    let info = validate_access_token(&token, secret).map_err(access_error)?;
    Ok(Identity {
        user_id: info.user_id,
    })
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    // Validation is synchronous; the returned future holds no borrow of `parts`.
    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let identity = identity_from_headers(&parts.headers, &state.jwt_secret);
        async move { identity }
    }
}
