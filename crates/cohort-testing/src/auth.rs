//! Mock auth helpers for tests.
//!
//! The API authenticates callers with `Authorization: Bearer <access token>`. `MockAuth`
//! signs a real access token with a test secret so extractor and router tests run the
//! production validation path.

use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};
use uuid::Uuid;

use cohort_auth_types::token::{TokenKind, issue};

/// Secret shared by test helpers and the state under test.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-unit-tests-only";

/// Identity injected into test requests.
pub struct MockAuth {
    pub user_id: Uuid,
    pub secret: String,
}

impl MockAuth {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            secret: TEST_JWT_SECRET.to_owned(),
        }
    }

    /// Sign tokens with a different secret (e.g. to exercise signature rejection).
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = secret.to_owned();
        self
    }

    /// A signed access token for `user_id`.
    pub fn access_token(&self) -> String {
        issue(TokenKind::Access, Some(self.user_id), None, &self.secret)
            .expect("sign test access token")
            .token
    }

    /// Headers carrying `Authorization: Bearer <access token>`.
    pub fn headers(&self) -> HeaderMap {
        bearer_headers(&self.access_token())
    }
}

/// Headers carrying an arbitrary bearer token.
pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("valid header value"),
    );
    map
}
