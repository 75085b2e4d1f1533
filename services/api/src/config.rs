use crate::domain::authz::MentorAdminRule;

/// API service configuration loaded from environment variables.
#[derive(Debug)]
pub struct ApiConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// HMAC secret for signing every JWT family.
    pub jwt_secret: String,
    /// SMS gateway account id. Env var: `SMS_API_ID`.
    pub sms_api_id: String,
    /// SMS gateway send endpoint (default `https://sms.ru/sms/send`). Env var: `SMS_BASE_URL`.
    pub sms_base_url: String,
    /// TCP port to listen on (default 3000). Env var: `API_PORT`.
    pub api_port: u16,
    /// How direction mentorship and the admin role combine for approve, decline and
    /// rating changes. Env var: `MENTOR_ADMIN_RULE` (`either` | `both`, default `either`).
    pub mentor_admin_rule: MentorAdminRule,
}

pub const DEFAULT_SMS_BASE_URL: &str = "https://sms.ru/sms/send";

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET"),
            sms_api_id: std::env::var("SMS_API_ID").expect("SMS_API_ID"),
            sms_base_url: std::env::var("SMS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SMS_BASE_URL.to_owned()),
            api_port: std::env::var("API_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            mentor_admin_rule: std::env::var("MENTOR_ADMIN_RULE")
                .ok()
                .map(|v| v.parse().expect("MENTOR_ADMIN_RULE must be `either` or `both`"))
                .unwrap_or_default(),
        }
    }
}
