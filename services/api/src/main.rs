use sea_orm::Database;
use tracing::info;

use cohort_api::config::ApiConfig;
use cohort_api::infra::hasher::Argon2Hasher;
use cohort_api::infra::sms::HttpSmsGateway;
use cohort_api::router::build_router;
use cohort_api::state::AppState;

#[tokio::main]
async fn main() {
    cohort_core::tracing::init_tracing();

    let config = ApiConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let sms = HttpSmsGateway::new(config.sms_base_url.clone(), config.sms_api_id.clone())
        .expect("failed to build SMS gateway client");

    let state = AppState {
        db,
        jwt_secret: config.jwt_secret.clone(),
        sms,
        hasher: Argon2Hasher,
        rule: config.mentor_admin_rule,
    };

    let router = build_router(state);
    let http_addr = format!("0.0.0.0:{}", config.api_port);
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .expect("failed to bind");

    info!(rule = ?config.mentor_admin_rule, "api service listening on {http_addr}");
    axum::serve(listener, router).await.expect("server error");
}
