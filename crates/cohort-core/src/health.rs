use axum::http::StatusCode;

/// Handler for `GET /healthz`: process liveness.
///
/// Readiness depends on the database and lives in the service router.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
