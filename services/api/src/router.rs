use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use cohort_core::health::healthz;
use cohort_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    achievement::{get_achievement, give_achievement, list_achievements},
    application::{approve_application, decline_application, list_applications},
    auth::{login, refresh_tokens, register, reset_tokens},
    direction::{
        apply, create_direction, direction_ratings, edit_direction, get_direction,
        list_directions,
    },
    health::readyz,
    rating::{add_rating_delta, get_rating},
    user::{edit_profile, get_own_profile, get_profile, grant_role},
    verification::{
        confirm_password_reset_code, confirm_phone_change, confirm_registration_code,
        request_password_reset, request_phone_change, request_registration_code,
        set_new_password,
    },
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Auth
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh-tokens", post(refresh_tokens))
        .route("/auth/reset-tokens", get(reset_tokens))
        // Phone verification
        .route("/auth/verification", post(request_registration_code))
        .route("/auth/verification/code", post(confirm_registration_code))
        .route("/auth/password/reset", post(request_password_reset))
        .route("/auth/password/reset/code", post(confirm_password_reset_code))
        .route("/auth/password/reset/confirm", post(set_new_password))
        .route("/auth/phone/change", post(request_phone_change))
        .route("/auth/phone/change/code", post(confirm_phone_change))
        // Directions
        .route("/directions", get(list_directions).post(create_direction))
        .route("/directions/apply", post(apply))
        .route("/directions/{id}", get(get_direction).patch(edit_direction))
        .route("/directions/{id}/ratings", get(direction_ratings))
        // Applications
        .route("/applications", get(list_applications))
        .route("/applications/{id}/approve", post(approve_application))
        .route("/applications/{id}/decline", post(decline_application))
        // Ratings
        .route("/ratings/{id}", get(get_rating).post(add_rating_delta))
        // Users
        .route("/users/profile", get(get_own_profile).patch(edit_profile))
        .route("/users/profile/{id}", get(get_profile))
        .route("/users/{id}/roles", post(grant_role))
        // Achievements
        .route("/achievements", get(list_achievements).post(give_achievement))
        .route("/achievements/{id}", get(get_achievement))
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
