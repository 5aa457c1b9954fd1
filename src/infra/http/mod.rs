//! JSON HTTP surface: public reads, guest submissions and the admin console.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use error::ApiError;
pub use state::{Collaborators, HttpState};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use sqlx::Error as SqlxError;

use crate::application::error::ErrorReport;

use self::auth::{require_admin, require_session};
use self::middleware::{log_responses, set_request_context};

/// Multipart framing around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: HttpState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/posts", get(handlers::list_posts))
        .route("/api/posts/{id}", get(handlers::get_post))
        .route("/api/categories", get(handlers::list_categories))
        .route(
            "/api/categories/{id}/posts",
            get(handlers::list_category_posts),
        )
        .route("/api/episodes", get(handlers::list_episodes))
        .route("/api/episodes/{id}", get(handlers::get_episode));

    let upload_body_limit = state.upload_body_limit.saturating_add(MULTIPART_OVERHEAD);
    let session_routes = Router::new()
        .route("/api/submissions", post(handlers::submit_post))
        .route("/api/dashboard", get(handlers::dashboard))
        .route(
            "/api/uploads",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(
            "/api/admin/setup",
            get(handlers::setup_status).post(handlers::setup_grant),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let admin_routes = Router::new()
        .route("/api/admin/create-guest", post(handlers::create_guest))
        .route("/api/admin/getUserByEmail", post(handlers::get_user_by_email))
        .route("/api/admin/setAdminClaim", post(handlers::set_admin_claim))
        .route("/api/admin/posts", post(handlers::create_post))
        .route(
            "/api/admin/posts/{id}",
            patch(handlers::update_post).delete(handlers::delete_post),
        )
        .route("/api/admin/pending", get(handlers::list_pending))
        .route("/api/admin/pending/{id}", get(handlers::get_pending))
        .route(
            "/api/admin/pending/{id}/approve",
            post(handlers::approve_pending),
        )
        .route(
            "/api/admin/pending/{id}/reject",
            post(handlers::reject_pending),
        )
        .route("/api/admin/categories", post(handlers::create_category))
        .route(
            "/api/admin/categories/{id}",
            delete(handlers::delete_category),
        )
        .route("/api/admin/guests", get(handlers::list_guests))
        .route(
            "/api/admin/guests/{id}",
            patch(handlers::update_guest).delete(handlers::delete_guest),
        )
        .route("/api/admin/episodes", post(handlers::create_episode))
        .route(
            "/api/admin/episodes/{id}",
            patch(handlers::update_episode).delete(handlers::delete_episode),
        )
        .route("/api/admin/overview", get(handlers::overview))
        .route_layer(axum_middleware::from_fn(require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    public_routes
        .merge(session_routes)
        .merge(admin_routes)
        .fallback(not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health(State(state): State<HttpState>) -> Response {
    match state.db.as_ref() {
        Some(db) => db_health_response(db.health_check().await),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_probe_attaches_a_report() {
        let mut response = db_health_response(Err(SqlxError::PoolTimedOut));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let report = response
            .extensions_mut()
            .remove::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.source, "infra::http::db_health");
    }
}
