//! Session gating: bearer token to [`Session`], then the admin check.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::application::identity::{Session, SessionError};

use super::error::ApiError;
use super::state::HttpState;

/// Verifies the bearer token and stores the [`Session`] on the request, and
/// on the response for the logging layer.
pub async fn require_session(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_token(request.headers().get(AUTHORIZATION)) {
        Some(token) => token,
        None => return ApiError::from(SessionError::Missing).into_response(),
    };

    let session = match state.sessions.verify(token) {
        Ok(session) => session,
        Err(err) => return ApiError::from(err).into_response(),
    };

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(session);
    response
}

/// Runs after [`require_session`]; lets only sessions holding the `admin` claim through.
pub async fn require_admin(request: Request<Body>, next: Next) -> Response {
    match request.extensions().get::<Session>() {
        Some(session) if session.is_admin => next.run(request).await,
        Some(_) => ApiError::forbidden().into_response(),
        None => ApiError::from(SessionError::Missing).into_response(),
    }
}

fn extract_token(header: Option<&HeaderValue>) -> Option<&str> {
    let raw = header?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
