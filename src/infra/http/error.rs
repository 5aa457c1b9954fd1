//! JSON error envelope shared by every route: `{"error": "<message>"}`.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::accounts::AccountError;
use crate::application::categories::CategoryError;
use crate::application::dashboard::DashboardError;
use crate::application::episodes::EpisodeError;
use crate::application::error::ErrorReport;
use crate::application::guests::GuestError;
use crate::application::identity::{IdentityError, SessionError};
use crate::application::pagination::PaginationError;
use crate::application::publication::PublicationError;
use crate::application::repos::RepoError;
use crate::application::submissions::SubmissionError;
use crate::application::uploads::UploadError;
use crate::domain::error::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(source: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let report = ErrorReport::from_message(source, status, message.clone());
        Self {
            status,
            message,
            report,
        }
    }

    /// Public `message`, with the full error chain kept for the response log.
    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
        error: &dyn std::error::Error,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("infra::http", StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("infra::http::auth", StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden() -> Self {
        Self::new("infra::http::auth", StatusCode::FORBIDDEN, "Forbidden")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("infra::http", StatusCode::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.message,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

fn internal(
    source: &'static str,
    message: &'static str,
    error: &dyn std::error::Error,
) -> ApiError {
    ApiError::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, message, error)
}

pub fn repo_to_api(source: &'static str, err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { .. } => {
            ApiError::from_error(source, StatusCode::CONFLICT, "Duplicate record", &err)
        }
        RepoError::NotFound => {
            ApiError::from_error(source, StatusCode::NOT_FOUND, "Not found", &err)
        }
        RepoError::Pagination(ref inner) => {
            ApiError::from_error(source, StatusCode::BAD_REQUEST, "Invalid cursor", inner)
        }
        RepoError::InvalidInput { ref message } => {
            ApiError::from_error(source, StatusCode::BAD_REQUEST, message.clone(), &err)
        }
        RepoError::Timeout => ApiError::from_error(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            &err,
        ),
        RepoError::Integrity { .. } | RepoError::Persistence(_) => {
            internal(source, "Internal server error", &err)
        }
    }
}

fn domain_to_api(source: &'static str, err: DomainError) -> ApiError {
    match err {
        DomainError::NotFound { .. } => {
            ApiError::from_error(source, StatusCode::NOT_FOUND, err.to_string(), &err)
        }
        DomainError::Validation { ref message } => {
            ApiError::from_error(source, StatusCode::BAD_REQUEST, message.clone(), &err)
        }
        DomainError::Transition { .. } => {
            ApiError::from_error(source, StatusCode::CONFLICT, err.to_string(), &err)
        }
    }
}

fn pagination_to_api(source: &'static str, err: PaginationError) -> ApiError {
    ApiError::from_error(source, StatusCode::BAD_REQUEST, "Invalid cursor", &err)
}

fn identity_to_api(source: &'static str, err: IdentityError) -> ApiError {
    match err {
        IdentityError::EmailExists => {
            ApiError::from_error(source, StatusCode::CONFLICT, err.to_string(), &err)
        }
        IdentityError::UserNotFound => {
            ApiError::from_error(source, StatusCode::NOT_FOUND, "User not found", &err)
        }
        IdentityError::Rejected(ref message) => {
            ApiError::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, message.clone(), &err)
        }
        IdentityError::Transport(_) | IdentityError::NotConfigured => {
            internal(source, "Identity service unavailable", &err)
        }
    }
}

/// Every body rejection is a 400, including axum's 415 and 422.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::from_error(
            "infra::http::body",
            StatusCode::BAD_REQUEST,
            rejection.body_text(),
            &rejection,
        )
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::from_error(
            "infra::http::path",
            StatusCode::BAD_REQUEST,
            "Invalid identifier",
            &rejection,
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::from_error(
            "infra::http::query",
            StatusCode::BAD_REQUEST,
            rejection.body_text(),
            &rejection,
        )
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let source = "infra::http::auth";
        match err {
            SessionError::Missing => ApiError::unauthorized("Authentication required"),
            SessionError::Invalid => {
                ApiError::from_error(source, StatusCode::UNAUTHORIZED, "Invalid session", &err)
            }
            SessionError::Expired => {
                ApiError::from_error(source, StatusCode::UNAUTHORIZED, "Session expired", &err)
            }
            SessionError::NotConfigured => {
                internal(source, "Authentication is not configured", &err)
            }
        }
    }
}

impl From<CategoryError> for ApiError {
    fn from(err: CategoryError) -> Self {
        let source = "infra::http::categories";
        match err {
            CategoryError::ConstraintViolation(message) => {
                ApiError::new(source, StatusCode::BAD_REQUEST, message)
            }
            CategoryError::Duplicate(_) => {
                ApiError::from_error(source, StatusCode::CONFLICT, err.to_string(), &err)
            }
            CategoryError::NotFound => {
                ApiError::new(source, StatusCode::NOT_FOUND, "Category not found")
            }
            CategoryError::Repo(err) => repo_to_api(source, err),
        }
    }
}

impl From<GuestError> for ApiError {
    fn from(err: GuestError) -> Self {
        let source = "infra::http::guests";
        match err {
            GuestError::ConstraintViolation(message) => {
                ApiError::new(source, StatusCode::BAD_REQUEST, message)
            }
            GuestError::NotFound => ApiError::new(source, StatusCode::NOT_FOUND, "Guest not found"),
            GuestError::Identity(err) => identity_to_api(source, err),
            GuestError::Pagination(err) => pagination_to_api(source, err),
            GuestError::ProfileWrite(ref inner) => {
                internal(source, "Failed to create user profile", inner)
            }
            GuestError::Repo(err) => repo_to_api(source, err),
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        let source = "infra::http::submissions";
        match err {
            SubmissionError::ConstraintViolation(message) => {
                ApiError::new(source, StatusCode::BAD_REQUEST, message)
            }
            SubmissionError::NotFound => {
                ApiError::new(source, StatusCode::NOT_FOUND, "Submission not found")
            }
            SubmissionError::AlreadyReviewed => {
                ApiError::from_error(source, StatusCode::CONFLICT, err.to_string(), &err)
            }
            SubmissionError::Domain(err) => domain_to_api(source, err),
            SubmissionError::Render(err) => internal(source, "Failed to render content", &err),
            SubmissionError::Pagination(err) => pagination_to_api(source, err),
            SubmissionError::Category(err) => err.into(),
            SubmissionError::Repo(err) => repo_to_api(source, err),
        }
    }
}

impl From<PublicationError> for ApiError {
    fn from(err: PublicationError) -> Self {
        let source = "infra::http::posts";
        match err {
            PublicationError::ConstraintViolation(message) => {
                ApiError::new(source, StatusCode::BAD_REQUEST, message)
            }
            PublicationError::NotFound => {
                ApiError::new(source, StatusCode::NOT_FOUND, "Post not found")
            }
            PublicationError::Domain(err) => domain_to_api(source, err),
            PublicationError::Render(err) => internal(source, "Failed to render content", &err),
            PublicationError::Pagination(err) => pagination_to_api(source, err),
            PublicationError::Category(err) => err.into(),
            PublicationError::Repo(err) => repo_to_api(source, err),
        }
    }
}

impl From<EpisodeError> for ApiError {
    fn from(err: EpisodeError) -> Self {
        let source = "infra::http::episodes";
        match err {
            EpisodeError::ConstraintViolation(message) => {
                ApiError::new(source, StatusCode::BAD_REQUEST, message)
            }
            EpisodeError::NotFound => {
                ApiError::new(source, StatusCode::NOT_FOUND, "Episode not found")
            }
            EpisodeError::Repo(err) => repo_to_api(source, err),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        let source = "infra::http::accounts";
        match err {
            AccountError::ConstraintViolation(message) => {
                ApiError::new(source, StatusCode::BAD_REQUEST, message)
            }
            AccountError::UserNotFound => {
                ApiError::new(source, StatusCode::NOT_FOUND, "User not found")
            }
            AccountError::SetupForbidden | AccountError::SetupDisabled => {
                ApiError::from_error(source, StatusCode::FORBIDDEN, err.to_string(), &err)
            }
            AccountError::Guest(err) => err.into(),
            AccountError::Identity(err) => identity_to_api(source, err),
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Repo(err) => repo_to_api("infra::http::dashboard", err),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        let source = "infra::http::uploads";
        match err {
            UploadError::Empty | UploadError::NotAnImage(_) => {
                ApiError::from_error(source, StatusCode::BAD_REQUEST, err.to_string(), &err)
            }
            UploadError::TooLarge { .. } => {
                ApiError::from_error(source, StatusCode::PAYLOAD_TOO_LARGE, err.to_string(), &err)
            }
            UploadError::Rejected(_) | UploadError::Transport(_) | UploadError::NotConfigured => {
                internal(source, "Image upload failed", &err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::rejection::MissingJsonContentType;

    #[test]
    fn provisioning_store_failure_hides_detail() {
        let err = ApiError::from(GuestError::ProfileWrite(RepoError::Timeout));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Failed to create user profile");
    }

    #[test]
    fn missing_fields_are_bad_requests() {
        let err = ApiError::from(GuestError::ConstraintViolation("Missing required fields"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Missing required fields");
    }

    #[test]
    fn double_review_is_a_conflict() {
        let err = ApiError::from(SubmissionError::AlreadyReviewed);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn body_rejections_are_bad_requests() {
        let rejection = JsonRejection::from(MissingJsonContentType::default());
        let err = ApiError::from(rejection);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(!err.message().is_empty());
    }

    #[test]
    fn unknown_user_is_not_found() {
        let err = ApiError::from(AccountError::UserNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "User not found");
    }
}
