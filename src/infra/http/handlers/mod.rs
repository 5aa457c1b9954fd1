//! Route handlers grouped by caller: public readers, signed-in guests,
//! admins and the account endpoints.

mod accounts;
mod admin;
mod guest;
mod public;

pub use accounts::*;
pub use admin::*;
pub use guest::*;
pub use public::*;

use axum::extract::{FromRequest, FromRequestParts};

use super::error::ApiError;

/// `axum::Json` with rejections rendered as the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

const MISSING_FIELDS: &str = "Missing required fields";

/// Unwraps a required body field, treating blank strings as absent.
fn required(value: Option<String>) -> Result<String, ApiError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(MISSING_FIELDS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn blank_fields_count_as_missing() {
        assert_eq!(required(Some("Sleep".into())).unwrap(), "Sleep");

        let err = required(Some("   ".into())).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), MISSING_FIELDS);
        assert!(required(None).is_err());
    }
}
