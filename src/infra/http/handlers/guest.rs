use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::Multipart;
use tracing::warn;

use crate::application::identity::Session;
use crate::application::submissions::SubmitPostCommand;
use crate::application::uploads::{ImageUpload, UploadError};
use crate::infra::http::error::ApiError;
use crate::infra::http::models::{
    DashboardResponse, PendingPostResponse, SubmitPostRequest, UploadResponse,
};
use crate::infra::http::state::HttpState;

use super::{JsonBody, required};

const UPLOAD_FIELD: &str = "file";

pub async fn submit_post(
    State(state): State<HttpState>,
    Extension(session): Extension<Session>,
    JsonBody(payload): JsonBody<SubmitPostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = SubmitPostCommand {
        title: required(payload.title)?,
        content: required(payload.content)?,
        category_id: required(payload.category_id)?,
        image: payload.image,
    };

    let record = state.submissions.submit(&session, command).await?;
    Ok((StatusCode::CREATED, Json(PendingPostResponse::from(record))))
}

pub async fn dashboard(
    State(state): State<HttpState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let dashboard = state.dashboard.guest_dashboard(&session).await?;
    Ok(Json(DashboardResponse::from(dashboard)))
}

/// Stores the `file` part and returns its public URL. Nothing else is
/// touched, so a failure here leaves the caller's draft as it was.
pub async fn upload_image(
    State(state): State<HttpState>,
    Extension(session): Extension<Session>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        warn!(uid = %session.uid, error = %err, "failed to read multipart field");
        ApiError::bad_request("Invalid multipart payload")
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload".to_string());
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|err| {
            warn!(uid = %session.uid, error = %err, "failed to read upload body");
            ApiError::bad_request("Invalid multipart payload")
        })?;
        upload = Some(ImageUpload {
            file_name,
            content_type,
            data,
        });
        break;
    }

    let upload = upload.ok_or(UploadError::Empty)?;
    let stored = state.uploads.upload_image(upload).await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: stored.secure_url,
        }),
    ))
}
