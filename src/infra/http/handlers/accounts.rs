//! Account administration endpoints. Every body field is validated here so
//! a missing one answers `Missing required fields` before any provider call.

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::application::guests::ProvisionGuestCommand;
use crate::infra::http::error::ApiError;
use crate::infra::http::models::{
    CreateGuestRequest, CreateGuestResponse, EmailRequest, SetAdminClaimRequest,
    SetupStatusResponse, SuccessResponse, UidResponse,
};
use crate::infra::http::state::HttpState;

use super::{JsonBody, MISSING_FIELDS, required};

pub async fn create_guest(
    State(state): State<HttpState>,
    JsonBody(payload): JsonBody<CreateGuestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = ProvisionGuestCommand {
        name: required(payload.name)?,
        email: required(payload.email)?,
        password: required(payload.password)?,
        image_url: payload.image_url,
    };

    let provisioned = state.accounts.create_guest(command).await?;
    Ok(Json(CreateGuestResponse {
        success: true,
        uid: provisioned.uid,
        doc_id: provisioned.guest.id,
    }))
}

pub async fn get_user_by_email(
    State(state): State<HttpState>,
    JsonBody(payload): JsonBody<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = required(payload.email)?;
    let user = state.accounts.get_user_by_email(&email).await?;
    Ok(Json(UidResponse { uid: user.uid }))
}

pub async fn set_admin_claim(
    State(state): State<HttpState>,
    JsonBody(payload): JsonBody<SetAdminClaimRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = required(payload.uid)?;
    let is_admin = payload
        .is_admin
        .ok_or_else(|| ApiError::bad_request(MISSING_FIELDS))?;

    state.accounts.set_admin_claim(&uid, is_admin).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Grants `admin` to the configured bootstrap account.
pub async fn setup_grant(
    State(state): State<HttpState>,
    JsonBody(payload): JsonBody<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = required(payload.email)?;
    state.accounts.setup_grant(&email).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn setup_status(State(state): State<HttpState>) -> Result<impl IntoResponse, ApiError> {
    let status = state.accounts.setup_status().await?;
    Ok(Json(SetupStatusResponse::from(status)))
}
