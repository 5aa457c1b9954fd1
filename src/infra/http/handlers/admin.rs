use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::episodes::{CreateEpisodeCommand, EpisodePatch};
use crate::application::guests::GuestPatch;
use crate::application::publication::{CreatePostCommand, PostPatch};
use crate::domain::types::PendingStatus;
use crate::infra::http::error::ApiError;
use crate::infra::http::models::{
    ApproveRequest, CategoryResponse, CreateCategoryRequest, CreatePostRequest,
    DeleteCategoryResponse, EpisodeRequest, EpisodeResponse, GuestResponse, OverviewResponse,
    PageQuery, PageResponse, PendingPostResponse, PendingQuery, PostResponse, SuccessResponse,
    UpdateGuestRequest, UpdatePostRequest,
};
use crate::infra::http::state::HttpState;

use super::{JsonBody, PathParam, QueryParams, required};

// ----- Published posts -----

pub async fn create_post(
    State(state): State<HttpState>,
    JsonBody(payload): JsonBody<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreatePostCommand {
        title: required(payload.title)?,
        content: required(payload.content)?,
        category_id: required(payload.category_id)?,
        author_id: payload.author_id,
        image: payload.image,
    };

    let post = state.publication.create(command).await?;
    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

pub async fn update_post(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = PostPatch {
        title: payload.title,
        content: payload.content,
        category_id: payload.category_id,
        image: payload.image,
    };

    let post = state.publication.update(id, patch).await?;
    Ok(Json(PostResponse::from(post)))
}

pub async fn delete_post(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.publication.delete(id).await?;
    Ok(Json(SuccessResponse::ok()))
}

// ----- Review queue -----

pub async fn list_pending(
    State(state): State<HttpState>,
    QueryParams(query): QueryParams<PendingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(PendingStatus::try_from)
        .transpose()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    let limit = query.limit.unwrap_or(state.post_page_size);

    let page = state
        .submissions
        .review_queue(status, query.cursor.as_deref(), limit)
        .await?;
    Ok(Json(PageResponse::<PendingPostResponse>::from_page(page)))
}

pub async fn get_pending(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.submissions.get(id).await?;
    Ok(Json(PendingPostResponse::from(record)))
}

/// An empty body approves the submission as written.
pub async fn approve_pending(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let edited = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<ApproveRequest>(&body)
            .map_err(|err| {
                ApiError::from_error(
                    "infra::http::body",
                    StatusCode::BAD_REQUEST,
                    "Invalid request body",
                    &err,
                )
            })?
            .content
    };
    let post = state.submissions.approve(id, edited).await?;
    Ok(Json(PostResponse::from(post)))
}

pub async fn reject_pending(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.submissions.reject(id).await?;
    Ok(Json(PendingPostResponse::from(record)))
}

// ----- Categories -----

pub async fn create_category(
    State(state): State<HttpState>,
    JsonBody(payload): JsonBody<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = required(payload.name)?;
    let category = state.categories.create(&name).await?;
    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

pub async fn delete_category(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let reassigned_posts = state.categories.delete(id).await?;
    Ok(Json(DeleteCategoryResponse {
        success: true,
        reassigned_posts,
    }))
}

// ----- Guests -----

pub async fn list_guests(
    State(state): State<HttpState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.guests.list(query.cursor.as_deref()).await?;
    Ok(Json(PageResponse::<GuestResponse>::from_page(page)))
}

pub async fn update_guest(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UpdateGuestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = GuestPatch {
        name: payload.name,
        email: payload.email,
        profile_picture: payload.profile_picture,
    };

    let guest = state.guests.update(id, patch).await?;
    Ok(Json(GuestResponse::from(guest)))
}

/// Removes the registry document; the identity account stays.
pub async fn delete_guest(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.guests.delete(id).await?;
    Ok(Json(SuccessResponse::ok()))
}

// ----- Episodes -----

pub async fn create_episode(
    State(state): State<HttpState>,
    JsonBody(payload): JsonBody<EpisodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateEpisodeCommand {
        title: required(payload.title)?,
        description: payload.description.unwrap_or_default(),
        embed_code: required(payload.embed_code)?,
        date: payload.date,
    };

    let episode = state.episodes.create(command).await?;
    Ok((StatusCode::CREATED, Json(EpisodeResponse::from(episode))))
}

pub async fn update_episode(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<EpisodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = EpisodePatch {
        title: payload.title,
        description: payload.description,
        embed_code: payload.embed_code,
        date: payload.date,
    };

    let episode = state.episodes.update(id, patch).await?;
    Ok(Json(EpisodeResponse::from(episode)))
}

pub async fn delete_episode(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.episodes.delete(id).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn overview(State(state): State<HttpState>) -> Result<impl IntoResponse, ApiError> {
    let overview = state.dashboard.admin_overview().await?;
    Ok(Json(OverviewResponse::from(overview)))
}
