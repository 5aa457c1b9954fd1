use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::infra::http::error::ApiError;
use crate::infra::http::models::{
    CategoryResponse, EpisodeResponse, PageQuery, PageResponse, PostResponse,
};
use crate::infra::http::state::HttpState;

use super::{PathParam, QueryParams};

pub async fn list_posts(
    State(state): State<HttpState>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(state.post_page_size);
    let page = state
        .publication
        .list_paginated(query.cursor.as_deref(), limit)
        .await?;
    Ok(Json(PageResponse::<PostResponse>::from_page(page)))
}

pub async fn get_post(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.publication.get(id).await?;
    Ok(Json(PostResponse::from(post)))
}

/// A store failure answers with an empty list; the service logs it.
pub async fn list_categories(State(state): State<HttpState>) -> impl IntoResponse {
    let categories = state.categories.list_or_empty().await;
    Json(
        categories
            .into_iter()
            .map(CategoryResponse::from)
            .collect::<Vec<_>>(),
    )
}

/// Accepts a category id or the `unknown` sentinel.
pub async fn list_category_posts(
    State(state): State<HttpState>,
    PathParam(category_id): PathParam<String>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.publication.list_by_category(&category_id).await?;
    Ok(Json(
        posts.into_iter().map(PostResponse::from).collect::<Vec<_>>(),
    ))
}

pub async fn list_episodes(
    State(state): State<HttpState>,
) -> Result<impl IntoResponse, ApiError> {
    let episodes = state.episodes.list().await?;
    Ok(Json(
        episodes
            .into_iter()
            .map(EpisodeResponse::from)
            .collect::<Vec<_>>(),
    ))
}

pub async fn get_episode(
    State(state): State<HttpState>,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let episode = state.episodes.get(id).await?;
    Ok(Json(EpisodeResponse::from(episode)))
}
