//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{
    CursorPage, GuestCursor, PageRequest, PaginationError, PendingCursor, PostCursor,
};
use crate::domain::entities::{
    CategoryRecord, EpisodeRecord, GuestRecord, PendingPostRecord, PublishedPostRecord,
};
use crate::domain::types::{AuthorRef, CategoryRef, PendingStatus};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub name: String,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    /// Case-insensitive lookup on the trimmed name.
    async fn find_category_by_name(&self, name: &str)
    -> Result<Option<CategoryRecord>, RepoError>;

    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    /// Moves every published post off the category and removes it in one atomic
    /// write. Returns the number of reassigned posts.
    async fn delete_category_cascade(&self, id: Uuid) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateGuestParams {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateGuestParams {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
}

#[async_trait]
pub trait GuestsRepo: Send + Sync {
    async fn list_guests(
        &self,
        page: PageRequest<GuestCursor>,
    ) -> Result<CursorPage<GuestRecord>, RepoError>;

    async fn find_guest(&self, id: Uuid) -> Result<Option<GuestRecord>, RepoError>;

    async fn find_guest_by_uid(&self, uid: &str) -> Result<Option<GuestRecord>, RepoError>;

    async fn create_guest(&self, params: CreateGuestParams) -> Result<GuestRecord, RepoError>;

    async fn update_guest(&self, params: UpdateGuestParams) -> Result<GuestRecord, RepoError>;

    async fn delete_guest(&self, id: Uuid) -> Result<(), RepoError>;

    async fn count_guests(&self) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone, Default)]
pub struct PendingQueryFilter {
    pub status: Option<PendingStatus>,
}

#[derive(Debug, Clone)]
pub struct CreatePendingPostParams {
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub author_id: AuthorRef,
    pub author_name: String,
    pub author_image: Option<String>,
    pub image: Option<String>,
    pub category_id: CategoryRef,
    pub category_name: String,
    pub submitted_at: OffsetDateTime,
}

/// Fields of the published post that the reviewer, not the submission, decides.
#[derive(Debug, Clone)]
pub struct ApprovePendingParams {
    pub id: Uuid,
    pub content: String,
    pub content_html: String,
    pub category_id: CategoryRef,
    pub category_name: String,
    pub author_name: String,
    pub author_image: Option<String>,
    pub published_at: OffsetDateTime,
}

#[async_trait]
pub trait PendingPostsRepo: Send + Sync {
    async fn list_pending(
        &self,
        filter: &PendingQueryFilter,
        page: PageRequest<PendingCursor>,
    ) -> Result<CursorPage<PendingPostRecord>, RepoError>;

    /// Every submission by the author, newest first.
    async fn list_pending_by_author(
        &self,
        author: &AuthorRef,
    ) -> Result<Vec<PendingPostRecord>, RepoError>;

    async fn find_pending(&self, id: Uuid) -> Result<Option<PendingPostRecord>, RepoError>;

    async fn create_pending(
        &self,
        params: CreatePendingPostParams,
    ) -> Result<PendingPostRecord, RepoError>;

    /// Marks a still-pending record rejected. `None` when no pending record matched.
    async fn reject_pending(
        &self,
        id: Uuid,
        rejected_at: OffsetDateTime,
    ) -> Result<Option<PendingPostRecord>, RepoError>;

    /// Removes a still-pending record and inserts its published counterpart in
    /// one transaction. `None` when no pending record matched, in which case
    /// nothing is written.
    async fn approve_pending(
        &self,
        params: ApprovePendingParams,
    ) -> Result<Option<PublishedPostRecord>, RepoError>;

    async fn count_pending(&self, status: Option<PendingStatus>) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone, Default)]
pub struct PostQueryFilter {
    pub category: Option<CategoryRef>,
    pub author: Option<AuthorRef>,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub date: OffsetDateTime,
    pub image: Option<String>,
    pub category_id: CategoryRef,
    pub category_name: String,
    pub author_id: AuthorRef,
    pub author_name: String,
    pub author_image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub image: Option<String>,
    pub category_id: CategoryRef,
    pub category_name: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PublishedPostRecord>, RepoError>;

    /// Unpaginated equality listing, newest first.
    async fn list_posts_matching(
        &self,
        filter: &PostQueryFilter,
    ) -> Result<Vec<PublishedPostRecord>, RepoError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<PublishedPostRecord>, RepoError>;

    async fn create_post(&self, params: CreatePostParams)
    -> Result<PublishedPostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams)
    -> Result<PublishedPostRecord, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;

    async fn count_posts(&self) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateEpisodeParams {
    pub title: String,
    pub description: String,
    pub embed_code: String,
    pub date: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdateEpisodeParams {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub embed_code: String,
    pub date: OffsetDateTime,
}

#[async_trait]
pub trait EpisodesRepo: Send + Sync {
    async fn list_episodes(&self) -> Result<Vec<EpisodeRecord>, RepoError>;

    async fn find_episode(&self, id: Uuid) -> Result<Option<EpisodeRecord>, RepoError>;

    async fn create_episode(&self, params: CreateEpisodeParams)
    -> Result<EpisodeRecord, RepoError>;

    async fn update_episode(&self, params: UpdateEpisodeParams)
    -> Result<EpisodeRecord, RepoError>;

    async fn delete_episode(&self, id: Uuid) -> Result<(), RepoError>;

    async fn count_episodes(&self) -> Result<u64, RepoError>;
}
