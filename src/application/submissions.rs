//! Guest submission review workflow.
//!
//! A submission enters as `pending`. Rejection keeps the record with a
//! `rejected_at` stamp. Approval deletes the pending record and writes the
//! published post in one store transaction, so an id can be approved at most
//! once.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::authors::AuthorDirectory;
use crate::application::categories::{CategoryError, CategoryService};
use crate::application::identity::Session;
use crate::application::pagination::{CursorPage, PageRequest, PaginationError, PendingCursor};
use crate::application::render::{RenderError, RenderService};
use crate::application::repos::{
    ApprovePendingParams, CreatePendingPostParams, PendingPostsRepo, PendingQueryFilter, RepoError,
};
use crate::cache::{CacheScope, QueryCache};
use crate::domain::entities::{PendingPostRecord, PublishedPostRecord};
use crate::domain::error::DomainError;
use crate::domain::types::{CategoryRef, PendingStatus, UNKNOWN_CATEGORY_NAME};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("{0}")]
    ConstraintViolation(String),
    #[error("submission not found")]
    NotFound,
    #[error("submission was already reviewed")]
    AlreadyReviewed,
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct SubmitPostCommand {
    pub title: String,
    pub content: String,
    pub category_id: String,
    pub image: Option<String>,
}

#[derive(Clone)]
pub struct SubmissionService {
    pending: Arc<dyn PendingPostsRepo>,
    categories: CategoryService,
    authors: AuthorDirectory,
    renderer: Arc<dyn RenderService>,
    cache: Option<Arc<QueryCache>>,
}

impl SubmissionService {
    pub fn new(
        pending: Arc<dyn PendingPostsRepo>,
        categories: CategoryService,
        authors: AuthorDirectory,
        renderer: Arc<dyn RenderService>,
    ) -> Self {
        Self {
            pending,
            categories,
            authors,
            renderer,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Files a submission authored by the calling account.
    #[tracing::instrument(skip(self, session, command), fields(uid = %session.uid))]
    pub async fn submit(
        &self,
        session: &Session,
        command: SubmitPostCommand,
    ) -> Result<PendingPostRecord, SubmissionError> {
        let title = command.title.trim();
        if title.is_empty() {
            return Err(SubmissionError::ConstraintViolation(
                "Title is required".to_string(),
            ));
        }
        let category = CategoryRef::parse(&command.category_id)?;
        let (category_id, category_name) = match category {
            CategoryRef::Unknown => None,
            known => self.categories.snapshot(known).await?,
        }
        .ok_or_else(|| {
            SubmissionError::ConstraintViolation(format!(
                "category `{}` does not exist",
                command.category_id.trim()
            ))
        })?;

        let author_id = session.as_author();
        let author = self.authors.resolve(&author_id).await?;
        let content_html = self.renderer.render(&command.content)?;
        let image = command
            .image
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let record = self
            .pending
            .create_pending(CreatePendingPostParams {
                title: title.to_string(),
                content: command.content,
                content_html,
                author_id,
                author_name: author.name,
                author_image: author.image,
                image,
                category_id,
                category_name,
                submitted_at: OffsetDateTime::now_utc(),
            })
            .await?;

        info!(pending_id = %record.id, "submission received");
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<PendingPostRecord, SubmissionError> {
        self.pending
            .find_pending(id)
            .await?
            .ok_or(SubmissionError::NotFound)
    }

    /// Submissions newest first, optionally restricted to one status.
    pub async fn review_queue(
        &self,
        status: Option<PendingStatus>,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<CursorPage<PendingPostRecord>, SubmissionError> {
        let cursor = cursor.map(PendingCursor::decode).transpose()?;
        if let Some(cursor) = cursor.as_ref()
            && cursor.status() != status
        {
            return Err(PaginationError::InvalidCursor(
                "cursor belongs to a different status filter".to_string(),
            )
            .into());
        }

        let filter = PendingQueryFilter { status };
        Ok(self
            .pending
            .list_pending(&filter, PageRequest::new(limit, cursor))
            .await?)
    }

    /// Publishes a pending submission, optionally with reviewer-edited content.
    #[tracing::instrument(skip(self, edited_content))]
    pub async fn approve(
        &self,
        id: Uuid,
        edited_content: Option<String>,
    ) -> Result<PublishedPostRecord, SubmissionError> {
        let pending = self.get(id).await?;
        pending.status.transition(PendingStatus::Approved)?;

        let content = edited_content.unwrap_or(pending.content);
        let content_html = self.renderer.render(&content)?;

        let snapshot = self.categories.snapshot(pending.category_id).await?;
        let (category_id, category_name) = match snapshot {
            Some(snapshot) => snapshot,
            None => {
                warn!(
                    pending_id = %id,
                    category = %pending.category_id,
                    "submission category no longer exists, publishing as unknown"
                );
                (CategoryRef::Unknown, UNKNOWN_CATEGORY_NAME.to_string())
            }
        };
        let author = self.authors.resolve(&pending.author_id).await?;

        let published = self
            .pending
            .approve_pending(ApprovePendingParams {
                id,
                content,
                content_html,
                category_id,
                category_name,
                author_name: author.name,
                author_image: author.image,
                published_at: OffsetDateTime::now_utc(),
            })
            .await?
            .ok_or(SubmissionError::AlreadyReviewed)?;

        if let Some(cache) = self.cache.as_ref() {
            cache.invalidate(CacheScope::Posts);
        }
        info!(pending_id = %id, post_id = %published.id, "submission approved");
        Ok(published)
    }

    #[tracing::instrument(skip(self))]
    pub async fn reject(&self, id: Uuid) -> Result<PendingPostRecord, SubmissionError> {
        let pending = self.get(id).await?;
        pending.status.transition(PendingStatus::Rejected)?;

        let rejected = self
            .pending
            .reject_pending(id, OffsetDateTime::now_utc())
            .await?
            .ok_or(SubmissionError::AlreadyReviewed)?;

        info!(pending_id = %id, "submission rejected");
        Ok(rejected)
    }
}
