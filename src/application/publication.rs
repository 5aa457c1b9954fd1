use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::authors::AuthorDirectory;
use crate::application::categories::{CategoryError, CategoryService};
use crate::application::pagination::{CursorPage, PageRequest, PaginationError, PostCursor};
use crate::application::render::{RenderError, RenderService};
use crate::application::repos::{
    CreatePostParams, PostQueryFilter, PostsRepo, RepoError, UpdatePostParams,
};
use crate::cache::{CacheScope, FillTicket, QueryCache};
use crate::domain::entities::PublishedPostRecord;
use crate::domain::error::DomainError;
use crate::domain::types::{AuthorRef, CategoryRef};

#[derive(Debug, Error)]
pub enum PublicationError {
    #[error("{0}")]
    ConstraintViolation(String),
    #[error("post not found")]
    NotFound,
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
pub struct CreatePostCommand {
    pub title: String,
    pub content: String,
    pub category_id: String,
    /// Defaults to the site itself.
    pub author_id: Option<String>,
    pub image: Option<String>,
}

/// Partial update of a published post. `image: Some(None)` clears the image.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<String>,
    pub image: Option<Option<String>>,
}

#[derive(Clone)]
pub struct PublicationService {
    posts: Arc<dyn PostsRepo>,
    categories: CategoryService,
    authors: AuthorDirectory,
    renderer: Arc<dyn RenderService>,
    cache: Option<Arc<QueryCache>>,
}

impl PublicationService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        categories: CategoryService,
        authors: AuthorDirectory,
        renderer: Arc<dyn RenderService>,
    ) -> Self {
        Self {
            posts,
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

    #[tracing::instrument(skip(self, command), fields(title = %command.title))]
    pub async fn create(
        &self,
        command: CreatePostCommand,
    ) -> Result<PublishedPostRecord, PublicationError> {
        let title = required_title(&command.title)?;
        let (category_id, category_name) = self.category_snapshot(&command.category_id).await?;
        let author_id = match command.author_id.as_deref() {
            Some(raw) => AuthorRef::parse(raw)?,
            None => AuthorRef::Site,
        };
        let author = self.authors.resolve(&author_id).await?;
        let content_html = self.renderer.render(&command.content)?;

        let record = self
            .posts
            .create_post(CreatePostParams {
                title,
                content: command.content,
                content_html,
                date: OffsetDateTime::now_utc(),
                image: clean_url(command.image),
                category_id,
                category_name,
                author_id,
                author_name: author.name,
                author_image: author.image,
            })
            .await?;

        self.invalidate();
        info!(post_id = %record.id, "post published");
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<PublishedPostRecord, PublicationError> {
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.post(id)) {
            return Ok(cached);
        }
        let ticket = self.posts_ticket();

        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or(PublicationError::NotFound)?;

        if let Some((cache, ticket)) = self.cache.as_ref().zip(ticket) {
            cache.store_post(ticket, post.clone());
        }
        Ok(post)
    }

    /// Applies `patch`, rendering the content again when it changed.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: PostPatch,
    ) -> Result<PublishedPostRecord, PublicationError> {
        let current = self
            .posts
            .find_post(id)
            .await?
            .ok_or(PublicationError::NotFound)?;

        let title = match patch.title {
            Some(title) => required_title(&title)?,
            None => current.title,
        };
        let (content, content_html) = match patch.content {
            Some(content) if content != current.content => {
                let html = self.renderer.render(&content)?;
                (content, html)
            }
            _ => (current.content, current.content_html),
        };
        let (category_id, category_name) = match patch.category_id {
            Some(raw) => self.category_snapshot(&raw).await?,
            None => (current.category_id, current.category_name),
        };
        let image = match patch.image {
            Some(image) => clean_url(image),
            None => current.image,
        };

        let updated = self
            .posts
            .update_post(UpdatePostParams {
                id,
                title,
                content,
                content_html,
                image,
                category_id,
                category_name,
            })
            .await
            .map_err(not_found_as_post)?;

        self.invalidate();
        info!(post_id = %id, "post updated");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), PublicationError> {
        self.posts.delete_post(id).await.map_err(not_found_as_post)?;
        self.invalidate();
        info!(post_id = %id, "post deleted");
        Ok(())
    }

    /// Newest posts first, resuming after `cursor`.
    pub async fn list_paginated(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<CursorPage<PublishedPostRecord>, PublicationError> {
        let decoded = cursor.map(PostCursor::decode).transpose()?;
        let request = PageRequest::new(limit, decoded);
        let limit = request.effective_limit();

        if let Some(cached) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.post_page(cursor, limit))
        {
            return Ok(cached);
        }
        let ticket = self.posts_ticket();

        let page = self
            .posts
            .list_posts(&PostQueryFilter::default(), request)
            .await?;

        if let Some((cache, ticket)) = self.cache.as_ref().zip(ticket) {
            cache.store_post_page(ticket, cursor, limit, page.clone());
        }
        Ok(page)
    }

    pub async fn list_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<PublishedPostRecord>, PublicationError> {
        let category = CategoryRef::parse(category_id)?;
        let key = category.storage_key();

        if let Some(cached) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.posts_in_category(&key))
        {
            return Ok(cached);
        }
        let ticket = self.posts_ticket();

        let filter = PostQueryFilter {
            category: Some(category),
            author: None,
        };
        let posts = self.posts.list_posts_matching(&filter).await?;

        if let Some((cache, ticket)) = self.cache.as_ref().zip(ticket) {
            cache.store_posts_in_category(ticket, &key, posts.clone());
        }
        Ok(posts)
    }

    async fn category_snapshot(
        &self,
        raw: &str,
    ) -> Result<(CategoryRef, String), PublicationError> {
        let category = CategoryRef::parse(raw)?;
        self.categories.snapshot(category).await?.ok_or_else(|| {
            PublicationError::ConstraintViolation(format!(
                "category `{}` does not exist",
                raw.trim()
            ))
        })
    }

    fn posts_ticket(&self) -> Option<FillTicket> {
        self.cache
            .as_ref()
            .map(|cache| cache.ticket(CacheScope::Posts))
    }

    fn invalidate(&self) {
        if let Some(cache) = self.cache.as_ref() {
            cache.invalidate(CacheScope::Posts);
        }
    }
}

fn required_title(raw: &str) -> Result<String, PublicationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(PublicationError::ConstraintViolation(
            "Title is required".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn clean_url(url: Option<String>) -> Option<String> {
    url.map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

fn not_found_as_post(err: RepoError) -> PublicationError {
    match err {
        RepoError::NotFound => PublicationError::NotFound,
        other => PublicationError::Repo(other),
    }
}
