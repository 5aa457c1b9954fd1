use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{CategoriesRepo, CreateCategoryParams, RepoError};
use crate::cache::{CacheScope, QueryCache};
use crate::domain::entities::CategoryRecord;
use crate::domain::types::{CategoryRef, UNKNOWN_CATEGORY_NAME};

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("a category named `{0}` already exists")]
    Duplicate(String),
    #[error("category not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct CategoryService {
    repo: Arc<dyn CategoriesRepo>,
    cache: Option<Arc<QueryCache>>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoriesRepo>) -> Self {
        Self { repo, cache: None }
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// All categories ordered by name.
    pub async fn list(&self) -> Result<Vec<CategoryRecord>, CategoryError> {
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.categories()) {
            return Ok(cached);
        }
        let ticket = self
            .cache
            .as_ref()
            .map(|cache| cache.ticket(CacheScope::Categories));

        let categories = self.repo.list_categories().await.map_err(|err| {
            warn!(error = %err, "failed to list categories");
            CategoryError::from(err)
        })?;

        if let Some((cache, ticket)) = self.cache.as_ref().zip(ticket) {
            cache.store_categories(ticket, categories.clone());
        }
        Ok(categories)
    }

    /// Public read path: a store failure shows an empty registry.
    pub async fn list_or_empty(&self) -> Vec<CategoryRecord> {
        self.list().await.unwrap_or_default()
    }

    /// The id and display name a post should snapshot for `category`.
    /// `None` when a known id no longer exists.
    pub async fn snapshot(
        &self,
        category: CategoryRef,
    ) -> Result<Option<(CategoryRef, String)>, CategoryError> {
        match category {
            CategoryRef::Unknown => Ok(Some((
                CategoryRef::Unknown,
                UNKNOWN_CATEGORY_NAME.to_string(),
            ))),
            CategoryRef::Known(id) => Ok(self
                .repo
                .find_category(id)
                .await?
                .map(|record| (CategoryRef::Known(record.id), record.name))),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<CategoryRecord, CategoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::ConstraintViolation(
                "Category name is required",
            ));
        }

        if self.repo.find_category_by_name(name).await?.is_some() {
            return Err(CategoryError::Duplicate(name.to_string()));
        }

        let record = self
            .repo
            .create_category(CreateCategoryParams {
                name: name.to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => CategoryError::Duplicate(name.to_string()),
                other => CategoryError::Repo(other),
            })?;

        self.invalidate(CacheScope::Categories);
        info!(category_id = %record.id, "category created");
        Ok(record)
    }

    /// Removes the category and moves its published posts to the sentinel
    /// category. Returns how many posts were moved.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<u64, CategoryError> {
        let reassigned = self
            .repo
            .delete_category_cascade(id)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => CategoryError::NotFound,
                other => {
                    warn!(error = %other, "category delete failed");
                    CategoryError::Repo(other)
                }
            })?;

        self.invalidate(CacheScope::Categories);
        self.invalidate(CacheScope::Posts);
        info!(reassigned, "category deleted");
        Ok(reassigned)
    }

    fn invalidate(&self, scope: CacheScope) {
        if let Some(cache) = self.cache.as_ref() {
            cache.invalidate(scope);
        }
    }
}
