use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CreateEpisodeParams, EpisodesRepo, RepoError, UpdateEpisodeParams,
};
use crate::cache::{CacheScope, QueryCache};
use crate::domain::entities::EpisodeRecord;

#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("episode not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateEpisodeCommand {
    pub title: String,
    pub description: String,
    pub embed_code: String,
    /// Defaults to now.
    pub date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct EpisodePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub embed_code: Option<String>,
    pub date: Option<OffsetDateTime>,
}

#[derive(Clone)]
pub struct EpisodeService {
    repo: Arc<dyn EpisodesRepo>,
    cache: Option<Arc<QueryCache>>,
}

impl EpisodeService {
    pub fn new(repo: Arc<dyn EpisodesRepo>) -> Self {
        Self { repo, cache: None }
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Newest episodes first.
    pub async fn list(&self) -> Result<Vec<EpisodeRecord>, EpisodeError> {
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.episodes()) {
            return Ok(cached);
        }
        let ticket = self
            .cache
            .as_ref()
            .map(|cache| cache.ticket(CacheScope::Episodes));
        let episodes = self.repo.list_episodes().await?;
        if let Some((cache, ticket)) = self.cache.as_ref().zip(ticket) {
            cache.store_episodes(ticket, episodes.clone());
        }
        Ok(episodes)
    }

    pub async fn get(&self, id: Uuid) -> Result<EpisodeRecord, EpisodeError> {
        self.repo
            .find_episode(id)
            .await?
            .ok_or(EpisodeError::NotFound)
    }

    #[tracing::instrument(skip(self, command), fields(title = %command.title))]
    pub async fn create(
        &self,
        command: CreateEpisodeCommand,
    ) -> Result<EpisodeRecord, EpisodeError> {
        let title = required(&command.title, "Episode title is required")?;
        let embed_code = required(&command.embed_code, "Embed code is required")?;

        let record = self
            .repo
            .create_episode(CreateEpisodeParams {
                title,
                description: command.description.trim().to_string(),
                embed_code,
                date: command.date.unwrap_or_else(OffsetDateTime::now_utc),
            })
            .await?;

        self.invalidate();
        info!(episode_id = %record.id, "episode created");
        Ok(record)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: EpisodePatch,
    ) -> Result<EpisodeRecord, EpisodeError> {
        let current = self.get(id).await?;

        let title = match patch.title {
            Some(title) => required(&title, "Episode title is required")?,
            None => current.title,
        };
        let embed_code = match patch.embed_code {
            Some(code) => required(&code, "Embed code is required")?,
            None => current.embed_code,
        };

        let updated = self
            .repo
            .update_episode(UpdateEpisodeParams {
                id,
                title,
                description: patch
                    .description
                    .map(|text| text.trim().to_string())
                    .unwrap_or(current.description),
                embed_code,
                date: patch.date.unwrap_or(current.date),
            })
            .await
            .map_err(not_found_as_episode)?;

        self.invalidate();
        info!(episode_id = %id, "episode updated");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), EpisodeError> {
        self.repo
            .delete_episode(id)
            .await
            .map_err(not_found_as_episode)?;
        self.invalidate();
        info!(episode_id = %id, "episode deleted");
        Ok(())
    }

    fn invalidate(&self) {
        if let Some(cache) = self.cache.as_ref() {
            cache.invalidate(CacheScope::Episodes);
        }
    }
}

fn required(raw: &str, message: &'static str) -> Result<String, EpisodeError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(EpisodeError::ConstraintViolation(message));
    }
    Ok(value.to_string())
}

fn not_found_as_episode(err: RepoError) -> EpisodeError {
    match err {
        RepoError::NotFound => EpisodeError::NotFound,
        other => EpisodeError::Repo(other),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::cache::CacheConfig;
    use crate::infra::memory::MemoryRepositories;

    fn command(title: &str, date: OffsetDateTime) -> CreateEpisodeCommand {
        CreateEpisodeCommand {
            title: title.to_string(),
            description: "Conversations at altitude".to_string(),
            embed_code: "<iframe src=\"https://player.test/1\"></iframe>".to_string(),
            date: Some(date),
        }
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let service = EpisodeService::new(Arc::new(MemoryRepositories::new()));
        service
            .create(command("Older", datetime!(2026-01-01 00:00 UTC)))
            .await
            .unwrap();
        service
            .create(command("Newer", datetime!(2026-06-01 00:00 UTC)))
            .await
            .unwrap();

        let titles: Vec<_> = service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["Newer", "Older"]);
    }

    #[tokio::test]
    async fn embed_code_is_required() {
        let service = EpisodeService::new(Arc::new(MemoryRepositories::new()));
        let mut bad = command("Pilot", datetime!(2026-01-01 00:00 UTC));
        bad.embed_code = " ".to_string();

        assert!(matches!(
            service.create(bad).await,
            Err(EpisodeError::ConstraintViolation("Embed code is required"))
        ));
    }

    #[tokio::test]
    async fn update_refreshes_the_cached_list() {
        let cache = Arc::new(QueryCache::new(CacheConfig::default()));
        let service =
            EpisodeService::new(Arc::new(MemoryRepositories::new())).with_cache(cache.clone());
        let episode = service
            .create(command("Pilot", datetime!(2026-01-01 00:00 UTC)))
            .await
            .unwrap();
        assert_eq!(service.list().await.unwrap()[0].title, "Pilot");

        service
            .update(
                episode.id,
                EpisodePatch {
                    title: Some("Pilot (remastered)".to_string()),
                    ..EpisodePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(service.list().await.unwrap()[0].title, "Pilot (remastered)");
    }

    #[tokio::test]
    async fn delete_of_missing_episode_is_not_found() {
        let service = EpisodeService::new(Arc::new(MemoryRepositories::new()));
        assert!(matches!(
            service.delete(Uuid::new_v4()).await,
            Err(EpisodeError::NotFound)
        ));
    }
}
