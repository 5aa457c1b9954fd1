use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateEpisodeParams, EpisodesRepo, RepoError, UpdateEpisodeParams,
    },
    domain::entities::EpisodeRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct EpisodeRow {
    id: Uuid,
    title: String,
    description: String,
    embed_code: String,
    date: OffsetDateTime,
}

impl From<EpisodeRow> for EpisodeRecord {
    fn from(row: EpisodeRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            embed_code: row.embed_code,
            date: row.date,
        }
    }
}

#[async_trait]
impl EpisodesRepo for PostgresRepositories {
    async fn list_episodes(&self) -> Result<Vec<EpisodeRecord>, RepoError> {
        let rows = sqlx::query_as::<_, EpisodeRow>(
            r#"
            SELECT id, title, description, embed_code, date
            FROM episodes
            ORDER BY date DESC, id DESC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(EpisodeRecord::from).collect())
    }

    async fn find_episode(&self, id: Uuid) -> Result<Option<EpisodeRecord>, RepoError> {
        let row = sqlx::query_as::<_, EpisodeRow>(
            r#"
            SELECT id, title, description, embed_code, date
            FROM episodes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(EpisodeRecord::from))
    }

    async fn create_episode(
        &self,
        params: CreateEpisodeParams,
    ) -> Result<EpisodeRecord, RepoError> {
        let row = sqlx::query_as::<_, EpisodeRow>(
            r#"
            INSERT INTO episodes (id, title, description, embed_code, date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, embed_code, date
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.title)
        .bind(params.description)
        .bind(params.embed_code)
        .bind(params.date)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_episode(
        &self,
        params: UpdateEpisodeParams,
    ) -> Result<EpisodeRecord, RepoError> {
        let row = sqlx::query_as::<_, EpisodeRow>(
            r#"
            UPDATE episodes
            SET title = $2, description = $3, embed_code = $4, date = $5
            WHERE id = $1
            RETURNING id, title, description, embed_code, date
            "#,
        )
        .bind(params.id)
        .bind(params.title)
        .bind(params.description)
        .bind(params.embed_code)
        .bind(params.date)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(EpisodeRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_episode(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM episodes WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn count_episodes(&self) -> Result<u64, RepoError> {
        self.count_rows("SELECT COUNT(*) FROM episodes").await
    }
}
