use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, PostCursor},
    application::repos::{
        CreatePostParams, PostQueryFilter, PostsRepo, RepoError, UpdatePostParams,
    },
    domain::entities::PublishedPostRecord,
    domain::types::{AuthorRef, CategoryRef},
};

use super::util::corrupt_row;
use super::{PostgresRepositories, map_sqlx_error};

pub(super) const POST_COLUMNS: &str = "id, title, content, content_html, date, image, \
    category_id, category_name, author_id, author_name, author_image";

#[derive(sqlx::FromRow)]
pub(super) struct PostRow {
    id: Uuid,
    title: String,
    content: String,
    content_html: String,
    date: OffsetDateTime,
    image: Option<String>,
    category_id: String,
    category_name: String,
    author_id: String,
    author_name: String,
    author_image: Option<String>,
}

impl TryFrom<PostRow> for PublishedPostRecord {
    type Error = RepoError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            content: row.content,
            content_html: row.content_html,
            date: row.date,
            image: row.image,
            category_id: CategoryRef::parse(&row.category_id)
                .map_err(corrupt_row("posts.category_id"))?,
            category_name: row.category_name,
            author_id: AuthorRef::parse(&row.author_id).map_err(corrupt_row("posts.author_id"))?,
            author_name: row.author_name,
            author_image: row.author_image,
        })
    }
}

fn collect_posts(rows: Vec<PostRow>) -> Result<Vec<PublishedPostRecord>, RepoError> {
    rows.into_iter().map(PublishedPostRecord::try_from).collect()
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PublishedPostRecord>, RepoError> {
        let limit = page.effective_limit();

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM posts WHERE TRUE");
        Self::apply_post_filter(&mut qb, filter);

        if let Some(cursor) = page.cursor {
            qb.push(" AND (date, id) < (");
            qb.push_bind(cursor.date());
            qb.push(", ");
            qb.push_bind(cursor.id());
            qb.push(")");
        }

        qb.push(" ORDER BY date DESC, id DESC LIMIT ");
        qb.push_bind(i64::from(limit) + 1);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CursorPage::from_overfetch(
            collect_posts(rows)?,
            limit,
            |post| PostCursor::new(post.date, post.id).encode(),
        ))
    }

    async fn list_posts_matching(
        &self,
        filter: &PostQueryFilter,
    ) -> Result<Vec<PublishedPostRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM posts WHERE TRUE");
        Self::apply_post_filter(&mut qb, filter);
        qb.push(" ORDER BY date DESC, id DESC");

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        collect_posts(rows)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PublishedPostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(PublishedPostRecord::try_from).transpose()
    }

    async fn create_post(
        &self,
        params: CreatePostParams,
    ) -> Result<PublishedPostRecord, RepoError> {
        let sql = format!(
            "INSERT INTO posts ({POST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.title)
            .bind(params.content)
            .bind(params.content_html)
            .bind(params.date)
            .bind(params.image)
            .bind(params.category_id.storage_key())
            .bind(params.category_name)
            .bind(params.author_id.as_str().to_string())
            .bind(params.author_name)
            .bind(params.author_image)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn update_post(
        &self,
        params: UpdatePostParams,
    ) -> Result<PublishedPostRecord, RepoError> {
        let sql = format!(
            "UPDATE posts \
             SET title = $2, content = $3, content_html = $4, image = $5, \
                 category_id = $6, category_name = $7 \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(params.id)
            .bind(params.title)
            .bind(params.content)
            .bind(params.content_html)
            .bind(params.image)
            .bind(params.category_id.storage_key())
            .bind(params.category_name)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.ok_or(RepoError::NotFound)?.try_into()
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn count_posts(&self) -> Result<u64, RepoError> {
        self.count_rows("SELECT COUNT(*) FROM posts").await
    }
}
