use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, PendingCursor},
    application::repos::{
        ApprovePendingParams, CreatePendingPostParams, PendingPostsRepo, PendingQueryFilter,
        RepoError,
    },
    domain::entities::{PendingPostRecord, PublishedPostRecord},
    domain::types::{AuthorRef, CategoryRef, PendingStatus},
};

use super::posts::{POST_COLUMNS, PostRow};
use super::util::corrupt_row;
use super::{PostgresRepositories, map_sqlx_error};

const PENDING_COLUMNS: &str = "id, title, content, content_html, author_id, author_name, \
    author_image, image, category_id, category_name, status, submitted_at, rejected_at";

#[derive(sqlx::FromRow)]
struct PendingRow {
    id: Uuid,
    title: String,
    content: String,
    content_html: String,
    author_id: String,
    author_name: String,
    author_image: Option<String>,
    image: Option<String>,
    category_id: String,
    category_name: String,
    status: PendingStatus,
    submitted_at: OffsetDateTime,
    rejected_at: Option<OffsetDateTime>,
}

impl TryFrom<PendingRow> for PendingPostRecord {
    type Error = RepoError;

    fn try_from(row: PendingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            content: row.content,
            content_html: row.content_html,
            author_id: AuthorRef::parse(&row.author_id)
                .map_err(corrupt_row("pending_posts.author_id"))?,
            author_name: row.author_name,
            author_image: row.author_image,
            image: row.image,
            category_id: CategoryRef::parse(&row.category_id)
                .map_err(corrupt_row("pending_posts.category_id"))?,
            category_name: row.category_name,
            status: row.status,
            submitted_at: row.submitted_at,
            rejected_at: row.rejected_at,
        })
    }
}

fn collect_pending(rows: Vec<PendingRow>) -> Result<Vec<PendingPostRecord>, RepoError> {
    rows.into_iter().map(PendingPostRecord::try_from).collect()
}

#[async_trait]
impl PendingPostsRepo for PostgresRepositories {
    async fn list_pending(
        &self,
        filter: &PendingQueryFilter,
        page: PageRequest<PendingCursor>,
    ) -> Result<CursorPage<PendingPostRecord>, RepoError> {
        let limit = page.effective_limit();

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(PENDING_COLUMNS);
        qb.push(" FROM pending_posts WHERE TRUE");

        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }

        if let Some(cursor) = page.cursor {
            qb.push(" AND (submitted_at, id) < (");
            qb.push_bind(cursor.submitted_at());
            qb.push(", ");
            qb.push_bind(cursor.id());
            qb.push(")");
        }

        qb.push(" ORDER BY submitted_at DESC, id DESC LIMIT ");
        qb.push_bind(i64::from(limit) + 1);

        let rows = qb
            .build_query_as::<PendingRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let status = filter.status;
        Ok(CursorPage::from_overfetch(
            collect_pending(rows)?,
            limit,
            |post| PendingCursor::new(status, post.submitted_at, post.id).encode(),
        ))
    }

    async fn list_pending_by_author(
        &self,
        author: &AuthorRef,
    ) -> Result<Vec<PendingPostRecord>, RepoError> {
        let sql = format!(
            "SELECT {PENDING_COLUMNS} FROM pending_posts \
             WHERE author_id = $1 \
             ORDER BY submitted_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, PendingRow>(&sql)
            .bind(author.as_str())
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        collect_pending(rows)
    }

    async fn find_pending(&self, id: Uuid) -> Result<Option<PendingPostRecord>, RepoError> {
        let sql = format!("SELECT {PENDING_COLUMNS} FROM pending_posts WHERE id = $1");
        let row = sqlx::query_as::<_, PendingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(PendingPostRecord::try_from).transpose()
    }

    async fn create_pending(
        &self,
        params: CreatePendingPostParams,
    ) -> Result<PendingPostRecord, RepoError> {
        let sql = format!(
            "INSERT INTO pending_posts \
                (id, title, content, content_html, author_id, author_name, author_image, \
                 image, category_id, category_name, status, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {PENDING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PendingRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.title)
            .bind(params.content)
            .bind(params.content_html)
            .bind(params.author_id.as_str().to_string())
            .bind(params.author_name)
            .bind(params.author_image)
            .bind(params.image)
            .bind(params.category_id.storage_key())
            .bind(params.category_name)
            .bind(PendingStatus::Pending)
            .bind(params.submitted_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn reject_pending(
        &self,
        id: Uuid,
        rejected_at: OffsetDateTime,
    ) -> Result<Option<PendingPostRecord>, RepoError> {
        let sql = format!(
            "UPDATE pending_posts \
             SET status = $2, rejected_at = $3 \
             WHERE id = $1 AND status = $4 \
             RETURNING {PENDING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PendingRow>(&sql)
            .bind(id)
            .bind(PendingStatus::Rejected)
            .bind(rejected_at)
            .bind(PendingStatus::Pending)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(PendingPostRecord::try_from).transpose()
    }

    async fn approve_pending(
        &self,
        params: ApprovePendingParams,
    ) -> Result<Option<PublishedPostRecord>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        // The conditional delete doubles as the row lock: a concurrent approval
        // of the same id blocks here and then finds nothing to remove.
        let delete_sql = format!(
            "DELETE FROM pending_posts WHERE id = $1 AND status = $2 RETURNING {PENDING_COLUMNS}"
        );
        let removed = sqlx::query_as::<_, PendingRow>(&delete_sql)
            .bind(params.id)
            .bind(PendingStatus::Pending)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let Some(removed) = removed else {
            return Ok(None);
        };
        let pending = PendingPostRecord::try_from(removed)?;

        let insert_sql = format!(
            "INSERT INTO posts ({POST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&insert_sql)
            .bind(Uuid::new_v4())
            .bind(pending.title)
            .bind(params.content)
            .bind(params.content_html)
            .bind(params.published_at)
            .bind(pending.image)
            .bind(params.category_id.storage_key())
            .bind(params.category_name)
            .bind(pending.author_id.as_str().to_string())
            .bind(params.author_name)
            .bind(params.author_image)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        PublishedPostRecord::try_from(row).map(Some)
    }

    async fn count_pending(&self, status: Option<PendingStatus>) -> Result<u64, RepoError> {
        let count: i64 = match status {
            Some(status) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pending_posts WHERE status = $1")
                    .bind(status)
                    .fetch_one(self.pool())
                    .await
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pending_posts")
                    .fetch_one(self.pool())
                    .await
            }
        }
        .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}
