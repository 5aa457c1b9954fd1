use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, GuestCursor, PageRequest},
    application::repos::{CreateGuestParams, GuestsRepo, RepoError, UpdateGuestParams},
    domain::entities::GuestRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const GUEST_COLUMNS: &str = "id, uid, name, email, profile_picture, created_at";

#[derive(sqlx::FromRow)]
struct GuestRow {
    id: Uuid,
    uid: String,
    name: String,
    email: String,
    profile_picture: Option<String>,
    created_at: OffsetDateTime,
}

impl From<GuestRow> for GuestRecord {
    fn from(row: GuestRow) -> Self {
        Self {
            id: row.id,
            uid: row.uid,
            name: row.name,
            email: row.email,
            profile_picture: row.profile_picture,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl GuestsRepo for PostgresRepositories {
    async fn list_guests(
        &self,
        page: PageRequest<GuestCursor>,
    ) -> Result<CursorPage<GuestRecord>, RepoError> {
        let limit = page.effective_limit();

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(GUEST_COLUMNS);
        qb.push(" FROM guests");

        if let Some(cursor) = page.cursor {
            qb.push(" WHERE (created_at, id) < (");
            qb.push_bind(cursor.created_at());
            qb.push(", ");
            qb.push_bind(cursor.id());
            qb.push(")");
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(i64::from(limit) + 1);

        let rows = qb
            .build_query_as::<GuestRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CursorPage::from_overfetch(
            rows.into_iter().map(GuestRecord::from).collect(),
            limit,
            |guest| GuestCursor::new(guest.created_at, guest.id).encode(),
        ))
    }

    async fn find_guest(&self, id: Uuid) -> Result<Option<GuestRecord>, RepoError> {
        let sql = format!("SELECT {GUEST_COLUMNS} FROM guests WHERE id = $1");
        let row = sqlx::query_as::<_, GuestRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(GuestRecord::from))
    }

    async fn find_guest_by_uid(&self, uid: &str) -> Result<Option<GuestRecord>, RepoError> {
        let sql = format!("SELECT {GUEST_COLUMNS} FROM guests WHERE uid = $1");
        let row = sqlx::query_as::<_, GuestRow>(&sql)
            .bind(uid)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(GuestRecord::from))
    }

    async fn create_guest(&self, params: CreateGuestParams) -> Result<GuestRecord, RepoError> {
        let sql = format!(
            "INSERT INTO guests (id, uid, name, email, profile_picture) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {GUEST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, GuestRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.uid)
            .bind(params.name)
            .bind(params.email)
            .bind(params.profile_picture)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_guest(&self, params: UpdateGuestParams) -> Result<GuestRecord, RepoError> {
        let sql = format!(
            "UPDATE guests SET name = $2, email = $3, profile_picture = $4 \
             WHERE id = $1 \
             RETURNING {GUEST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, GuestRow>(&sql)
            .bind(params.id)
            .bind(params.name)
            .bind(params.email)
            .bind(params.profile_picture)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(GuestRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_guest(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM guests WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn count_guests(&self) -> Result<u64, RepoError> {
        self.count_rows("SELECT COUNT(*) FROM guests").await
    }
}
