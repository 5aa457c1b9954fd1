//! Shared cursor pagination helpers.
//!
//! Every listing is keyset-paginated on `(timestamp desc, id desc)`. A cursor
//! carries the ordering key of the last row handed out, so the next page
//! starts strictly after it no matter what was inserted in between.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::PendingStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PostCursorPayload {
    date: OffsetDateTime,
    id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PendingCursorPayload {
    status: Option<PendingStatus>,
    submitted_at: OffsetDateTime,
    id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct GuestCursorPayload {
    created_at: OffsetDateTime,
    id: Uuid,
}

/// Cursor for paginating published posts by publish date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostCursor {
    date: OffsetDateTime,
    id: Uuid,
}

/// Cursor for paginating the review queue, scoped to the status filter it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCursor {
    status: Option<PendingStatus>,
    submitted_at: OffsetDateTime,
    id: Uuid,
}

/// Cursor for paginating guests by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestCursor {
    created_at: OffsetDateTime,
    id: Uuid,
}

fn encode_payload<P: Serialize>(payload: &P) -> String {
    let serialized =
        serde_json::to_vec(payload).expect("serializing cursor payload should succeed");
    URL_SAFE_NO_PAD.encode(serialized)
}

fn decode_payload<P: DeserializeOwned>(cursor: &str) -> Result<P, PaginationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| PaginationError::InvalidCursor(err.to_string()))
}

impl PostCursor {
    pub fn new(date: OffsetDateTime, id: Uuid) -> Self {
        Self { date, id }
    }

    pub fn date(&self) -> OffsetDateTime {
        self.date
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn encode(&self) -> String {
        encode_payload(&PostCursorPayload {
            date: self.date,
            id: self.id,
        })
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let payload: PostCursorPayload = decode_payload(cursor)?;
        Ok(Self::new(payload.date, payload.id))
    }

    /// True when a row with this ordering key sorts after the cursor.
    pub fn precedes(&self, date: OffsetDateTime, id: Uuid) -> bool {
        (date, id) < (self.date, self.id)
    }
}

impl PendingCursor {
    pub fn new(status: Option<PendingStatus>, submitted_at: OffsetDateTime, id: Uuid) -> Self {
        Self {
            status,
            submitted_at,
            id,
        }
    }

    pub fn status(&self) -> Option<PendingStatus> {
        self.status
    }

    pub fn submitted_at(&self) -> OffsetDateTime {
        self.submitted_at
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn encode(&self) -> String {
        encode_payload(&PendingCursorPayload {
            status: self.status,
            submitted_at: self.submitted_at,
            id: self.id,
        })
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let payload: PendingCursorPayload = decode_payload(cursor)?;
        Ok(Self::new(payload.status, payload.submitted_at, payload.id))
    }

    pub fn precedes(&self, submitted_at: OffsetDateTime, id: Uuid) -> bool {
        (submitted_at, id) < (self.submitted_at, self.id)
    }
}

impl GuestCursor {
    pub fn new(created_at: OffsetDateTime, id: Uuid) -> Self {
        Self { created_at, id }
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn encode(&self) -> String {
        encode_payload(&GuestCursorPayload {
            created_at: self.created_at,
            id: self.id,
        })
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let payload: GuestCursorPayload = decode_payload(cursor)?;
        Ok(Self::new(payload.created_at, payload.id))
    }

    pub fn precedes(&self, created_at: OffsetDateTime, id: Uuid) -> bool {
        (created_at, id) < (self.created_at, self.id)
    }
}

/// Upper bound applied to every requested page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Generic page request with a limit and optional cursor.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }

    /// The limit every store honours: at least one row, at most [`MAX_PAGE_SIZE`].
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Cursor-aware page result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }

    /// Build a page from `limit + 1` fetched rows: the extra row only signals
    /// that another page exists, and the cursor points at the last row kept.
    pub fn from_overfetch(mut rows: Vec<T>, limit: u32, cursor_of: impl Fn(&T) -> String) -> Self {
        let limit = limit as usize;
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let next_cursor = if has_more {
            rows.last().map(&cursor_of)
        } else {
            None
        };
        Self::new(rows, next_cursor)
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn post_cursor_decodes_what_it_encodes() {
        let id = Uuid::new_v4();
        let when = OffsetDateTime::now_utc();
        let decoded = PostCursor::decode(&PostCursor::new(when, id).encode()).expect("cursor");

        assert_eq!(decoded.id(), id);
        assert_eq!(decoded.date(), when);
    }

    #[test]
    fn pending_cursor_keeps_status_scope() {
        let cursor = PendingCursor::new(
            Some(PendingStatus::Rejected),
            OffsetDateTime::now_utc(),
            Uuid::new_v4(),
        );
        let decoded = PendingCursor::decode(&cursor.encode()).expect("cursor");
        assert_eq!(decoded.status(), Some(PendingStatus::Rejected));
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn decoding_invalid_cursor_reports_error() {
        let err = PostCursor::decode("not-base64!").expect_err("invalid cursor rejected");
        assert!(matches!(err, PaginationError::InvalidCursor(_)));
        let err = GuestCursor::decode("e30").expect_err("empty object rejected");
        assert!(matches!(err, PaginationError::InvalidCursor(_)));
    }

    #[test]
    fn precedes_orders_by_time_then_id() {
        let now = OffsetDateTime::now_utc();
        let cursor = PostCursor::new(now, Uuid::from_u128(5));
        assert!(cursor.precedes(now - Duration::seconds(1), Uuid::from_u128(9)));
        assert!(cursor.precedes(now, Uuid::from_u128(4)));
        assert!(!cursor.precedes(now, Uuid::from_u128(5)));
        assert!(!cursor.precedes(now + Duration::seconds(1), Uuid::from_u128(1)));
    }

    #[test]
    fn overfetch_sets_cursor_only_when_rows_remain() {
        let page = CursorPage::from_overfetch(vec![1, 2, 3], 2, |n| n.to_string());
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.next_cursor.as_deref(), Some("2"));

        let page = CursorPage::from_overfetch(vec![1, 2], 2, |n| n.to_string());
        assert_eq!(page.next_cursor, None);
    }
}
