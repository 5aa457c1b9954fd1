//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{AuthorRef, CategoryRef, PendingStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuestRecord {
    pub id: Uuid,
    pub uid: String,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub created_at: OffsetDateTime,
}

/// A guest submission awaiting, or retained after, editorial review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingPostRecord {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub author_id: AuthorRef,
    pub author_name: String,
    pub author_image: Option<String>,
    pub image: Option<String>,
    pub category_id: CategoryRef,
    pub category_name: String,
    pub status: PendingStatus,
    pub submitted_at: OffsetDateTime,
    pub rejected_at: Option<OffsetDateTime>,
}

/// A post visible on the public site. Author and category fields are snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedPostRecord {
    pub id: Uuid,
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

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub embed_code: String,
    pub date: OffsetDateTime,
}
