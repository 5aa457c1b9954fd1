//! Wire shapes of the JSON API. Field names are camelCase and timestamps RFC 3339.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::accounts::SetupStatus;
use crate::application::dashboard::{AdminOverview, DashboardEntry, GuestDashboard, StatusCounts};
use crate::application::identity::IdentityUser;
use crate::application::pagination::CursorPage;
use crate::domain::entities::{
    CategoryRecord, EpisodeRecord, GuestRecord, PendingPostRecord, PublishedPostRecord,
};
use crate::domain::types::{AuthorRef, CategoryRef, PendingStatus};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> PageResponse<T> {
    pub fn from_page<R>(page: CursorPage<R>) -> Self
    where
        T: From<R>,
    {
        Self {
            items: page.items.into_iter().map(T::from).collect(),
            next_cursor: page.next_cursor,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PendingQuery {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<CategoryRecord> for CategoryResponse {
    fn from(record: CategoryRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestResponse {
    pub id: Uuid,
    pub uid: String,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<GuestRecord> for GuestResponse {
    fn from(record: GuestRecord) -> Self {
        Self {
            id: record.id,
            uid: record.uid,
            name: record.name,
            email: record.email,
            profile_picture: record.profile_picture,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub content_html: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub image: Option<String>,
    pub category_id: CategoryRef,
    pub category_name: String,
    pub author_id: AuthorRef,
    pub author_name: String,
    pub author_image: Option<String>,
}

impl From<PublishedPostRecord> for PostResponse {
    fn from(record: PublishedPostRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            content_html: record.content_html,
            date: record.date,
            image: record.image,
            category_id: record.category_id,
            category_name: record.category_name,
            author_id: record.author_id,
            author_name: record.author_name,
            author_image: record.author_image,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPostResponse {
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
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub rejected_at: Option<OffsetDateTime>,
}

impl From<PendingPostRecord> for PendingPostResponse {
    fn from(record: PendingPostRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            content_html: record.content_html,
            author_id: record.author_id,
            author_name: record.author_name,
            author_image: record.author_image,
            image: record.image,
            category_id: record.category_id,
            category_name: record.category_name,
            status: record.status,
            submitted_at: record.submitted_at,
            rejected_at: record.rejected_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub embed_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

impl From<EpisodeRecord> for EpisodeResponse {
    fn from(record: EpisodeRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            embed_code: record.embed_code,
            date: record.date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEntryResponse {
    pub id: Uuid,
    pub title: String,
    pub status: PendingStatus,
    pub category_name: String,
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub rejected_at: Option<OffsetDateTime>,
}

impl From<DashboardEntry> for DashboardEntryResponse {
    fn from(entry: DashboardEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            status: entry.status,
            category_name: entry.category_name,
            image: entry.image,
            date: entry.date,
            rejected_at: entry.rejected_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub posts: Vec<DashboardEntryResponse>,
    pub counts: StatusCounts,
}

impl From<GuestDashboard> for DashboardResponse {
    fn from(dashboard: GuestDashboard) -> Self {
        Self {
            posts: dashboard.entries.into_iter().map(Into::into).collect(),
            counts: dashboard.counts,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub published_posts: u64,
    pub pending_posts: u64,
    pub guests: u64,
    pub episodes: u64,
}

impl From<AdminOverview> for OverviewResponse {
    fn from(overview: AdminOverview) -> Self {
        Self {
            published_posts: overview.published_posts,
            pending_posts: overview.pending_posts,
            guests: overview.guests,
            episodes: overview.episodes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl From<IdentityUser> for UserResponse {
    fn from(user: IdentityUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatusResponse {
    pub is_admin: bool,
    pub user: Option<UserResponse>,
}

impl From<SetupStatus> for SetupStatusResponse {
    fn from(status: SetupStatus) -> Self {
        Self {
            is_admin: status.is_admin,
            user: status.user.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuestResponse {
    pub success: bool,
    pub uid: String,
    pub doc_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UidResponse {
    pub uid: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCategoryResponse {
    pub success: bool,
    pub reassigned_posts: u64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Request bodies keep every field optional so a missing one surfaces as
/// `Missing required fields` rather than a deserializer rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuestRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAdminClaimRequest {
    pub uid: Option<String>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<String>,
    pub author_id: Option<String>,
    pub image: Option<String>,
}

/// `image: null` clears the image; an absent key leaves it untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGuestRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub profile_picture: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub embed_code: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_post_distinguishes_null_from_absent() {
        let cleared: UpdatePostRequest = serde_json::from_str(r#"{"image":null}"#).unwrap();
        assert_eq!(cleared.image, Some(None));

        let untouched: UpdatePostRequest = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(untouched.image, None);
    }

    #[test]
    fn pending_post_serializes_camel_case() {
        let record = PendingPostRecord {
            id: Uuid::nil(),
            title: "Sleep Science".into(),
            content: "# Hi".into(),
            content_html: "<h1>Hi</h1>\n".into(),
            author_id: AuthorRef::Guest("g1".into()),
            author_name: "Guest One".into(),
            author_image: None,
            image: None,
            category_id: CategoryRef::Unknown,
            category_name: "Unknown".into(),
            status: PendingStatus::Rejected,
            submitted_at: OffsetDateTime::UNIX_EPOCH,
            rejected_at: Some(OffsetDateTime::UNIX_EPOCH),
        };

        let json = serde_json::to_value(PendingPostResponse::from(record)).unwrap();
        assert_eq!(json["authorId"], "g1");
        assert_eq!(json["categoryId"], "unknown");
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["rejectedAt"], "1970-01-01T00:00:00Z");
        assert_eq!(json["contentHtml"], "<h1>Hi</h1>\n");
    }
}
