//! In-process repository implementation.
//!
//! Backs the service when no database is configured and drives the test
//! suites. All collections live behind one lock, so the multi-record writes
//! (category cascade, approval) are atomic with respect to every reader.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::application::pagination::{
    CursorPage, GuestCursor, PageRequest, PendingCursor, PostCursor,
};
use crate::application::repos::{
    ApprovePendingParams, CategoriesRepo, CreateCategoryParams, CreateEpisodeParams,
    CreateGuestParams, CreatePendingPostParams, CreatePostParams, EpisodesRepo, GuestsRepo,
    PendingPostsRepo, PendingQueryFilter, PostQueryFilter, PostsRepo, RepoError,
    UpdateEpisodeParams, UpdateGuestParams, UpdatePostParams,
};
use crate::domain::entities::{
    CategoryRecord, EpisodeRecord, GuestRecord, PendingPostRecord, PublishedPostRecord,
};
use crate::domain::types::{AuthorRef, CategoryRef, PendingStatus, UNKNOWN_CATEGORY_NAME};

#[derive(Default)]
struct MemoryState {
    categories: HashMap<Uuid, CategoryRecord>,
    guests: HashMap<Uuid, GuestRecord>,
    posts: HashMap<Uuid, PublishedPostRecord>,
    pending: HashMap<Uuid, PendingPostRecord>,
    episodes: HashMap<Uuid, EpisodeRecord>,
}

#[derive(Clone, Default)]
pub struct MemoryRepositories {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

fn normalized_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// Sorts newest first on `(time, id)`, keeps only rows past the cursor and
/// over-fetches one row so the page knows whether another follows.
fn paginate<T>(
    mut rows: Vec<T>,
    key: impl Fn(&T) -> (OffsetDateTime, Uuid),
    past_cursor: impl Fn(&T) -> bool,
    limit: u32,
    encode: impl Fn(&T) -> String,
) -> CursorPage<T> {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    let rows: Vec<T> = rows
        .into_iter()
        .filter(|row| past_cursor(row))
        .take(limit as usize + 1)
        .collect();
    CursorPage::from_overfetch(rows, limit, encode)
}

fn matches_post(post: &PublishedPostRecord, filter: &PostQueryFilter) -> bool {
    filter.category.is_none_or(|category| post.category_id == category)
        && filter
            .author
            .as_ref()
            .is_none_or(|author| &post.author_id == author)
}

#[async_trait]
impl CategoriesRepo for MemoryRepositories {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let state = self.state.read().await;
        let mut categories: Vec<_> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn find_category_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let wanted = normalized_name(name);
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .find(|category| normalized_name(&category.name) == wanted)
            .cloned())
    }

    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.write().await;
        let wanted = normalized_name(&params.name);
        if state
            .categories
            .values()
            .any(|category| normalized_name(&category.name) == wanted)
        {
            return Err(RepoError::Duplicate {
                constraint: "categories_name_key".to_string(),
            });
        }

        let record = CategoryRecord {
            id: Uuid::new_v4(),
            name: params.name,
            created_at: OffsetDateTime::now_utc(),
        };
        state.categories.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete_category_cascade(&self, id: Uuid) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&id) {
            return Err(RepoError::NotFound);
        }

        let mut reassigned = 0;
        for post in state.posts.values_mut() {
            if post.category_id == CategoryRef::Known(id) {
                post.category_id = CategoryRef::Unknown;
                post.category_name = UNKNOWN_CATEGORY_NAME.to_string();
                reassigned += 1;
            }
        }
        state.categories.remove(&id);
        Ok(reassigned)
    }
}

#[async_trait]
impl GuestsRepo for MemoryRepositories {
    async fn list_guests(
        &self,
        page: PageRequest<GuestCursor>,
    ) -> Result<CursorPage<GuestRecord>, RepoError> {
        let rows: Vec<_> = self.state.read().await.guests.values().cloned().collect();
        Ok(paginate(
            rows,
            |guest| (guest.created_at, guest.id),
            |guest| page.cursor.is_none_or(|cursor| cursor.precedes(guest.created_at, guest.id)),
            page.effective_limit(),
            |guest| GuestCursor::new(guest.created_at, guest.id).encode(),
        ))
    }

    async fn find_guest(&self, id: Uuid) -> Result<Option<GuestRecord>, RepoError> {
        Ok(self.state.read().await.guests.get(&id).cloned())
    }

    async fn find_guest_by_uid(&self, uid: &str) -> Result<Option<GuestRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.guests.values().find(|guest| guest.uid == uid).cloned())
    }

    async fn create_guest(&self, params: CreateGuestParams) -> Result<GuestRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.guests.values().any(|guest| guest.uid == params.uid) {
            return Err(RepoError::Duplicate {
                constraint: "guests_uid_key".to_string(),
            });
        }

        let record = GuestRecord {
            id: Uuid::new_v4(),
            uid: params.uid,
            name: params.name,
            email: params.email,
            profile_picture: params.profile_picture,
            created_at: OffsetDateTime::now_utc(),
        };
        state.guests.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_guest(&self, params: UpdateGuestParams) -> Result<GuestRecord, RepoError> {
        let mut state = self.state.write().await;
        let guest = state.guests.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        guest.name = params.name;
        guest.email = params.email;
        guest.profile_picture = params.profile_picture;
        Ok(guest.clone())
    }

    async fn delete_guest(&self, id: Uuid) -> Result<(), RepoError> {
        self.state
            .write()
            .await
            .guests
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn count_guests(&self) -> Result<u64, RepoError> {
        Ok(count(self.state.read().await.guests.len()))
    }
}

#[async_trait]
impl PendingPostsRepo for MemoryRepositories {
    async fn list_pending(
        &self,
        filter: &PendingQueryFilter,
        page: PageRequest<PendingCursor>,
    ) -> Result<CursorPage<PendingPostRecord>, RepoError> {
        let rows: Vec<_> = self
            .state
            .read()
            .await
            .pending
            .values()
            .filter(|post| filter.status.is_none_or(|status| post.status == status))
            .cloned()
            .collect();
        let status = filter.status;
        Ok(paginate(
            rows,
            |post| (post.submitted_at, post.id),
            |post| page.cursor.is_none_or(|cursor| cursor.precedes(post.submitted_at, post.id)),
            page.effective_limit(),
            |post| PendingCursor::new(status, post.submitted_at, post.id).encode(),
        ))
    }

    async fn list_pending_by_author(
        &self,
        author: &AuthorRef,
    ) -> Result<Vec<PendingPostRecord>, RepoError> {
        let mut rows: Vec<_> = self
            .state
            .read()
            .await
            .pending
            .values()
            .filter(|post| &post.author_id == author)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.submitted_at, b.id).cmp(&(a.submitted_at, a.id)));
        Ok(rows)
    }

    async fn find_pending(&self, id: Uuid) -> Result<Option<PendingPostRecord>, RepoError> {
        Ok(self.state.read().await.pending.get(&id).cloned())
    }

    async fn create_pending(
        &self,
        params: CreatePendingPostParams,
    ) -> Result<PendingPostRecord, RepoError> {
        let record = PendingPostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            content: params.content,
            content_html: params.content_html,
            author_id: params.author_id,
            author_name: params.author_name,
            author_image: params.author_image,
            image: params.image,
            category_id: params.category_id,
            category_name: params.category_name,
            status: PendingStatus::Pending,
            submitted_at: params.submitted_at,
            rejected_at: None,
        };
        self.state
            .write()
            .await
            .pending
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn reject_pending(
        &self,
        id: Uuid,
        rejected_at: OffsetDateTime,
    ) -> Result<Option<PendingPostRecord>, RepoError> {
        let mut state = self.state.write().await;
        match state.pending.get_mut(&id) {
            Some(post) if post.status == PendingStatus::Pending => {
                post.status = PendingStatus::Rejected;
                post.rejected_at = Some(rejected_at);
                Ok(Some(post.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn approve_pending(
        &self,
        params: ApprovePendingParams,
    ) -> Result<Option<PublishedPostRecord>, RepoError> {
        let mut state = self.state.write().await;
        let still_pending = state
            .pending
            .get(&params.id)
            .is_some_and(|post| post.status == PendingStatus::Pending);
        if !still_pending {
            return Ok(None);
        }
        let Some(pending) = state.pending.remove(&params.id) else {
            return Ok(None);
        };

        let post = PublishedPostRecord {
            id: Uuid::new_v4(),
            title: pending.title,
            content: params.content,
            content_html: params.content_html,
            date: params.published_at,
            image: pending.image,
            category_id: params.category_id,
            category_name: params.category_name,
            author_id: pending.author_id,
            author_name: params.author_name,
            author_image: params.author_image,
        };
        state.posts.insert(post.id, post.clone());
        Ok(Some(post))
    }

    async fn count_pending(&self, status: Option<PendingStatus>) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(count(
            state
                .pending
                .values()
                .filter(|post| status.is_none_or(|status| post.status == status))
                .count(),
        ))
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PublishedPostRecord>, RepoError> {
        let rows: Vec<_> = self
            .state
            .read()
            .await
            .posts
            .values()
            .filter(|post| matches_post(post, filter))
            .cloned()
            .collect();
        Ok(paginate(
            rows,
            |post| (post.date, post.id),
            |post| page.cursor.is_none_or(|cursor| cursor.precedes(post.date, post.id)),
            page.effective_limit(),
            |post| PostCursor::new(post.date, post.id).encode(),
        ))
    }

    async fn list_posts_matching(
        &self,
        filter: &PostQueryFilter,
    ) -> Result<Vec<PublishedPostRecord>, RepoError> {
        let mut rows: Vec<_> = self
            .state
            .read()
            .await
            .posts
            .values()
            .filter(|post| matches_post(post, filter))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.date, b.id).cmp(&(a.date, a.id)));
        Ok(rows)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PublishedPostRecord>, RepoError> {
        Ok(self.state.read().await.posts.get(&id).cloned())
    }

    async fn create_post(
        &self,
        params: CreatePostParams,
    ) -> Result<PublishedPostRecord, RepoError> {
        let record = PublishedPostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            content: params.content,
            content_html: params.content_html,
            date: params.date,
            image: params.image,
            category_id: params.category_id,
            category_name: params.category_name,
            author_id: params.author_id,
            author_name: params.author_name,
            author_image: params.author_image,
        };
        self.state
            .write()
            .await
            .posts
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_post(
        &self,
        params: UpdatePostParams,
    ) -> Result<PublishedPostRecord, RepoError> {
        let mut state = self.state.write().await;
        let post = state.posts.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.content = params.content;
        post.content_html = params.content_html;
        post.image = params.image;
        post.category_id = params.category_id;
        post.category_name = params.category_name;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        self.state
            .write()
            .await
            .posts
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn count_posts(&self) -> Result<u64, RepoError> {
        Ok(count(self.state.read().await.posts.len()))
    }
}

#[async_trait]
impl EpisodesRepo for MemoryRepositories {
    async fn list_episodes(&self) -> Result<Vec<EpisodeRecord>, RepoError> {
        let mut rows: Vec<_> = self.state.read().await.episodes.values().cloned().collect();
        rows.sort_by(|a, b| (b.date, b.id).cmp(&(a.date, a.id)));
        Ok(rows)
    }

    async fn find_episode(&self, id: Uuid) -> Result<Option<EpisodeRecord>, RepoError> {
        Ok(self.state.read().await.episodes.get(&id).cloned())
    }

    async fn create_episode(
        &self,
        params: CreateEpisodeParams,
    ) -> Result<EpisodeRecord, RepoError> {
        let record = EpisodeRecord {
            id: Uuid::new_v4(),
            title: params.title,
            description: params.description,
            embed_code: params.embed_code,
            date: params.date,
        };
        self.state
            .write()
            .await
            .episodes
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_episode(
        &self,
        params: UpdateEpisodeParams,
    ) -> Result<EpisodeRecord, RepoError> {
        let mut state = self.state.write().await;
        let episode = state
            .episodes
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        episode.title = params.title;
        episode.description = params.description;
        episode.embed_code = params.embed_code;
        episode.date = params.date;
        Ok(episode.clone())
    }

    async fn delete_episode(&self, id: Uuid) -> Result<(), RepoError> {
        self.state
            .write()
            .await
            .episodes
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn count_episodes(&self) -> Result<u64, RepoError> {
        Ok(count(self.state.read().await.episodes.len()))
    }
}
