//! Read models: the guest dashboard and the admin overview.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::identity::Session;
use crate::application::repos::{
    EpisodesRepo, GuestsRepo, PendingPostsRepo, PostQueryFilter, PostsRepo, RepoError,
};
use crate::domain::entities::{PendingPostRecord, PublishedPostRecord};
use crate::domain::types::PendingStatus;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// One of the caller's posts, whichever collection it currently lives in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardEntry {
    pub id: Uuid,
    pub title: String,
    pub status: PendingStatus,
    pub category_name: String,
    pub image: Option<String>,
    /// Submission time for pending and rejected entries, publication time otherwise.
    pub date: OffsetDateTime,
    pub rejected_at: Option<OffsetDateTime>,
}

impl From<PendingPostRecord> for DashboardEntry {
    fn from(post: PendingPostRecord) -> Self {
        Self {
            id: post.id,
            title: post.title,
            status: post.status,
            category_name: post.category_name,
            image: post.image,
            date: post.submitted_at,
            rejected_at: post.rejected_at,
        }
    }
}

impl From<PublishedPostRecord> for DashboardEntry {
    fn from(post: PublishedPostRecord) -> Self {
        Self {
            id: post.id,
            title: post.title,
            status: PendingStatus::Approved,
            category_name: post.category_name,
            image: post.image,
            date: post.date,
            rejected_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuestDashboard {
    pub entries: Vec<DashboardEntry>,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdminOverview {
    pub published_posts: u64,
    pub pending_posts: u64,
    pub guests: u64,
    pub episodes: u64,
}

#[derive(Clone)]
pub struct DashboardService {
    pending: Arc<dyn PendingPostsRepo>,
    posts: Arc<dyn PostsRepo>,
    guests: Arc<dyn GuestsRepo>,
    episodes: Arc<dyn EpisodesRepo>,
}

impl DashboardService {
    pub fn new(
        pending: Arc<dyn PendingPostsRepo>,
        posts: Arc<dyn PostsRepo>,
        guests: Arc<dyn GuestsRepo>,
        episodes: Arc<dyn EpisodesRepo>,
    ) -> Self {
        Self {
            pending,
            posts,
            guests,
            episodes,
        }
    }

    /// Everything the caller has submitted or had published, newest first.
    pub async fn guest_dashboard(
        &self,
        session: &Session,
    ) -> Result<GuestDashboard, DashboardError> {
        let author = session.as_author();
        let filter = PostQueryFilter {
            category: None,
            author: Some(author.clone()),
        };
        let (pending, published) = tokio::try_join!(
            self.pending.list_pending_by_author(&author),
            self.posts.list_posts_matching(&filter)
        )?;

        let mut entries: Vec<DashboardEntry> = pending
            .into_iter()
            .map(DashboardEntry::from)
            .chain(published.into_iter().map(DashboardEntry::from))
            .collect();
        entries.sort_by(|a, b| (b.date, b.id).cmp(&(a.date, a.id)));

        let mut counts = StatusCounts::default();
        for entry in &entries {
            match entry.status {
                PendingStatus::Pending => counts.pending += 1,
                PendingStatus::Approved => counts.approved += 1,
                PendingStatus::Rejected => counts.rejected += 1,
            }
        }

        Ok(GuestDashboard { entries, counts })
    }

    pub async fn admin_overview(&self) -> Result<AdminOverview, DashboardError> {
        let (published_posts, pending_posts, guests, episodes) = tokio::try_join!(
            self.posts.count_posts(),
            self.pending.count_pending(Some(PendingStatus::Pending)),
            self.guests.count_guests(),
            self.episodes.count_episodes()
        )?;

        Ok(AdminOverview {
            published_posts,
            pending_posts,
            guests,
            episodes,
        })
    }
}
