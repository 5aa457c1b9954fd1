use std::sync::Arc;

use crate::application::accounts::AccountService;
use crate::application::authors::AuthorDirectory;
use crate::application::categories::CategoryService;
use crate::application::dashboard::DashboardService;
use crate::application::episodes::EpisodeService;
use crate::application::guests::GuestService;
use crate::application::identity::{IdentityProvider, SessionVerifier};
use crate::application::publication::PublicationService;
use crate::application::render::RenderService;
use crate::application::repos::{
    CategoriesRepo, EpisodesRepo, GuestsRepo, PendingPostsRepo, PostsRepo,
};
use crate::application::submissions::SubmissionService;
use crate::application::uploads::{ImageStore, UploadService};
use crate::cache::QueryCache;
use crate::config::SiteSettings;
use crate::infra::db::PostgresRepositories;

/// Outbound collaborators the services are wired against.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub images: Arc<dyn ImageStore>,
    pub sessions: Arc<dyn SessionVerifier>,
    pub renderer: Arc<dyn RenderService>,
    pub cache: Option<Arc<QueryCache>>,
}

#[derive(Clone)]
pub struct HttpState {
    pub categories: Arc<CategoryService>,
    pub guests: Arc<GuestService>,
    pub submissions: Arc<SubmissionService>,
    pub publication: Arc<PublicationService>,
    pub episodes: Arc<EpisodeService>,
    pub accounts: Arc<AccountService>,
    pub dashboard: Arc<DashboardService>,
    pub uploads: Arc<UploadService>,
    pub sessions: Arc<dyn SessionVerifier>,
    pub db: Option<Arc<PostgresRepositories>>,
    pub post_page_size: u32,
    pub upload_body_limit: usize,
}

impl HttpState {
    /// Builds every service over one store that implements all repositories.
    pub fn assemble<R>(
        repos: Arc<R>,
        collaborators: Collaborators,
        site: &SiteSettings,
        max_upload_bytes: usize,
    ) -> Self
    where
        R: CategoriesRepo + GuestsRepo + PendingPostsRepo + PostsRepo + EpisodesRepo + 'static,
    {
        let Collaborators {
            identity,
            images,
            sessions,
            renderer,
            cache,
        } = collaborators;

        let mut categories = CategoryService::new(repos.clone());
        let mut episodes = EpisodeService::new(repos.clone());
        if let Some(cache) = cache.as_ref() {
            categories = categories.with_cache(cache.clone());
            episodes = episodes.with_cache(cache.clone());
        }

        let authors = AuthorDirectory::new(repos.clone(), site.author_name.clone());
        let mut submissions = SubmissionService::new(
            repos.clone(),
            categories.clone(),
            authors.clone(),
            renderer.clone(),
        );
        let mut publication =
            PublicationService::new(repos.clone(), categories.clone(), authors, renderer);
        if let Some(cache) = cache.as_ref() {
            submissions = submissions.with_cache(cache.clone());
            publication = publication.with_cache(cache.clone());
        }

        let guests = GuestService::new(
            repos.clone(),
            identity.clone(),
            site.guest_page_size.get(),
        );
        let accounts =
            AccountService::new(identity, guests.clone(), site.bootstrap_admin_email.clone());
        let dashboard =
            DashboardService::new(repos.clone(), repos.clone(), repos.clone(), repos);

        Self {
            categories: Arc::new(categories),
            guests: Arc::new(guests),
            submissions: Arc::new(submissions),
            publication: Arc::new(publication),
            episodes: Arc::new(episodes),
            accounts: Arc::new(accounts),
            dashboard: Arc::new(dashboard),
            uploads: Arc::new(UploadService::new(images, max_upload_bytes)),
            sessions,
            db: None,
            post_page_size: site.post_page_size.get(),
            upload_body_limit: max_upload_bytes,
        }
    }

    /// Enables the database probe on `/health`.
    pub fn with_database(mut self, db: Arc<PostgresRepositories>) -> Self {
        self.db = Some(db);
        self
    }
}
