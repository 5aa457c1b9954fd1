use std::sync::Arc;

use tracing::warn;

use crate::application::repos::{GuestsRepo, RepoError};
use crate::domain::types::AuthorRef;

/// Denormalized author fields copied onto posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorSnapshot {
    pub name: String,
    pub image: Option<String>,
}

/// Resolves an [`AuthorRef`] to the name and picture shown on posts.
#[derive(Clone)]
pub struct AuthorDirectory {
    guests: Arc<dyn GuestsRepo>,
    site_author_name: String,
}

impl AuthorDirectory {
    pub fn new(guests: Arc<dyn GuestsRepo>, site_author_name: impl Into<String>) -> Self {
        Self {
            guests,
            site_author_name: site_author_name.into(),
        }
    }

    /// Guests without a registry entry are shown under the site name.
    pub async fn resolve(&self, author: &AuthorRef) -> Result<AuthorSnapshot, RepoError> {
        let uid = match author {
            AuthorRef::Site => return Ok(self.site_snapshot()),
            AuthorRef::Guest(uid) => uid,
        };

        match self.guests.find_guest_by_uid(uid).await? {
            Some(guest) => Ok(AuthorSnapshot {
                name: guest.name,
                image: guest.profile_picture,
            }),
            None => {
                warn!(uid = %uid, "author has no guest profile, using site author");
                Ok(self.site_snapshot())
            }
        }
    }

    fn site_snapshot(&self) -> AuthorSnapshot {
        AuthorSnapshot {
            name: self.site_author_name.clone(),
            image: None,
        }
    }
}
