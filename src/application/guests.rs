//! Podcast guest registry and account provisioning.
//!
//! A guest spans two systems: an identity account that signs in, and a
//! registry document that the site renders. Provisioning creates the account
//! first and deletes it again if the document cannot be written, so a failed
//! call leaves neither behind.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::identity::{IdentityError, IdentityProvider, NewIdentityUser};
use crate::application::pagination::{CursorPage, GuestCursor, PageRequest, PaginationError};
use crate::application::repos::{CreateGuestParams, GuestsRepo, RepoError, UpdateGuestParams};
use crate::domain::entities::GuestRecord;

#[derive(Debug, Error)]
pub enum GuestError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("guest not found")]
    NotFound,
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("Failed to create user profile")]
    ProfileWrite(#[source] RepoError),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct ProvisionGuestCommand {
    pub name: String,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProvisionedGuest {
    pub uid: String,
    pub guest: GuestRecord,
}

/// Partial update of a guest document. `profile_picture: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct GuestPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_picture: Option<Option<String>>,
}

#[derive(Clone)]
pub struct GuestService {
    guests: Arc<dyn GuestsRepo>,
    identity: Arc<dyn IdentityProvider>,
    page_size: u32,
}

impl GuestService {
    pub fn new(
        guests: Arc<dyn GuestsRepo>,
        identity: Arc<dyn IdentityProvider>,
        page_size: u32,
    ) -> Self {
        Self {
            guests,
            identity,
            page_size,
        }
    }

    #[tracing::instrument(skip(self, command), fields(email = %command.email))]
    pub async fn provision(
        &self,
        command: ProvisionGuestCommand,
    ) -> Result<ProvisionedGuest, GuestError> {
        let name = command.name.trim();
        let email = command.email.trim();
        if name.is_empty() || email.is_empty() || command.password.trim().is_empty() {
            return Err(GuestError::ConstraintViolation("Missing required fields"));
        }
        let image_url = command
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let user = self
            .identity
            .create_user(NewIdentityUser {
                email: email.to_string(),
                password: command.password,
                display_name: name.to_string(),
                photo_url: image_url.clone(),
            })
            .await?;

        let created = self
            .guests
            .create_guest(CreateGuestParams {
                uid: user.uid.clone(),
                name: name.to_string(),
                email: email.to_string(),
                profile_picture: image_url,
            })
            .await;

        match created {
            Ok(guest) => {
                info!(uid = %user.uid, guest_id = %guest.id, "guest provisioned");
                Ok(ProvisionedGuest {
                    uid: user.uid,
                    guest,
                })
            }
            Err(err) => {
                warn!(
                    uid = %user.uid,
                    error = %err,
                    "guest document write failed, removing identity account"
                );
                if let Err(rollback) = self.identity.delete_user(&user.uid).await {
                    error!(
                        uid = %user.uid,
                        error = %rollback,
                        "failed to remove identity account after guest write failure"
                    );
                }
                Err(GuestError::ProfileWrite(err))
            }
        }
    }

    /// Updates the registry document only; the identity account keeps its fields.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: GuestPatch) -> Result<GuestRecord, GuestError> {
        let current = self
            .guests
            .find_guest(id)
            .await?
            .ok_or(GuestError::NotFound)?;

        let name = match patch.name {
            Some(name) if name.trim().is_empty() => {
                return Err(GuestError::ConstraintViolation("Guest name cannot be empty"));
            }
            Some(name) => name.trim().to_string(),
            None => current.name,
        };
        let email = match patch.email {
            Some(email) if email.trim().is_empty() => {
                return Err(GuestError::ConstraintViolation("Guest email cannot be empty"));
            }
            Some(email) => email.trim().to_string(),
            None => current.email,
        };
        let profile_picture = match patch.profile_picture {
            Some(picture) => picture.filter(|url| !url.trim().is_empty()),
            None => current.profile_picture,
        };

        let updated = self
            .guests
            .update_guest(UpdateGuestParams {
                id,
                name,
                email,
                profile_picture,
            })
            .await
            .map_err(not_found_as_guest)?;
        info!(guest_id = %id, "guest updated");
        Ok(updated)
    }

    /// Removes the registry document. The identity account is kept.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), GuestError> {
        self.guests
            .delete_guest(id)
            .await
            .map_err(not_found_as_guest)?;
        info!(guest_id = %id, "guest deleted");
        Ok(())
    }

    /// Newest guests first, one fixed-size page per call.
    pub async fn list(&self, cursor: Option<&str>) -> Result<CursorPage<GuestRecord>, GuestError> {
        let cursor = cursor.map(GuestCursor::decode).transpose()?;
        let page = self
            .guests
            .list_guests(PageRequest::new(self.page_size, cursor))
            .await?;
        Ok(page)
    }
}

fn not_found_as_guest(err: RepoError) -> GuestError {
    match err {
        RepoError::NotFound => GuestError::NotFound,
        other => GuestError::Repo(other),
    }
}
