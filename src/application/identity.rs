//! Identity provider seam: account administration and session verification.
//!
//! Accounts live with an external provider. The service never reads an
//! ambient "current user"; handlers verify the bearer token into a
//! [`Session`] and hand it to every operation that cares who is calling.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::types::AuthorRef;

/// The verified caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl Session {
    pub fn guest(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            is_admin: false,
        }
    }

    /// Submissions are always attributed to the caller's own account.
    pub fn as_author(&self) -> AuthorRef {
        AuthorRef::Guest(self.uid.clone())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no session token was presented")]
    Missing,
    #[error("session token is invalid")]
    Invalid,
    #[error("session token has expired")]
    Expired,
    #[error("session verification is not configured")]
    NotConfigured,
}

pub trait SessionVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Session, SessionError>;
}

#[derive(Debug, Clone)]
pub struct NewIdentityUser {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity account already exists for this email")]
    EmailExists,
    #[error("identity account not found")]
    UserNotFound,
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    #[error("identity provider request failed: {0}")]
    Transport(String),
    #[error("identity provider is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_user(&self, user: NewIdentityUser) -> Result<IdentityUser, IdentityError>;

    async fn delete_user(&self, uid: &str) -> Result<(), IdentityError>;

    async fn get_user(&self, uid: &str) -> Result<Option<IdentityUser>, IdentityError>;

    async fn get_user_by_email(&self, email: &str)
    -> Result<Option<IdentityUser>, IdentityError>;

    /// Replaces the account's custom claims with `{ "admin": is_admin }`.
    async fn set_admin_claim(&self, uid: &str, is_admin: bool) -> Result<(), IdentityError>;
}
