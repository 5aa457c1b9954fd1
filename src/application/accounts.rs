//! Operations behind the admin account endpoints.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::application::guests::{GuestError, GuestService, ProvisionGuestCommand, ProvisionedGuest};
use crate::application::identity::{IdentityError, IdentityProvider, IdentityUser};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("User not found")]
    UserNotFound,
    #[error("admin setup is only available for the bootstrap account")]
    SetupForbidden,
    #[error("admin setup is disabled")]
    SetupDisabled,
    #[error(transparent)]
    Guest(#[from] GuestError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupStatus {
    pub is_admin: bool,
    pub user: Option<IdentityUser>,
}

#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    guests: GuestService,
    bootstrap_admin_email: Option<String>,
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        guests: GuestService,
        bootstrap_admin_email: Option<String>,
    ) -> Self {
        Self {
            identity,
            guests,
            bootstrap_admin_email,
        }
    }

    pub async fn create_guest(
        &self,
        command: ProvisionGuestCommand,
    ) -> Result<ProvisionedGuest, AccountError> {
        Ok(self.guests.provision(command).await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<IdentityUser, AccountError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AccountError::ConstraintViolation("Email is required"));
        }
        self.identity
            .get_user_by_email(email)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    /// Replaces the account's `admin` claim.
    #[tracing::instrument(skip(self))]
    pub async fn set_admin_claim(&self, uid: &str, is_admin: bool) -> Result<(), AccountError> {
        let uid = uid.trim();
        if uid.is_empty() {
            return Err(AccountError::ConstraintViolation("User id is required"));
        }
        self.identity
            .set_admin_claim(uid, is_admin)
            .await
            .map_err(|err| match err {
                IdentityError::UserNotFound => AccountError::UserNotFound,
                other => AccountError::Identity(other),
            })?;
        info!(uid, is_admin, "admin claim updated");
        Ok(())
    }

    /// Grants `admin` to the bootstrap account. Any other email is refused.
    #[tracing::instrument(skip(self))]
    pub async fn setup_grant(&self, email: &str) -> Result<(), AccountError> {
        let bootstrap = self.bootstrap_email()?;
        let email = email.trim();
        if email.is_empty() {
            return Err(AccountError::ConstraintViolation("Email is required"));
        }
        if !email.eq_ignore_ascii_case(bootstrap) {
            return Err(AccountError::SetupForbidden);
        }

        let user = self.get_user_by_email(email).await?;
        self.set_admin_claim(&user.uid, true).await?;
        info!(uid = %user.uid, "bootstrap admin granted");
        Ok(())
    }

    /// Whether the bootstrap account currently holds the `admin` claim.
    pub async fn setup_status(&self) -> Result<SetupStatus, AccountError> {
        let bootstrap = self.bootstrap_email()?;
        let user = self.identity.get_user_by_email(bootstrap).await?;
        Ok(SetupStatus {
            is_admin: user.as_ref().is_some_and(|user| user.is_admin),
            user,
        })
    }

    fn bootstrap_email(&self) -> Result<&str, AccountError> {
        self.bootstrap_admin_email
            .as_deref()
            .ok_or(AccountError::SetupDisabled)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::application::identity::NewIdentityUser;
    use crate::infra::memory::MemoryRepositories;

    #[derive(Default)]
    struct Directory {
        users: Mutex<HashMap<String, IdentityUser>>,
    }

    impl Directory {
        fn with_user(uid: &str, email: &str) -> Self {
            let directory = Self::default();
            directory.users.lock().unwrap().insert(
                uid.to_string(),
                IdentityUser {
                    uid: uid.to_string(),
                    email: Some(email.to_string()),
                    display_name: None,
                    photo_url: None,
                    is_admin: false,
                },
            );
            directory
        }
    }

    #[async_trait]
    impl IdentityProvider for Directory {
        async fn create_user(&self, _user: NewIdentityUser) -> Result<IdentityUser, IdentityError> {
            Err(IdentityError::NotConfigured)
        }

        async fn delete_user(&self, _uid: &str) -> Result<(), IdentityError> {
            Ok(())
        }

        async fn get_user(&self, uid: &str) -> Result<Option<IdentityUser>, IdentityError> {
            Ok(self.users.lock().unwrap().get(uid).cloned())
        }

        async fn get_user_by_email(
            &self,
            email: &str,
        ) -> Result<Option<IdentityUser>, IdentityError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|user| user.email.as_deref() == Some(email))
                .cloned())
        }

        async fn set_admin_claim(&self, uid: &str, is_admin: bool) -> Result<(), IdentityError> {
            let mut users = self.users.lock().unwrap();
            let user = users.get_mut(uid).ok_or(IdentityError::UserNotFound)?;
            user.is_admin = is_admin;
            Ok(())
        }
    }

    fn service(directory: Arc<Directory>, bootstrap: Option<&str>) -> AccountService {
        let guests = GuestService::new(
            Arc::new(MemoryRepositories::new()),
            directory.clone(),
            10,
        );
        AccountService::new(directory, guests, bootstrap.map(str::to_string))
    }

    #[tokio::test]
    async fn unknown_email_is_user_not_found() {
        let service = service(Arc::new(Directory::default()), None);
        let err = service
            .get_user_by_email("nobody@peaklife.test")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User not found");
    }

    #[tokio::test]
    async fn setup_grants_admin_to_bootstrap_email_only() {
        let directory = Arc::new(Directory::with_user("host", "host@peaklife.test"));
        let service = service(directory.clone(), Some("host@peaklife.test"));

        assert!(!service.setup_status().await.unwrap().is_admin);
        assert!(matches!(
            service.setup_grant("intruder@peaklife.test").await,
            Err(AccountError::SetupForbidden)
        ));

        service.setup_grant("host@peaklife.test").await.unwrap();

        let status = service.setup_status().await.unwrap();
        assert!(status.is_admin);
        assert_eq!(status.user.unwrap().uid, "host");
    }

    #[tokio::test]
    async fn setup_without_bootstrap_email_is_disabled() {
        let service = service(Arc::new(Directory::default()), None);
        assert!(matches!(
            service.setup_status().await,
            Err(AccountError::SetupDisabled)
        ));
    }

    #[tokio::test]
    async fn set_admin_claim_on_missing_user_is_not_found() {
        let service = service(Arc::new(Directory::default()), None);
        assert!(matches!(
            service.set_admin_claim("ghost", true).await,
            Err(AccountError::UserNotFound)
        ));
    }
}
