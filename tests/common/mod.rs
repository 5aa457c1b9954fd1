#![allow(dead_code)]

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use time::OffsetDateTime;

use peaklife::application::identity::{
    IdentityError, IdentityProvider, IdentityUser, NewIdentityUser,
};
use peaklife::application::render::render_service;
use peaklife::application::uploads::{ImageStore, ImageUpload, StoredImage, UploadError};
use peaklife::cache::{CacheConfig, QueryCache};
use peaklife::config::{SessionSettings, SiteSettings};
use peaklife::infra::http::{Collaborators, HttpState};
use peaklife::infra::identity::{JwtSessionVerifier, SessionClaims};
use peaklife::infra::memory::MemoryRepositories;

pub const SECRET: &str = "peaklife-integration-secret";
pub const ISSUER: &str = "https://securetoken.test/peak-life";
pub const AUDIENCE: &str = "peak-life";
pub const BOOTSTRAP_EMAIL: &str = "owner@peaklife.test";

/// Identity provider holding accounts in memory.
#[derive(Default)]
pub struct FakeIdentity {
    users: Mutex<HashMap<String, IdentityUser>>,
    next_uid: Mutex<u32>,
}

impl FakeIdentity {
    pub fn insert(&self, uid: &str, email: &str) {
        self.users.lock().unwrap().insert(
            uid.to_string(),
            IdentityUser {
                uid: uid.to_string(),
                email: Some(email.to_string()),
                display_name: None,
                photo_url: None,
                is_admin: false,
            },
        );
    }

    pub fn user(&self, uid: &str) -> Option<IdentityUser> {
        self.users.lock().unwrap().get(uid).cloned()
    }

    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn create_user(&self, user: NewIdentityUser) -> Result<IdentityUser, IdentityError> {
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|existing| existing.email.as_deref() == Some(user.email.as_str()))
        {
            return Err(IdentityError::EmailExists);
        }
        let mut next = self.next_uid.lock().unwrap();
        *next += 1;
        let created = IdentityUser {
            uid: format!("uid-{next}"),
            email: Some(user.email),
            display_name: Some(user.display_name),
            photo_url: user.photo_url,
            is_admin: false,
        };
        users.insert(created.uid.clone(), created.clone());
        Ok(created)
    }

    async fn delete_user(&self, uid: &str) -> Result<(), IdentityError> {
        self.users
            .lock()
            .unwrap()
            .remove(uid)
            .map(|_| ())
            .ok_or(IdentityError::UserNotFound)
    }

    async fn get_user(&self, uid: &str) -> Result<Option<IdentityUser>, IdentityError> {
        Ok(self.user(uid))
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
            .find(|user| {
                user.email
                    .as_deref()
                    .is_some_and(|known| known.eq_ignore_ascii_case(email))
            })
            .cloned())
    }

    async fn set_admin_claim(&self, uid: &str, is_admin: bool) -> Result<(), IdentityError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(uid).ok_or(IdentityError::UserNotFound)?;
        user.is_admin = is_admin;
        Ok(())
    }
}

/// Image store that hands back a predictable URL, or fails when asked to.
#[derive(Default)]
pub struct FakeImages {
    pub fail: bool,
}

#[async_trait]
impl ImageStore for FakeImages {
    async fn store_image(&self, upload: ImageUpload) -> Result<StoredImage, UploadError> {
        if self.fail {
            return Err(UploadError::Rejected("storage offline".into()));
        }
        Ok(StoredImage {
            secure_url: format!("https://img.test/{}", upload.file_name),
        })
    }
}

pub fn site_settings() -> SiteSettings {
    SiteSettings {
        author_name: "Peak Life Journey".into(),
        bootstrap_admin_email: Some(BOOTSTRAP_EMAIL.into()),
        guest_page_size: NonZeroU32::new(10).unwrap(),
        post_page_size: NonZeroU32::new(2).unwrap(),
    }
}

pub fn session_settings() -> SessionSettings {
    SessionSettings {
        key: None,
        issuer: Some(ISSUER.into()),
        audience: Some(AUDIENCE.into()),
        leeway: Duration::from_secs(30),
    }
}

pub fn token(uid: &str, admin: bool) -> String {
    let claims = SessionClaims {
        sub: uid.to_string(),
        email: Some(format!("{uid}@peaklife.test")),
        admin,
        exp: OffsetDateTime::now_utc().unix_timestamp() + 3600,
        iss: Some(ISSUER.into()),
        aud: Some(AUDIENCE.into()),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub struct TestApp {
    pub state: HttpState,
    pub repos: Arc<MemoryRepositories>,
    pub identity: Arc<FakeIdentity>,
    pub cache: Arc<QueryCache>,
}

pub fn app() -> TestApp {
    app_with_images(FakeImages::default())
}

pub fn app_with_images(images: FakeImages) -> TestApp {
    let repos = Arc::new(MemoryRepositories::new());
    let identity = Arc::new(FakeIdentity::default());
    let cache = Arc::new(QueryCache::new(CacheConfig::default()));
    let sessions = JwtSessionVerifier::new(
        DecodingKey::from_secret(SECRET.as_bytes()),
        Algorithm::HS256,
        &session_settings(),
    );

    let state = HttpState::assemble(
        repos.clone(),
        Collaborators {
            identity: identity.clone(),
            images: Arc::new(images),
            sessions: Arc::new(sessions),
            renderer: render_service(),
            cache: Some(cache.clone()),
        },
        &site_settings(),
        1024 * 1024,
    );

    TestApp {
        state,
        repos,
        identity,
        cache,
    }
}
