//! Shared domain enumerations and typed references.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Stored id of the sentinel category that orphaned posts are moved to.
pub const UNKNOWN_CATEGORY_ID: &str = "unknown";
/// Display name paired with [`UNKNOWN_CATEGORY_ID`].
pub const UNKNOWN_CATEGORY_NAME: &str = "Unknown";
/// Stored author id of posts written by the site itself.
pub const SITE_AUTHOR_ID: &str = "admin";

/// Review state of a guest submission (mirrors Postgres enum `pending_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "pending_status", rename_all = "snake_case")]
pub enum PendingStatus {
    Pending,
    Approved,
    Rejected,
}

impl PendingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PendingStatus::Pending => "pending",
            PendingStatus::Approved => "approved",
            PendingStatus::Rejected => "rejected",
        }
    }

    /// Only `pending` moves, and only to one of the two review outcomes.
    pub fn transition(self, to: PendingStatus) -> Result<PendingStatus, DomainError> {
        match (self, to) {
            (PendingStatus::Pending, PendingStatus::Approved | PendingStatus::Rejected) => Ok(to),
            (from, to) => Err(DomainError::Transition { from, to }),
        }
    }
}

impl fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PendingStatus {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(PendingStatus::Pending),
            "approved" => Ok(PendingStatus::Approved),
            "rejected" => Ok(PendingStatus::Rejected),
            other => Err(DomainError::validation(format!(
                "unknown submission status `{other}`"
            ))),
        }
    }
}

/// Category a post points at. Posts whose category was deleted point at the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CategoryRef {
    Known(Uuid),
    Unknown,
}

impl CategoryRef {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("category is required"));
        }
        if trimmed == UNKNOWN_CATEGORY_ID {
            return Ok(CategoryRef::Unknown);
        }
        Uuid::parse_str(trimmed)
            .map(CategoryRef::Known)
            .map_err(|_| DomainError::validation(format!("invalid category id `{trimmed}`")))
    }

    pub fn storage_key(self) -> String {
        match self {
            CategoryRef::Known(id) => id.to_string(),
            CategoryRef::Unknown => UNKNOWN_CATEGORY_ID.to_string(),
        }
    }
}

impl TryFrom<String> for CategoryRef {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CategoryRef::parse(&value)
    }
}

impl From<CategoryRef> for String {
    fn from(value: CategoryRef) -> Self {
        value.storage_key()
    }
}

impl fmt::Display for CategoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryRef::Known(id) => write!(f, "{id}"),
            CategoryRef::Unknown => f.write_str(UNKNOWN_CATEGORY_ID),
        }
    }
}

/// Author of a post: the site itself or a guest identified by identity uid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AuthorRef {
    Site,
    Guest(String),
}

impl AuthorRef {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw.trim() {
            "" => Err(DomainError::validation("author is required")),
            SITE_AUTHOR_ID => Ok(AuthorRef::Site),
            uid => Ok(AuthorRef::Guest(uid.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuthorRef::Site => SITE_AUTHOR_ID,
            AuthorRef::Guest(uid) => uid,
        }
    }
}

impl TryFrom<String> for AuthorRef {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AuthorRef::parse(&value)
    }
}

impl From<AuthorRef> for String {
    fn from(value: AuthorRef) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AuthorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_moves_once() {
        assert_eq!(
            PendingStatus::Pending
                .transition(PendingStatus::Rejected)
                .unwrap(),
            PendingStatus::Rejected
        );
        assert!(
            PendingStatus::Rejected
                .transition(PendingStatus::Approved)
                .is_err()
        );
        assert!(
            PendingStatus::Pending
                .transition(PendingStatus::Pending)
                .is_err()
        );
    }

    #[test]
    fn category_ref_parses_sentinel_and_uuid() {
        assert_eq!(CategoryRef::parse("unknown").unwrap(), CategoryRef::Unknown);
        let id = Uuid::new_v4();
        assert_eq!(
            CategoryRef::parse(&format!(" {id} ")).unwrap(),
            CategoryRef::Known(id)
        );
        assert!(CategoryRef::parse("").is_err());
        assert!(CategoryRef::parse("cat1").is_err());
    }

    #[test]
    fn author_ref_serializes_as_plain_string() {
        let json = serde_json::to_string(&AuthorRef::Site).unwrap();
        assert_eq!(json, "\"admin\"");
        let guest: AuthorRef = serde_json::from_str("\"uid-42\"").unwrap();
        assert_eq!(guest, AuthorRef::Guest("uid-42".into()));
    }
}
