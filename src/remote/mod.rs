//! Contracts for the hosted data/auth/storage service the client talks to.
//!
//! The client core only ever sees these traits. `sqlite`, `auth::LocalAuth`
//! and `storage::FsObjectStorage` are local stand-ins for the hosted service.

pub mod auth;
pub mod sqlite;
pub mod storage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::db::models::*;

pub use self::auth::{AuthClient, AuthEvent, DynAuthClient, LocalAuth, Session, SessionUser};
pub use self::sqlite::SqliteDataClient;
pub use self::storage::{DynObjectStorage, FsObjectStorage, ObjectStorage, UploadOptions};

/// Error code the remote service uses for unique constraint violations.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("duplicate key value violates unique constraint: {0}")]
    UniqueViolation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Auth error: {0}")]
    Auth(String),
}

impl RemoteError {
    /// Structured error code, when the service supplies one.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::UniqueViolation(_) => Some(UNIQUE_VIOLATION),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some(UNIQUE_VIOLATION)
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Filters for reading the post collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PostQuery {
    pub status: PostStatus,
    pub kind: Option<PostKind>,
    pub user_id: Option<String>,
    /// Case-insensitive partial match against caption OR author name.
    pub search: Option<String>,
    pub pinned_first: bool,
    pub limit: Option<usize>,
}

impl PostQuery {
    pub fn active() -> Self {
        Self {
            status: PostStatus::Active,
            kind: None,
            user_id: None,
            search: None,
            pinned_first: false,
            limit: None,
        }
    }
}

/// Restricts a post mutation. `owner: None` is the admin scope (any post).
#[derive(Debug, Clone, PartialEq)]
pub struct PostScope {
    pub post_id: String,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpportunityQuery {
    pub kind: Option<String>,
    pub eligible_year: Option<u8>,
}

/// Table operations on the remote service.
#[async_trait]
pub trait DataClient: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> RemoteResult<Option<Profile>>;

    async fn insert_profile(&self, profile: &NewProfile) -> RemoteResult<Profile>;

    /// Returns the updated row, or `None` when no row matched.
    async fn update_profile(
        &self,
        user_id: &str,
        patch: &ProfilePatch,
    ) -> RemoteResult<Option<Profile>>;

    async fn select_posts(&self, query: &PostQuery) -> RemoteResult<Vec<Post>>;

    async fn count_posts_since(&self, user_id: &str, since: DateTime<Utc>) -> RemoteResult<u64>;

    async fn insert_post(&self, post: &NewPost) -> RemoteResult<Post>;

    /// Returns the number of rows affected.
    async fn update_caption(&self, scope: &PostScope, caption: &str) -> RemoteResult<u64>;

    /// Returns the number of rows affected.
    async fn delete_post(&self, scope: &PostScope) -> RemoteResult<u64>;

    async fn liked_post_ids(&self, user_id: &str, post_ids: &[String])
        -> RemoteResult<Vec<String>>;

    async fn insert_like(&self, post_id: &str, user_id: &str) -> RemoteResult<()>;

    async fn delete_like(&self, post_id: &str, user_id: &str) -> RemoteResult<u64>;

    async fn list_comments(&self, post_id: &str) -> RemoteResult<Vec<Comment>>;

    async fn insert_comment(&self, comment: &NewComment) -> RemoteResult<()>;

    async fn find_report(&self, post_id: &str, reporter_id: &str) -> RemoteResult<Option<Report>>;

    async fn insert_report(&self, report: &NewReport) -> RemoteResult<()>;

    async fn select_opportunities(
        &self,
        query: &OpportunityQuery,
    ) -> RemoteResult<Vec<Opportunity>>;

    async fn select_resources(&self, year: u8) -> RemoteResult<Vec<AcademicResource>>;

    async fn select_lost_found(
        &self,
        status: LostFoundStatus,
        limit: usize,
    ) -> RemoteResult<Vec<LostFoundItem>>;

    async fn insert_lost_found(&self, item: &NewLostFoundItem) -> RemoteResult<()>;

    async fn insert_bug_report(&self, report: &NewBugReport) -> RemoteResult<()>;
}

pub type DynDataClient = Arc<dyn DataClient>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_carries_code() {
        let err = RemoteError::UniqueViolation("likes_pkey".into());
        assert_eq!(err.code(), Some("23505"));
        assert!(err.is_unique_violation());
    }

    #[test]
    fn other_errors_have_no_code() {
        let err = RemoteError::Auth("expired".into());
        assert_eq!(err.code(), None);
        assert!(!err.is_unique_violation());
    }
}
