//! Release storage abstractions.
//!
//! ```text
//! handlers
//!     → ReleaseStore (insert / find / save / remove / list)
//!         → in_memory.rs (tests/dev)
//!         → postgres.rs  (USE_PERSISTENT_STORES=true)
//!     → UserDirectory (owner display names; the in-memory store resolves
//!       owners through it, Postgres joins the same `users` table)
//! ```
//!
//! Every write re-runs `Release::validate` before touching the backend, so an
//! invalid record never reaches storage regardless of which adapter is used.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use releasehub_core::{DomainError, ReleaseId, UserId};
use releasehub_releases::Release;

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryReleaseStore, InMemoryUserDirectory};
pub use postgres::{PostgresReleaseStore, PostgresUserDirectory};

/// The subset of a user exposed next to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub display_name: String,
}

/// A release with its owner resolved from the user directory.
///
/// `owner` is `None` when the release has no owner, or when the owner id no
/// longer resolves to a known user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulatedRelease {
    pub release: Release,
    pub owner: Option<UserSummary>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The record failed model validation on save.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// A unique constraint rejected the write.
    #[error("duplicate value for {field}")]
    Duplicate { field: String },

    /// A foreign key points at a row that does not exist.
    #[error("unknown reference in {field}")]
    UnknownReference { field: String },

    /// The record disappeared between load and write.
    #[error("record not found")]
    NotFound,

    /// Anything else the backend reports (connection, decode, ...).
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Message safe to hand back to a client.
    ///
    /// Validation messages pass through verbatim, unique violations become
    /// "`<Field>` already exists", dangling references become
    /// "`<Entity>` does not exist", and backend details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            StoreError::Validation(e) => e.to_string(),
            StoreError::Duplicate { field } => format!("{} already exists", capitalize(field)),
            StoreError::UnknownReference { field } => {
                let entity = field.strip_suffix("_id").unwrap_or(field);
                format!("{} does not exist", capitalize(entity))
            }
            StoreError::NotFound => "Release not found".to_string(),
            StoreError::Backend(_) => "Something went wrong".to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Persistence port for releases.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Persist a new release.
    async fn insert(&self, release: Release) -> Result<PopulatedRelease, StoreError>;

    /// Look a release up by id, owner populated.
    async fn find(&self, id: ReleaseId) -> Result<Option<PopulatedRelease>, StoreError>;

    /// Overwrite an existing release.
    async fn save(&self, release: Release) -> Result<PopulatedRelease, StoreError>;

    /// Delete a release by id.
    async fn remove(&self, id: ReleaseId) -> Result<(), StoreError>;

    /// Every release, most recently created first.
    async fn list_newest_first(&self) -> Result<Vec<PopulatedRelease>, StoreError>;
}

/// Read access to the (externally managed) user collection.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<UserSummary>, StoreError>;

    /// Register or rename a user. Used for seeding and by the sign-up side
    /// of the application.
    async fn upsert(&self, user: UserSummary) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> ReleaseStore for Arc<S>
where
    S: ReleaseStore + ?Sized,
{
    async fn insert(&self, release: Release) -> Result<PopulatedRelease, StoreError> {
        (**self).insert(release).await
    }

    async fn find(&self, id: ReleaseId) -> Result<Option<PopulatedRelease>, StoreError> {
        (**self).find(id).await
    }

    async fn save(&self, release: Release) -> Result<PopulatedRelease, StoreError> {
        (**self).save(release).await
    }

    async fn remove(&self, id: ReleaseId) -> Result<(), StoreError> {
        (**self).remove(id).await
    }

    async fn list_newest_first(&self) -> Result<Vec<PopulatedRelease>, StoreError> {
        (**self).list_newest_first().await
    }
}

#[async_trait]
impl<S> UserDirectory for Arc<S>
where
    S: UserDirectory + ?Sized,
{
    async fn get(&self, id: UserId) -> Result<Option<UserSummary>, StoreError> {
        (**self).get(id).await
    }

    async fn upsert(&self, user: UserSummary) -> Result<(), StoreError> {
        (**self).upsert(user).await
    }
}
