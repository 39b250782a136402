use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use releasehub_core::{DomainError, DomainResult, ReleaseId, UserId};

/// Message returned when a release is saved without a usable name.
pub const NAME_REQUIRED: &str = "Please fill Release name";

/// A release record as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub name: String,
    pub created: DateTime<Utc>,
    pub user: Option<UserId>,
}

/// Input for creating a release.
///
/// There is deliberately no owner field: the owner is always the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRelease {
    pub name: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

/// Fields a client may change on an existing release.
///
/// Absent fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseChanges {
    pub name: Option<String>,
}

impl Release {
    /// Build a new release owned by `owner`.
    ///
    /// `created` defaults to `now` when the input does not carry one.
    pub fn create(input: NewRelease, owner: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = normalize_name(input.name.as_deref().unwrap_or_default())?;

        Ok(Self {
            id: ReleaseId::new(),
            name,
            created: input.created.unwrap_or(now),
            user: Some(owner),
        })
    }

    /// Merge `changes` into a copy of this release and re-validate it.
    ///
    /// `id`, `created` and `user` are never touched.
    pub fn merged(&self, changes: ReleaseChanges) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(name) = changes.name {
            next.name = normalize_name(&name)?;
        }
        next.validate()?;
        Ok(next)
    }

    /// Check the stored invariants. Stores call this before every write.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation(NAME_REQUIRED));
        }
        Ok(())
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user == Some(user)
    }
}

/// Trim a candidate name; an empty result is a validation failure.
pub fn normalize_name(raw: &str) -> DomainResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(NAME_REQUIRED));
    }
    Ok(trimmed.to_string())
}
