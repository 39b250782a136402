use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use releasehub_core::{ReleaseId, UserId};
use releasehub_releases::Release;

use super::{PopulatedRelease, ReleaseStore, StoreError, UserDirectory, UserSummary};

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

/// In-memory user directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    inner: RwLock<HashMap<UserId, UserSummary>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get(&self, id: UserId) -> Result<Option<UserSummary>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn upsert(&self, user: UserSummary) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(user.id, user);
        Ok(())
    }
}

/// In-memory release store for tests/dev.
///
/// Owners are resolved through the injected [`UserDirectory`] on every read,
/// the same way the Postgres adapter joins the `users` table.
pub struct InMemoryReleaseStore {
    inner: RwLock<HashMap<ReleaseId, Release>>,
    users: Arc<dyn UserDirectory>,
}

impl InMemoryReleaseStore {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            users,
        }
    }

    async fn populate(&self, release: Release) -> Result<PopulatedRelease, StoreError> {
        let owner = match release.user {
            Some(user_id) => self.users.get(user_id).await?,
            None => None,
        };
        Ok(PopulatedRelease { release, owner })
    }
}

#[async_trait]
impl ReleaseStore for InMemoryReleaseStore {
    async fn insert(&self, release: Release) -> Result<PopulatedRelease, StoreError> {
        release.validate()?;
        {
            let mut map = self.inner.write().map_err(|_| poisoned())?;
            if map.contains_key(&release.id) {
                return Err(StoreError::Duplicate {
                    field: "id".to_string(),
                });
            }
            map.insert(release.id, release.clone());
        }
        self.populate(release).await
    }

    async fn find(&self, id: ReleaseId) -> Result<Option<PopulatedRelease>, StoreError> {
        let found = {
            let map = self.inner.read().map_err(|_| poisoned())?;
            map.get(&id).cloned()
        };
        match found {
            Some(release) => Ok(Some(self.populate(release).await?)),
            None => Ok(None),
        }
    }

    async fn save(&self, release: Release) -> Result<PopulatedRelease, StoreError> {
        release.validate()?;
        {
            let mut map = self.inner.write().map_err(|_| poisoned())?;
            let slot = map.get_mut(&release.id).ok_or(StoreError::NotFound)?;
            *slot = release.clone();
        }
        self.populate(release).await
    }

    async fn remove(&self, id: ReleaseId) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn list_newest_first(&self) -> Result<Vec<PopulatedRelease>, StoreError> {
        let mut releases: Vec<Release> = {
            let map = self.inner.read().map_err(|_| poisoned())?;
            map.values().cloned().collect()
        };
        // Ids are UUIDv7, so they break timestamp ties in creation order.
        releases.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.id.cmp(&a.id)));

        let mut populated = Vec::with_capacity(releases.len());
        for release in releases {
            populated.push(self.populate(release).await?);
        }
        Ok(populated)
    }
}
