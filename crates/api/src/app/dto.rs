use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use releasehub_core::{ReleaseId, UserId};
use releasehub_infra::PopulatedRelease;
use releasehub_releases::{NewRelease, ReleaseChanges};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /releases`. A `user` field, if sent, is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct CreateReleaseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl From<CreateReleaseRequest> for NewRelease {
    fn from(body: CreateReleaseRequest) -> Self {
        NewRelease {
            name: body.name,
            created: body.created,
        }
    }
}

/// Body of `PUT /releases/:release_id`. Only `name` is mutable.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateReleaseRequest {
    #[serde(default)]
    pub name: Option<String>,
}

impl From<UpdateReleaseRequest> for ReleaseChanges {
    fn from(body: UpdateReleaseRequest) -> Self {
        ReleaseChanges { name: body.name }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: UserId,
    /// `None` when the owner id no longer resolves to a known user.
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseResponse {
    pub id: ReleaseId,
    pub name: String,
    pub created: DateTime<Utc>,
    pub user: Option<UserRef>,
}

impl From<PopulatedRelease> for ReleaseResponse {
    fn from(p: PopulatedRelease) -> Self {
        let user = p.release.user.map(|id| UserRef {
            id,
            display_name: p
                .owner
                .filter(|o| o.id == id)
                .map(|o| o.display_name),
        });

        ReleaseResponse {
            id: p.release.id,
            name: p.release.name,
            created: p.release.created,
            user,
        }
    }
}
