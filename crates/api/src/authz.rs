//! API-side ownership guard.
//!
//! Runs after the caller is known and the record is loaded, before the
//! handler mutates anything.

use releasehub_auth::{AuthzError, authorize_owner};
use releasehub_releases::Release;

use crate::context::PrincipalContext;

/// Check that the caller owns `release`.
pub fn authorize_release(principal: &PrincipalContext, release: &Release) -> Result<(), AuthzError> {
    authorize_owner(principal.user_id(), release.user).inspect_err(|_| {
        tracing::warn!(
            caller = %principal.user_id(),
            release_id = %release.id,
            "rejected mutation by non-owner"
        );
    })
}
