use thiserror::Error;

use releasehub_core::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The caller is authenticated but does not own the record.
    #[error("User is not authorized")]
    NotOwner,
}

/// Ownership policy: only the owner of a record may mutate it.
///
/// - No IO
/// - No normalization beyond id equality
/// - Records without an owner are owned by nobody
pub fn authorize_owner(caller: UserId, owner: Option<UserId>) -> Result<(), AuthzError> {
    match owner {
        Some(owner) if owner == caller => Ok(()),
        _ => {
            tracing::debug!(caller = %caller, owner = ?owner, "ownership check failed");
            Err(AuthzError::NotOwner)
        }
    }
}
