use releasehub_core::UserId;

/// Principal context for a request (the authenticated caller).
///
/// Inserted into request extensions by the auth middleware only when a valid
/// bearer token was presented.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
}

impl PrincipalContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
