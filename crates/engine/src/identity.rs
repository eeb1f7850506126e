use leadbook_core::UserId;

use crate::error::EngineError;

/// Source of the signed-in user. Sessions live outside this crate.
pub trait IdentityProvider {
    fn current_user(&self) -> Option<UserId>;
}

/// A provider that always answers the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedIdentity(pub Option<UserId>);

impl FixedIdentity {
    pub fn signed_in(user: UserId) -> Self {
        Self(Some(user))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for FixedIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.0
    }
}

pub fn require_user(identity: &dyn IdentityProvider) -> Result<UserId, EngineError> {
    identity.current_user().ok_or(EngineError::Unauthenticated)
}
