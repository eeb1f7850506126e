use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use leadbook_core::UserId;

use crate::error::EngineError;
use crate::identity::{IdentityProvider, require_user};

/// Who is acting, plus an optional way for the caller to give up.
///
/// Cancellation is only honored before a write is issued; a commit that
/// has started always runs to completion or rolls back.
#[derive(Debug, Clone)]
pub struct MutationContext {
    user: UserId,
    deadline: Option<Instant>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl MutationContext {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            deadline: None,
            cancel_flag: None,
        }
    }

    /// Context for the signed-in user, or `Unauthenticated`.
    pub fn for_current_user(identity: &dyn IdentityProvider) -> Result<Self, EngineError> {
        require_user(identity).map(Self::new)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn is_cancelled(&self) -> bool {
        let flagged = self
            .cancel_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Acquire));
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        flagged || expired
    }

    pub fn check(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}
