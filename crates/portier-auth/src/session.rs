//! Session capability
//!
//! The gateway never stores sessions itself. Each operation receives a
//! [`SessionHandle`] for the current request's session from the HTTP layer.

use async_trait::async_trait;
use parking_lot::Mutex;
use portier_core::types::UserRecord;
use portier_core::Result;

/// Session key holding the serialized [`UserRecord`]
pub const USER_KEY: &str = "portier.user";

#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// The user stored in the session, if any
    async fn user(&self) -> Result<Option<UserRecord>>;

    /// Store `user` as the session's authenticated user
    async fn set_user(&self, user: UserRecord) -> Result<()>;

    /// Drop all session state
    async fn destroy(&self) -> Result<()>;
}

/// Session held in memory, for tests and tooling
#[derive(Default)]
pub struct MemorySession {
    user: Mutex<Option<UserRecord>>,
    destroyed: Mutex<usize>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: UserRecord) -> Self {
        Self {
            user: Mutex::new(Some(user)),
            destroyed: Mutex::new(0),
        }
    }

    pub fn current(&self) -> Option<UserRecord> {
        self.user.lock().clone()
    }

    /// How many times the session has been destroyed
    pub fn destroyed(&self) -> usize {
        *self.destroyed.lock()
    }
}

#[async_trait]
impl SessionHandle for MemorySession {
    async fn user(&self) -> Result<Option<UserRecord>> {
        Ok(self.current())
    }

    async fn set_user(&self, user: UserRecord) -> Result<()> {
        *self.user.lock() = Some(user);
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        *self.user.lock() = None;
        *self.destroyed.lock() += 1;
        Ok(())
    }
}
