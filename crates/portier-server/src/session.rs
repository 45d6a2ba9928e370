//! Cookie sessions backed by `tower-sessions`

use async_trait::async_trait;
use portier_auth::session::{SessionHandle, USER_KEY};
use portier_core::config::SessionConfig;
use portier_core::types::UserRecord;
use portier_core::{Error, Result};
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

/// The current request's cookie session
pub struct CookieSession(pub Session);

#[async_trait]
impl SessionHandle for CookieSession {
    async fn user(&self) -> Result<Option<UserRecord>> {
        self.0
            .get::<UserRecord>(USER_KEY)
            .await
            .map_err(|e| Error::Session(e.to_string()))
    }

    async fn set_user(&self, user: UserRecord) -> Result<()> {
        // New id on privilege change
        self.0
            .cycle_id()
            .await
            .map_err(|e| Error::Session(e.to_string()))?;

        self.0
            .insert(USER_KEY, user)
            .await
            .map_err(|e| Error::Session(e.to_string()))
    }

    async fn destroy(&self) -> Result<()> {
        self.0
            .flush()
            .await
            .map_err(|e| Error::Session(e.to_string()))
    }
}

/// Session middleware keeping sessions in process memory
pub fn session_layer(config: &SessionConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(config.cookie_name.clone())
        .with_secure(config.secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            config.inactivity_secs,
        )))
}
