//! Access decisions and the login/logout state machine
//!
//! A session is `Anonymous` until a login succeeds and `Authenticated`
//! afterwards. Group membership is evaluated again on every check, so an
//! authenticated session is classified as authorized or unauthorized per
//! request:
//!
//! | Session                     | `/check` |
//! |-----------------------------|----------|
//! | no user                     | 401      |
//! | user, group policy passes   | 200      |
//! | user, group policy fails    | 403      |

use crate::authn::CredentialValidator;
use crate::authz::GroupPolicy;
use crate::directory::{Directory, LdapDirectory};
use crate::lookup::{ServiceAccount, UserLookup};
use crate::redirect::RedirectPolicy;
use crate::session::SessionHandle;
use portier_core::types::{SessionState, UserRecord};
use portier_core::{Environment, PortierConfig, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Login name of the development bypass account
pub const DEV_USERNAME: &str = "test";

/// Password of the development bypass account
pub const DEV_PASSWORD: &str = "test";

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The session now holds this user
    Authenticated(UserRecord),
    /// Unknown user, wrong password or unreachable directory
    InvalidCredentials,
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoginOutcome::Authenticated(_) => "success",
            LoginOutcome::InvalidCredentials => "invalid_credentials",
        }
    }
}

pub struct Gateway {
    lookup: UserLookup,
    validator: CredentialValidator,
    policy: GroupPolicy,
    redirect: RedirectPolicy,
    environment: Environment,
}

impl Gateway {
    /// Build a gateway talking to the LDAP server from `config`.
    pub fn from_config(config: &PortierConfig) -> Result<Self> {
        let directory: Arc<dyn Directory> = Arc::new(LdapDirectory::new(&config.ldap));
        Self::new(config, directory)
    }

    pub fn new(config: &PortierConfig, directory: Arc<dyn Directory>) -> Result<Self> {
        if config.environment.is_development() {
            warn!(
                "Development mode: the {}/{} bypass account is enabled",
                DEV_USERNAME, DEV_PASSWORD
            );
        }

        Ok(Self {
            lookup: UserLookup::new(directory.clone(), ServiceAccount::from_config(&config.ldap)),
            validator: CredentialValidator::new(directory),
            policy: GroupPolicy::from_config(&config.ldap),
            redirect: RedirectPolicy::from_config(&config.redirect)?,
            environment: config.environment,
        })
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Classify a session for the proxy. Never contacts the directory.
    ///
    /// A session that cannot be read is treated as anonymous.
    pub async fn check_access(&self, session: &dyn SessionHandle) -> SessionState {
        let user = match session.user().await {
            Ok(user) => user,
            Err(e) => {
                warn!("Unreadable session treated as anonymous: {}", e);
                None
            }
        };

        let state = self.classify(user.as_ref());
        debug!("/check {}", state.http_status());
        state
    }

    pub fn classify(&self, user: Option<&UserRecord>) -> SessionState {
        match user {
            None => SessionState::Anonymous,
            Some(user) if self.policy.authorize(user) => SessionState::Authenticated,
            Some(_) => SessionState::AuthenticatedUnauthorized,
        }
    }

    /// Authenticate `identifier`/`secret` and, on success, store the user in
    /// `session`.
    ///
    /// Every failure the user could cause or observe is
    /// [`LoginOutcome::InvalidCredentials`]. `Err` is reserved for session
    /// store failures and caller bugs.
    pub async fn login(
        &self,
        session: &dyn SessionHandle,
        identifier: &str,
        secret: &str,
    ) -> Result<LoginOutcome> {
        debug!("Authenticating: {}", identifier);

        let user = match self.environment {
            Environment::Development if identifier == DEV_USERNAME => {
                if secret != DEV_PASSWORD {
                    debug!("DEV: Authentication unsuccessful.");
                    return Ok(LoginOutcome::InvalidCredentials);
                }
                debug!("DEV: Authentication successful.");
                UserRecord::default()
            }
            _ => match self.authenticate(identifier, secret).await? {
                Some(user) => user,
                None => return Ok(LoginOutcome::InvalidCredentials),
            },
        };

        let user = user.with_login_name(identifier);
        session.set_user(user.clone()).await?;

        info!("User {} logged in", identifier);
        Ok(LoginOutcome::Authenticated(user))
    }

    async fn authenticate(&self, identifier: &str, secret: &str) -> Result<Option<UserRecord>> {
        let candidates = match self.lookup.find_user(identifier).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Authentication unsuccessful for {}: {}", identifier, e);
                return Ok(None);
            }
        };

        // First match in directory order wins
        let Some(user) = candidates.into_iter().next() else {
            warn!("Authentication unsuccessful for {}: user not found", identifier);
            return Ok(None);
        };

        if !self.validator.authenticate(&user, secret).await? {
            warn!("Authentication unsuccessful for {}: bind rejected", identifier);
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Destroy the session unconditionally.
    pub async fn logout(&self, session: &dyn SessionHandle) -> Result<()> {
        debug!("Destroying authentication credentials.");
        session.destroy().await
    }

    /// Where to send the browser after a successful login.
    pub fn resolve_redirect(&self, requested: Option<&str>) -> String {
        self.redirect.resolve(requested)
    }
}
