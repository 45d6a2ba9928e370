//! Credential validation by directory bind

use crate::directory::Directory;
use crate::lookup::DIRECTORY_OPERATION_SECONDS;
use metrics::histogram;
use portier_core::types::UserRecord;
use portier_core::PreconditionViolation;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct CredentialValidator {
    directory: Arc<dyn Directory>,
}

impl CredentialValidator {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Bind as `user.dn` with `secret`.
    ///
    /// Returns `Ok(true)` only when the bind succeeds. A wrong password and an
    /// unreachable directory both yield `Ok(false)`; the cause is logged.
    /// Calling this with a record that has no DN is a
    /// [`PreconditionViolation`].
    pub async fn authenticate(
        &self,
        user: &UserRecord,
        secret: &str,
    ) -> Result<bool, PreconditionViolation> {
        if !user.has_dn() {
            return Err(PreconditionViolation::new(
                "authenticate",
                "user record has no distinguished name",
            ));
        }

        // An empty password is an unauthenticated bind, which servers accept
        if secret.is_empty() {
            debug!("Rejecting empty password for {}", user.dn);
            return Ok(false);
        }

        let started = Instant::now();
        let result = self.bind(&user.dn, secret).await;
        histogram!(DIRECTORY_OPERATION_SECONDS, "operation" => "bind")
            .record(started.elapsed().as_secs_f64());

        Ok(result)
    }

    async fn bind(&self, dn: &str, secret: &str) -> bool {
        let mut conn = match self.directory.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Cannot reach directory to authenticate {}: {}", dn, e);
                return false;
            }
        };

        let result = conn.bind(dn, secret).await;
        conn.release().await;

        match result {
            Ok(()) => true,
            Err(e) if e.is_invalid_credentials() => {
                debug!("Invalid credentials for {}", dn);
                false
            }
            Err(e) => {
                warn!("Bind as {} failed: {}", dn, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryEntry, MemoryDirectory};

    const USER_DN: &str = "cn=John Doe,ou=people,dc=example,dc=local";

    fn setup() -> (MemoryDirectory, CredentialValidator) {
        let directory = MemoryDirectory::new();
        directory.add_account(DirectoryEntry::new(USER_DN), "hunter2");
        let validator = CredentialValidator::new(Arc::new(directory.clone()));
        (directory, validator)
    }

    #[tokio::test]
    async fn test_valid_password() {
        let (directory, validator) = setup();
        let user = UserRecord::new(USER_DN);

        assert_eq!(validator.authenticate(&user, "hunter2").await, Ok(true));
        assert_eq!(directory.opened(), 1);
        assert_eq!(directory.released(), 1);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let (directory, validator) = setup();
        let user = UserRecord::new(USER_DN);

        assert_eq!(validator.authenticate(&user, "hunter3").await, Ok(false));
        assert_eq!(directory.opened(), 1);
        assert_eq!(directory.released(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_directory_is_false() {
        let (directory, validator) = setup();
        directory.set_unreachable(true);

        let user = UserRecord::new(USER_DN);
        assert_eq!(validator.authenticate(&user, "hunter2").await, Ok(false));
    }

    #[tokio::test]
    async fn test_empty_password_never_reaches_directory() {
        let (directory, validator) = setup();
        let user = UserRecord::new(USER_DN);

        assert_eq!(validator.authenticate(&user, "").await, Ok(false));
        assert_eq!(directory.opened(), 0);
    }

    #[tokio::test]
    async fn test_missing_dn_is_precondition_violation() {
        let (directory, validator) = setup();
        let user = UserRecord::default().with_login_name("jdoe");

        let err = validator.authenticate(&user, "hunter2").await.unwrap_err();
        assert_eq!(err.operation, "authenticate");
        assert_eq!(directory.opened(), 0);
    }
}
