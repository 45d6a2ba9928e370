//! User lookup
//!
//! Binds as the service account and searches for accounts whose account
//! name, email or principal name equals the identifier the user typed.

use crate::directory::{Directory, DirectoryConnection, DirectoryEntry, Filter, SearchRequest};
use futures::StreamExt;
use metrics::histogram;
use portier_core::config::LdapConfigSection;
use portier_core::types::UserRecord;
use portier_core::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Attributes matched against the identifier
pub const IDENTITY_ATTRIBUTES: [&str; 3] = ["sAMAccountName", "email", "userPrincipalName"];

/// Attributes requested for each matching account
pub const USER_ATTRIBUTES: [&str; 5] = ["givenName", "sn", "cn", "mail", "memberOf"];

pub(crate) const DIRECTORY_OPERATION_SECONDS: &str = "portier_directory_operation_seconds";

/// Service account credentials and search base
#[derive(Clone)]
pub struct ServiceAccount {
    pub bind_dn: String,
    pub bind_password: String,
    pub search_base: String,
}

impl ServiceAccount {
    pub fn from_config(config: &LdapConfigSection) -> Self {
        Self {
            bind_dn: config.bind_dn.clone(),
            bind_password: config.bind_password.clone(),
            search_base: config.search_base.clone(),
        }
    }
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("bind_dn", &self.bind_dn)
            .field("search_base", &self.search_base)
            .finish_non_exhaustive()
    }
}

pub struct UserLookup {
    directory: Arc<dyn Directory>,
    account: ServiceAccount,
}

impl UserLookup {
    pub fn new(directory: Arc<dyn Directory>, account: ServiceAccount) -> Self {
        Self { directory, account }
    }

    /// Find every account matching `identifier`, in directory order.
    ///
    /// No match is an empty list. Connection, bind and search failures are
    /// [`Error::DirectoryUnavailable`]. One connection is opened per call and
    /// released on every path.
    pub async fn find_user(&self, identifier: &str) -> Result<Vec<UserRecord>> {
        let started = Instant::now();

        let mut conn = self.directory.connect().await?;
        let result = self.search(conn.as_mut(), identifier).await;
        conn.release().await;

        histogram!(DIRECTORY_OPERATION_SECONDS, "operation" => "lookup")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(users) => debug!("Lookup for {} returned {} entries", identifier, users.len()),
            Err(e) => warn!("Lookup for {} failed: {}", identifier, e),
        }

        result
    }

    async fn search(
        &self,
        conn: &mut dyn DirectoryConnection,
        identifier: &str,
    ) -> Result<Vec<UserRecord>> {
        conn.bind(&self.account.bind_dn, &self.account.bind_password)
            .await
            .map_err(|e| Error::DirectoryUnavailable(format!("Service bind failed: {}", e)))?;

        let request = SearchRequest {
            base: self.account.search_base.clone(),
            filter: identity_filter(identifier),
            attributes: USER_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
        };

        let mut users = Vec::new();
        let mut entries = conn.search(&request);
        while let Some(entry) = entries.next().await {
            let entry = entry?;
            if entry.dn.is_empty() {
                warn!("Skipping directory entry without a DN");
                continue;
            }
            users.push(user_from_entry(entry));
        }

        Ok(users)
    }
}

/// `(|(sAMAccountName=id)(email=id)(userPrincipalName=id))`
pub fn identity_filter(identifier: &str) -> Filter {
    Filter::Or(
        IDENTITY_ATTRIBUTES
            .iter()
            .map(|attr| Filter::equality(*attr, identifier))
            .collect(),
    )
}

fn user_from_entry(entry: DirectoryEntry) -> UserRecord {
    UserRecord {
        username: String::new(),
        display_name: entry.first("cn"),
        surname: entry.first("sn"),
        given_name: entry.first("givenName"),
        email: entry.first("mail"),
        member_of: entry.values("memberOf").to_vec(),
        dn: entry.dn,
    }
}
