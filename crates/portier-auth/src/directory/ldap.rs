//! LDAP directory implementation
//!
//! Opens one `ldap3` connection per [`Directory::connect`] call. Supports
//! LDAP, LDAPS and STARTTLS; every connect, bind and search is bounded by the
//! configured timeout.

use crate::directory::{Directory, DirectoryConnection, DirectoryEntry, DirectoryError, SearchRequest};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchStream};
use portier_core::config::LdapConfigSection;
use std::time::Duration;
use tracing::{debug, warn};

/// LDAP server reachable at a single URL
pub struct LdapDirectory {
    server_url: String,
    start_tls: bool,
    timeout: Duration,
}

impl LdapDirectory {
    pub fn new(config: &LdapConfigSection) -> Self {
        Self {
            server_url: config.server_url.clone(),
            start_tls: config.start_tls,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    async fn connect(&self) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.timeout)
            .set_starttls(self.start_tls);

        debug!("Connecting to LDAP server: {}", self.server_url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.server_url)
            .await
            .map_err(|e| DirectoryError::Connect(e.to_string()))?;

        ldap3::drive!(conn);

        Ok(Box::new(LdapConnection {
            ldap,
            timeout: self.timeout,
        }))
    }
}

struct LdapConnection {
    ldap: Ldap,
    timeout: Duration,
}

enum SearchPhase<'a> {
    Pending(&'a mut Ldap, &'a SearchRequest, Duration),
    Open(SearchStream<'a, String, Vec<String>>),
    Done,
}

#[async_trait]
impl DirectoryConnection for LdapConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let result = self
            .ldap
            .with_timeout(self.timeout)
            .simple_bind(dn, password)
            .await
            .map_err(|e| map_ldap_error(e, DirectoryError::Connect))?;

        if result.rc != 0 {
            return Err(DirectoryError::Bind {
                rc: result.rc,
                message: result.text,
            });
        }

        Ok(())
    }

    fn search<'a>(
        &'a mut self,
        request: &'a SearchRequest,
    ) -> BoxStream<'a, Result<DirectoryEntry, DirectoryError>> {
        let initial = SearchPhase::Pending(&mut self.ldap, request, self.timeout);

        stream::unfold(initial, |phase| async move {
            match phase {
                SearchPhase::Pending(ldap, request, timeout) => {
                    let filter = request.filter.to_string();
                    debug!("Searching {} with filter: {}", request.base, filter);

                    let opened = ldap
                        .with_timeout(timeout)
                        .streaming_search(
                            &request.base,
                            Scope::Subtree,
                            &filter,
                            request.attributes.clone(),
                        )
                        .await;

                    match opened {
                        Ok(search) => next_entry(search).await,
                        Err(e) => Some((
                            Err(map_ldap_error(e, DirectoryError::Search)),
                            SearchPhase::Done,
                        )),
                    }
                }
                SearchPhase::Open(search) => next_entry(search).await,
                SearchPhase::Done => None,
            }
        })
        .boxed()
    }

    async fn release(mut self: Box<Self>) {
        if let Err(e) = self.ldap.unbind().await {
            debug!("LDAP unbind failed: {}", e);
        }
    }
}

async fn next_entry(
    mut search: SearchStream<'_, String, Vec<String>>,
) -> Option<(Result<DirectoryEntry, DirectoryError>, SearchPhase<'_>)> {
    loop {
        match search.next().await {
            Ok(Some(entry)) => {
                // Referrals carry no attributes
                if entry.is_ref() {
                    continue;
                }
                let entry = DirectoryEntry::from(SearchEntry::construct(entry));
                return Some((Ok(entry), SearchPhase::Open(search)));
            }
            Ok(None) => {
                return match search.finish().await.success() {
                    Ok(_) => None,
                    Err(e) => {
                        warn!("LDAP search finished with error: {}", e);
                        Some((
                            Err(DirectoryError::Search(e.to_string())),
                            SearchPhase::Done,
                        ))
                    }
                };
            }
            Err(e) => {
                return Some((
                    Err(map_ldap_error(e, DirectoryError::Search)),
                    SearchPhase::Done,
                ))
            }
        }
    }
}

fn map_ldap_error(err: ldap3::LdapError, wrap: fn(String) -> DirectoryError) -> DirectoryError {
    match err {
        ldap3::LdapError::Timeout { .. } => DirectoryError::Timeout,
        other => wrap(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ldap_directory_creation() {
        let config = LdapConfigSection {
            server_url: "ldaps://dc1.example.local:636".to_string(),
            timeout_seconds: 3,
            ..Default::default()
        };

        let directory = LdapDirectory::new(&config);
        assert_eq!(directory.server_url(), "ldaps://dc1.example.local:636");
        assert_eq!(directory.timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_server_fails() {
        let config = LdapConfigSection {
            server_url: "ldap://127.0.0.1:1".to_string(),
            timeout_seconds: 1,
            ..Default::default()
        };

        let directory = LdapDirectory::new(&config);
        assert!(directory.connect().await.is_err());
    }
}
