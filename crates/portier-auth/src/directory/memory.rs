//! In-memory directory
//!
//! Holds accounts in process and counts opened and released connections so
//! callers can assert that every connection is given back.

use crate::directory::{
    Directory, DirectoryConnection, DirectoryEntry, DirectoryError, SearchRequest,
    RC_INVALID_CREDENTIALS,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// An account: its directory entry and the password that binds as it
#[derive(Debug, Clone)]
pub struct MemoryAccount {
    pub entry: DirectoryEntry,
    pub password: String,
}

#[derive(Default)]
struct Shared {
    accounts: RwLock<Vec<MemoryAccount>>,
    opened: AtomicUsize,
    released: AtomicUsize,
    unreachable: AtomicBool,
    /// Number of entries yielded before a search fails
    fail_search_after: RwLock<Option<usize>>,
}

/// Directory backed by a list of accounts
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    shared: Arc<Shared>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account; its DN binds with `password`.
    pub fn add_account(&self, entry: DirectoryEntry, password: impl Into<String>) {
        self.shared.accounts.write().push(MemoryAccount {
            entry,
            password: password.into(),
        });
    }

    /// Make every subsequent connect fail.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.shared.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Fail searches after `entries` results have been yielded.
    pub fn fail_search_after(&self, entries: Option<usize>) {
        *self.shared.fail_search_after.write() = entries;
    }

    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn connect(&self) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        if self.shared.unreachable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Connect("connection refused".to_string()));
        }

        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            shared: self.shared.clone(),
            bound: false,
        }))
    }
}

struct MemoryConnection {
    shared: Arc<Shared>,
    bound: bool,
}

#[async_trait]
impl DirectoryConnection for MemoryConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let accounts = self.shared.accounts.read();
        let valid = accounts
            .iter()
            .any(|a| a.entry.dn.eq_ignore_ascii_case(dn) && a.password == password);

        if !valid {
            self.bound = false;
            return Err(DirectoryError::Bind {
                rc: RC_INVALID_CREDENTIALS,
                message: "invalid credentials".to_string(),
            });
        }

        self.bound = true;
        Ok(())
    }

    fn search<'a>(
        &'a mut self,
        request: &'a SearchRequest,
    ) -> BoxStream<'a, Result<DirectoryEntry, DirectoryError>> {
        if !self.bound {
            return stream::once(async {
                Err(DirectoryError::Search("operations error: bind required".to_string()))
            })
            .boxed();
        }

        let mut results: Vec<Result<DirectoryEntry, DirectoryError>> = self
            .shared
            .accounts
            .read()
            .iter()
            .filter(|a| {
                a.entry.dn.to_ascii_lowercase().ends_with(&request.base.to_ascii_lowercase())
                    && request.filter.matches(&a.entry)
            })
            .map(|a| Ok(a.entry.clone()))
            .collect();

        if let Some(limit) = *self.shared.fail_search_after.read() {
            results.truncate(limit);
            results.push(Err(DirectoryError::Search("size limit exceeded".to_string())));
        }

        stream::iter(results).boxed()
    }

    async fn release(self: Box<Self>) {
        self.shared.released.fetch_add(1, Ordering::SeqCst);
    }
}
