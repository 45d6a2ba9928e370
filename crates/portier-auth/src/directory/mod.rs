//! Directory client adapter
//!
//! Thin seam over the external directory. A [`Directory`] hands out fresh
//! connections; a [`DirectoryConnection`] can bind, stream search results and
//! be released. No business logic lives here.
//!
//! Implementations:
//! - [`LdapDirectory`]: LDAP/Active Directory over `ldap3`
//! - [`MemoryDirectory`]: in-process accounts for tests and local development

mod ldap;
mod memory;
mod types;

pub use ldap::LdapDirectory;
pub use memory::{MemoryAccount, MemoryDirectory};
pub use types::*;

use async_trait::async_trait;
use futures::stream::BoxStream;

/// Source of directory connections.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Open a new, unbound connection.
    async fn connect(&self) -> Result<Box<dyn DirectoryConnection>, DirectoryError>;
}

/// A single open connection to the directory.
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Simple bind with `dn` and `password`. Any non-success result code is an
    /// error.
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    /// Run a subtree search. Entries are yielded as the server returns them;
    /// the stream ends after the last entry or with the first error.
    fn search<'a>(
        &'a mut self,
        request: &'a SearchRequest,
    ) -> BoxStream<'a, Result<DirectoryEntry, DirectoryError>>;

    /// Unbind and close the connection.
    async fn release(self: Box<Self>);
}
