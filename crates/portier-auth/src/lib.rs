//! Authentication and authorization for Portier
//!
//! - [`directory`]: connections to the LDAP/Active Directory backend
//! - [`lookup`]: find accounts by login name, email or principal name
//! - [`authn`]: check a password by binding as the account
//! - [`authz`]: group-membership allow-list
//! - [`redirect`]: safe post-login redirects
//! - [`gateway`]: the `/check`, login and logout decisions

pub mod authn;
pub mod authz;
pub mod directory;
pub mod gateway;
pub mod lookup;
pub mod redirect;
pub mod session;

pub use authn::CredentialValidator;
pub use authz::{authorize, GroupPolicy};
pub use directory::{
    Directory, DirectoryConnection, DirectoryEntry, DirectoryError, LdapDirectory, MemoryDirectory,
};
pub use gateway::{Gateway, LoginOutcome};
pub use lookup::{ServiceAccount, UserLookup};
pub use redirect::{resolve_redirect, RedirectPolicy};
pub use session::{MemorySession, SessionHandle};
