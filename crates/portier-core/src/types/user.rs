//! User types

use serde::{Deserialize, Serialize};

/// A user account as returned by the directory.
///
/// Records produced by a directory lookup always carry a distinguished name.
/// The login name is empty until a successful login attaches the identifier
/// the user typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Login name used at authentication time
    #[serde(default)]
    pub username: String,

    /// Distinguished name (unique directory key)
    #[serde(default)]
    pub dn: String,

    /// Display name (`cn`)
    pub display_name: Option<String>,

    /// Surname (`sn`)
    pub surname: Option<String>,

    /// Given name (`givenName`)
    pub given_name: Option<String>,

    /// Email address (`mail`)
    pub email: Option<String>,

    /// Group memberships, in directory order
    #[serde(default)]
    pub member_of: Vec<String>,
}

impl UserRecord {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            ..Default::default()
        }
    }

    /// Attach the identifier the user logged in with.
    pub fn with_login_name(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.member_of = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_dn(&self) -> bool {
        !self.dn.trim().is_empty()
    }

    /// Group memberships with the empty set replaced by [`crate::NO_GROUPS`].
    pub fn memberships(&self) -> Vec<&str> {
        if self.member_of.is_empty() {
            vec![crate::NO_GROUPS]
        } else {
            self.member_of.iter().map(String::as_str).collect()
        }
    }

    /// Name to greet the user with
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.given_name.as_deref())
            .unwrap_or(&self.username)
    }
}
