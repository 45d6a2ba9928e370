//! Directory entries, search filters and errors

use ldap3::ldap_escape;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// LDAP result code for invalid credentials
pub const RC_INVALID_CREDENTIALS: u32 = 49;

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("failed to connect to directory: {0}")]
    Connect(String),

    #[error("bind failed with code {rc}: {message}")]
    Bind { rc: u32, message: String },

    #[error("search failed: {0}")]
    Search(String),

    #[error("directory operation timed out")]
    Timeout,
}

impl DirectoryError {
    /// Whether the server rejected the supplied password
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, DirectoryError::Bind { rc, .. } if *rc == RC_INVALID_CREDENTIALS)
    }
}

impl From<DirectoryError> for portier_core::Error {
    fn from(err: DirectoryError) -> Self {
        portier_core::Error::DirectoryUnavailable(err.to_string())
    }
}

// ============================================================================
// Entries
// ============================================================================

/// One entry returned by a directory search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    pub fn with_attr<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    /// All values of an attribute. Attribute names compare case-insensitively.
    pub fn values(&self, name: &str) -> &[String] {
        if let Some(values) = self.attrs.get(name) {
            return values;
        }

        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<String> {
        self.values(name).first().cloned()
    }
}

impl From<ldap3::SearchEntry> for DirectoryEntry {
    fn from(entry: ldap3::SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attrs.into_iter().collect(),
        }
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Search filter, rendered to RFC 4515 text with escaped values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Equality { attribute: String, value: String },
    Or(Vec<Filter>),
}

impl Filter {
    pub fn equality(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equality {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Evaluate the filter against an entry with case-insensitive value
    /// matching.
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            Filter::Equality { attribute, value } => entry
                .values(attribute)
                .iter()
                .any(|v| v.eq_ignore_ascii_case(value)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(entry)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Equality { attribute, value } => {
                write!(f, "({}={})", attribute, ldap_escape(value.as_str()))
            }
            Filter::Or(filters) => {
                write!(f, "(|")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A subtree search under `base`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub filter: Filter,
    pub attributes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_filter_rendering_escapes_values() {
        let filter = Filter::Or(vec![
            Filter::equality("sAMAccountName", "j*doe"),
            Filter::equality("email", "(admin)"),
        ]);

        assert_eq!(
            filter.to_string(),
            r"(|(sAMAccountName=j\2adoe)(email=\28admin\29))"
        );
    }

    #[test]
    fn test_filter_matching_is_case_insensitive() {
        let entry = DirectoryEntry::new("cn=John Doe,dc=example,dc=com")
            .with_attr("sAMAccountName", ["jdoe"]);

        assert!(Filter::equality("samaccountname", "JDoe").matches(&entry));
        assert!(!Filter::equality("mail", "jdoe").matches(&entry));
        assert!(Filter::Or(vec![
            Filter::equality("mail", "jdoe"),
            Filter::equality("sAMAccountName", "jdoe"),
        ])
        .matches(&entry));
    }

    #[test]
    fn test_invalid_credentials_detection() {
        let err = DirectoryError::Bind {
            rc: RC_INVALID_CREDENTIALS,
            message: "80090308: LdapErr".to_string(),
        };
        assert!(err.is_invalid_credentials());
        assert!(!DirectoryError::Timeout.is_invalid_credentials());
    }
}
