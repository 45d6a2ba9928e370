//! Post-login redirect validation
//!
//! A `request_uri` from the login form is only followed when it is an
//! http(s) URL on an allowed domain. Anything else falls back to the
//! configured default path.

use portier_core::config::RedirectConfig;
use portier_core::{Error, Result};
use regex::Regex;
use tracing::debug;

pub struct RedirectPolicy {
    patterns: Vec<Regex>,
    default_path: String,
}

impl RedirectPolicy {
    pub fn new(domains: &[String], default_path: impl Into<String>) -> Result<Self> {
        let patterns = domains
            .iter()
            .map(|domain| domain_pattern(domain))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            default_path: default_path.into(),
        })
    }

    pub fn from_config(config: &RedirectConfig) -> Result<Self> {
        Self::new(&config.domains, config.default_path.clone())
    }

    /// The URI to send the browser to after login.
    pub fn resolve(&self, requested: Option<&str>) -> String {
        let uri = match requested {
            Some(uri) if !uri.is_empty() => uri,
            _ => return self.default_path.clone(),
        };

        let folded = uri.to_lowercase();
        if self.patterns.iter().any(|p| p.is_match(&folded)) {
            return uri.to_string();
        }

        debug!("Rejected redirect to {}", uri);
        self.default_path.clone()
    }
}

fn domain_pattern(domain: &str) -> Result<Regex> {
    let pattern = format!(
        r"^https?://{}(:[0-9]+)?/.*$",
        regex::escape(&domain.to_lowercase())
    );
    Regex::new(&pattern)
        .map_err(|e| Error::InvalidConfig(format!("Invalid redirect domain {}: {}", domain, e)))
}

/// One-shot form of [`RedirectPolicy::resolve`].
pub fn resolve_redirect(requested: Option<&str>, allowlist: &[String], default_path: &str) -> String {
    match RedirectPolicy::new(allowlist, default_path) {
        Ok(policy) => policy.resolve(requested),
        Err(_) => default_path.to_string(),
    }
}
