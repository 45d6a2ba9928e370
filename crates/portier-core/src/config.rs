//! Configuration for Portier

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortierConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ldap: LdapConfigSection,

    #[serde(default)]
    pub redirect: RedirectConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Deployment environment, always taken from `PORTIER_ENV`
    #[serde(skip)]
    pub environment: Environment,
}

impl PortierConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.environment = Environment::detect();
        Ok(config)
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config.environment = Environment::detect();
        config
    }

    /// Override fields from `PORTIER_*` variables resolved through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("PORTIER_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Some(port) = lookup("PORTIER_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Some(base) = lookup("PORTIER_BASE_PATH") {
            self.server.base_path = base;
        }

        if let Some(url) = lookup("PORTIER_LDAP_URL") {
            self.ldap.server_url = url;
        }
        if let Some(dn) = lookup("PORTIER_LDAP_BIND_DN") {
            self.ldap.bind_dn = dn;
        }
        if let Some(password) = lookup("PORTIER_LDAP_BIND_PASSWORD") {
            self.ldap.bind_password = password;
        }
        if let Some(base) = lookup("PORTIER_LDAP_SEARCH_BASE") {
            self.ldap.search_base = base;
        }
        if let Some(groups) = lookup("PORTIER_LDAP_GROUPS") {
            self.ldap.groups = split_list(&groups);
        }
        if let Some(mode) = lookup("PORTIER_LDAP_GROUP_MATCH") {
            match mode.to_ascii_lowercase().as_str() {
                "legacy" => self.ldap.group_match = GroupMatch::Legacy,
                "anywhere" => self.ldap.group_match = GroupMatch::Anywhere,
                other => warn!("Ignoring unknown PORTIER_LDAP_GROUP_MATCH value: {}", other),
            }
        }
        if let Some(timeout) = lookup("PORTIER_LDAP_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.ldap.timeout_seconds = t;
            }
        }
        if lookup("PORTIER_LDAP_STARTTLS").map(|v| v == "true").unwrap_or(false) {
            self.ldap.start_tls = true;
        }

        if let Some(domains) = lookup("PORTIER_REDIRECT_DOMAINS") {
            self.redirect.domains = split_list(&domains);
        }
        if let Some(path) = lookup("PORTIER_REDIRECT_PATH") {
            self.redirect.default_path = path;
        }

        if let Some(name) = lookup("PORTIER_SESSION_COOKIE") {
            self.session.cookie_name = name;
        }
        if lookup("PORTIER_SESSION_SECURE").map(|v| v == "true").unwrap_or(false) {
            self.session.secure = true;
        }

        if let Some(level) = lookup("PORTIER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("PORTIER_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Reject configurations the gateway cannot serve with.
    pub fn validate(&self) -> crate::Result<()> {
        self.server.validate()?;
        self.redirect.validate()?;

        match self.environment {
            Environment::Production => self.ldap.validate()?,
            Environment::Development => {
                if let Err(e) = self.ldap.validate() {
                    warn!("Directory is not usable in development mode: {}", e);
                }
            }
        }

        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Deployment environment.
///
/// Only [`Environment::detect`] decides this; the config file and the CLI
/// cannot switch a deployment into development mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn detect() -> Self {
        Self::from_value(std::env::var(crate::ENV_VAR).ok().as_deref())
    }

    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "development" => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefix under which every gateway route is mounted
    #[serde(default = "default_base_path")]
    pub base_path: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_base_path() -> String {
    "/auth".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            base_path: default_base_path(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    /// Join `url` onto the base path, collapsing doubled slashes and
    /// stripping trailing ones. The root is returned as `/`.
    pub fn path(&self, url: &str) -> String {
        let mut joined = String::with_capacity(self.base_path.len() + url.len());
        for c in self.base_path.chars().chain(url.chars()) {
            if c == '/' && joined.ends_with('/') {
                continue;
            }
            joined.push(c);
        }

        let trimmed = joined.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !self.base_path.starts_with('/') {
            return Err(crate::Error::InvalidConfig(format!(
                "base_path must start with '/': {}",
                self.base_path
            )));
        }
        Ok(())
    }
}

/// How configured group names are matched against memberships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMatch {
    /// Substring match that must not start at offset 0
    #[default]
    Legacy,
    /// Substring match at any offset
    Anywhere,
}

/// LDAP/Active Directory Configuration Section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfigSection {
    /// LDAP server URL (ldap:// or ldaps://)
    #[serde(default = "default_ldap_url")]
    pub server_url: String,

    /// Use STARTTLS
    #[serde(default)]
    pub start_tls: bool,

    /// Service account DN used for user searches
    #[serde(default)]
    pub bind_dn: String,

    /// Service account password
    #[serde(default)]
    pub bind_password: String,

    /// Base DN for user searches
    #[serde(default)]
    pub search_base: String,

    /// Connection and per-operation timeout in seconds
    #[serde(default = "default_ldap_timeout")]
    pub timeout_seconds: u64,

    /// Group name substrings allowed through `/check`; empty allows everyone
    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(default)]
    pub group_match: GroupMatch,
}

fn default_ldap_url() -> String {
    "ldap://localhost:389".to_string()
}

fn default_ldap_timeout() -> u64 {
    10
}

impl Default for LdapConfigSection {
    fn default() -> Self {
        Self {
            server_url: default_ldap_url(),
            start_tls: false,
            bind_dn: String::new(),
            bind_password: String::new(),
            search_base: String::new(),
            timeout_seconds: default_ldap_timeout(),
            groups: Vec::new(),
            group_match: GroupMatch::default(),
        }
    }
}

impl LdapConfigSection {
    pub fn validate(&self) -> crate::Result<()> {
        let url = url::Url::parse(&self.server_url).map_err(|e| {
            crate::Error::InvalidConfig(format!("Invalid LDAP URL {}: {}", self.server_url, e))
        })?;

        if url.scheme() != "ldap" && url.scheme() != "ldaps" {
            return Err(crate::Error::InvalidConfig(
                "LDAP URL must start with ldap:// or ldaps://".to_string(),
            ));
        }

        if self.bind_dn.is_empty() {
            return Err(crate::Error::InvalidConfig("ldap.bind_dn is required".to_string()));
        }

        if self.search_base.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "ldap.search_base is required".to_string(),
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(crate::Error::InvalidConfig(
                "ldap.timeout_seconds must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Domains a post-login `request_uri` may point at
    #[serde(default)]
    pub domains: Vec<String>,

    /// Where to send users when no acceptable `request_uri` was supplied
    #[serde(default = "default_redirect_path")]
    pub default_path: String,
}

fn default_redirect_path() -> String {
    "/".to_string()
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            default_path: default_redirect_path(),
        }
    }
}

impl RedirectConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.default_path.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "redirect.default_path must not be empty".to_string(),
            ));
        }

        for domain in &self.domains {
            if domain.is_empty() || domain.contains('/') {
                return Err(crate::Error::InvalidConfig(format!(
                    "redirect domain must be a bare host name: {:?}",
                    domain
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Seconds of inactivity before a session expires
    #[serde(default = "default_inactivity")]
    pub inactivity_secs: i64,

    /// Only send the cookie over HTTPS
    #[serde(default)]
    pub secure: bool,
}

fn default_cookie_name() -> String {
    "portier.sid".to_string()
}

fn default_inactivity() -> i64 {
    8 * 60 * 60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            inactivity_secs: default_inactivity(),
            secure: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
