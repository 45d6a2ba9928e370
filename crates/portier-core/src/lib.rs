//! Portier Core Library
//!
//! Core types, configuration and errors for the Portier forward-authentication
//! gateway.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Environment, PortierConfig};
pub use error::{Error, PreconditionViolation, Result};

/// Portier version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable selecting the deployment environment
pub const ENV_VAR: &str = "PORTIER_ENV";

/// Membership sentinel for users without any group
pub const NO_GROUPS: &str = "NO_GROUPS";

/// Message shown on the login form for every failed attempt
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password.";
