//! Error types for Portier

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Directory Errors
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),

    // Authentication Errors
    #[error("Invalid username or password")]
    InvalidCredentials,

    // Caller bugs
    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),

    // Session Errors
    #[error("Session store error: {0}")]
    Session(String),

    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::DirectoryUnavailable(_) => "DirectoryUnavailable",
            Error::InvalidCredentials => "InvalidCredentials",
            Error::Precondition(_) => "PreconditionViolation",
            Error::Session(_) => "SessionError",
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidCredentials => 401,
            _ => 500,
        }
    }
}

/// A caller violated the contract of an internal function.
///
/// This is a bug in the calling code, never a runtime condition to recover
/// from, and is kept apart from the directory and credential errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("precondition violated in {operation}: {message}")]
pub struct PreconditionViolation {
    pub operation: &'static str,
    pub message: String,
}

impl PreconditionViolation {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::InvalidCredentials.http_status(), 401);
        assert_eq!(Error::DirectoryUnavailable("down".into()).http_status(), 500);

        let err: Error = PreconditionViolation::new("authenticate", "empty dn").into();
        assert_eq!(err.code(), "PreconditionViolation");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn test_precondition_message() {
        let violation = PreconditionViolation::new("authenticate", "user has no distinguished name");
        assert_eq!(
            violation.to_string(),
            "precondition violated in authenticate: user has no distinguished name"
        );
    }
}
