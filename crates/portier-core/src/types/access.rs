//! Session states and access decisions

use serde::{Deserialize, Serialize};

/// Classification of a session at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No user in the session
    Anonymous,
    /// User present and allowed by the group policy
    Authenticated,
    /// User present but rejected by the group policy
    AuthenticatedUnauthorized,
}

impl SessionState {
    /// Status code returned to the proxy subrequest
    pub fn http_status(&self) -> u16 {
        match self {
            SessionState::Anonymous => 401,
            SessionState::Authenticated => 200,
            SessionState::AuthenticatedUnauthorized => 403,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticated => "authenticated",
            SessionState::AuthenticatedUnauthorized => "unauthorized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SessionState::Anonymous.http_status(), 401);
        assert_eq!(SessionState::Authenticated.http_status(), 200);
        assert_eq!(SessionState::AuthenticatedUnauthorized.http_status(), 403);
    }
}
