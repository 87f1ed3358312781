//! Force-build authentication policy.
//!
//! A single optional username/password pair, checked against the
//! `username`/`passwd` fields of the force form. When no pair is
//! configured, forcing builds is open to anyone who can reach the page.

/// Credential policy for mutating actions.
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    credentials: Option<(String, String)>,
}

impl AuthPolicy {
    /// No authentication required.
    pub fn open() -> Self {
        Self { credentials: None }
    }

    pub fn with_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Some((username.into(), password.into())),
        }
    }

    /// Whether force submissions must carry valid credentials.
    pub fn requires_auth(&self) -> bool {
        self.credentials.is_some()
    }

    /// Check submitted credentials. Always false when a pair is
    /// configured and the submission does not match it exactly.
    pub fn check(&self, username: &str, password: &str) -> bool {
        match &self.credentials {
            None => true,
            Some((u, p)) => u == username && p == password,
        }
    }
}
