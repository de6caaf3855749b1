//! Registry login credential

use std::fmt;

/// A login attempt's credential. Lives only until it is handed to the store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub domain: String,
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(
        domain: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
