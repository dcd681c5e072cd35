//! AUTH LOGIN credentials.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

/// Username and password for AUTH LOGIN.
///
/// Only constructed when both parts are non-empty; an empty username or
/// password means the AUTH exchange is skipped.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials, or `None` if either part is empty.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { username, password })
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Base64 form of the username, as sent after the first 334.
    #[must_use]
    pub fn encoded_username(&self) -> String {
        STANDARD.encode(self.username.as_bytes())
    }

    /// Base64 form of the password, as sent after the second 334.
    #[must_use]
    pub fn encoded_password(&self) -> String {
        STANDARD.encode(self.password.as_bytes())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
