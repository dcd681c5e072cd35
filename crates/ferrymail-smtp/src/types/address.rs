//! Email address types.

use crate::error::{Error, Result};

/// Email address for the SMTP envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    /// Applies the same address rule as the `From` and `To` headers.
    fn validate(addr: &str) -> Result<()> {
        ferrymail_mime::validate_address(addr).map_err(|err| match err {
            ferrymail_mime::Error::InvalidAddress(reason) => Error::InvalidAddress(reason),
            other => Error::InvalidAddress(other.to_string()),
        })
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        let addr = Address::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
        assert_eq!(addr.domain(), "example.com");
    }

    #[test]
    fn test_invalid_address_no_at() {
        assert!(Address::new("userexample.com").is_err());
    }

    #[test]
    fn test_invalid_address_empty() {
        assert!(Address::new("").is_err());
    }

    #[test]
    fn test_invalid_address_empty_parts() {
        assert!(Address::new("@example.com").is_err());
        assert!(Address::new("user@").is_err());
    }

    #[test]
    fn test_matches_header_rule() {
        for addr in [
            "user@example.com",
            "a@b@c",
            "user@",
            "<user@example.com>",
            "tab\t@example.com",
            "",
        ] {
            assert_eq!(
                Address::new(addr).is_ok(),
                ferrymail_mime::validate_address(addr).is_ok(),
                "{addr:?}"
            );
        }
    }

    #[test]
    fn test_invalid_address_command_injection() {
        assert!(Address::new("a@example.com>\r\nRCPT TO:<b@example.com").is_err());
        assert!(Address::new("a b@example.com").is_err());
    }
}
