//! Connection configuration types.

use rustls::pki_types::CertificateDer;
use std::str::FromStr;
use std::time::Duration;

/// Default connect and read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption. **Not recommended for production.**
    None,
    /// TLS from the start (port 465).
    Tls,
    /// Start with plaintext, upgrade with STARTTLS (port 587).
    #[default]
    StartTls,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::Tls => 465,
            Self::StartTls => 587,
        }
    }

    /// Returns the configuration name of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tls => "tls",
            Self::StartTls => "starttls",
        }
    }
}

impl std::fmt::Display for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown security mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown encryption mode: {0:?} (expected none, tls, ssl or starttls)")]
pub struct ParseSecurityError(pub String);

impl FromStr for Security {
    type Err = ParseSecurityError;

    /// Parses `none` (or empty), `tls`/`ssl` and `starttls`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "plain" => Ok(Self::None),
            "tls" | "ssl" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            _ => Err(ParseSecurityError(s.to_string())),
        }
    }
}

/// SMTP connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Server hostname, also used as the TLS server name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Applied to connection establishment and to every read and write.
    pub timeout: Duration,
    /// Trust anchors added to the Mozilla roots, e.g. for a self-signed
    /// server. The certificate must still match `host`.
    pub root_certificates: Vec<CertificateDer<'static>>,
}

impl ConnectionConfig {
    /// Creates a new configuration with STARTTLS on port 587.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new(host)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    timeout: Duration,
    root_certificates: Vec<CertificateDer<'static>>,
}

impl ConnectionConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            timeout: DEFAULT_TIMEOUT,
            root_certificates: Vec::new(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connect and I/O timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Trusts `cert` in addition to the Mozilla roots.
    #[must_use]
    pub fn add_root_certificate(mut self, cert: CertificateDer<'static>) -> Self {
        self.root_certificates.push(cert);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            timeout: self.timeout,
            root_certificates: self.root_certificates,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_security_default_ports() {
        assert_eq!(Security::None.default_port(), 25);
        assert_eq!(Security::Tls.default_port(), 465);
        assert_eq!(Security::StartTls.default_port(), 587);
    }

    #[test]
    fn test_security_from_str() {
        assert_eq!("none".parse::<Security>().unwrap(), Security::None);
        assert_eq!("".parse::<Security>().unwrap(), Security::None);
        assert_eq!("TLS".parse::<Security>().unwrap(), Security::Tls);
        assert_eq!("ssl".parse::<Security>().unwrap(), Security::Tls);
        assert_eq!("StartTLS".parse::<Security>().unwrap(), Security::StartTls);
        assert!("smtps-ish".parse::<Security>().is_err());
    }

    #[test]
    fn test_config_new() {
        let config = ConnectionConfig::new("smtp.example.com");
        assert_eq!(config.port, 587);
        assert_eq!(config.security, Security::StartTls);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.root_certificates.is_empty());
    }

    #[test]
    fn test_builder_port_follows_security() {
        let config = ConnectionConfig::builder("smtp.example.com")
            .security(Security::Tls)
            .build();
        assert_eq!(config.port, 465);
    }

    #[test]
    fn test_builder_custom() {
        let config = ConnectionConfig::builder("127.0.0.1")
            .port(2525)
            .security(Security::None)
            .timeout(Duration::from_secs(2))
            .build();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 2525);
        assert_eq!(config.security, Security::None);
        assert_eq!(config.timeout, Duration::from_secs(2));
    }
}
