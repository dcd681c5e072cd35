//! Transport configuration.

use crate::error::ConfigError;
use ferrymail_smtp::{ConnectionConfig, Credentials, Security};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Default EHLO name when the machine hostname is unavailable.
const LOCALHOST: &str = "localhost";

/// Immutable SMTP transport settings for a [`crate::Mailer`].
///
/// An empty username or password means AUTH is skipped. Deserialized
/// values go through [`TransportConfigBuilder`], so an omitted port follows
/// the encryption mode and the timeout is at least one second.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "TransportSettings")]
pub struct TransportConfig {
    /// SMTP server hostname. Also the TLS server name.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// `none`, `tls` (or `ssl`) or `starttls`.
    pub encryption: Security,
    /// AUTH LOGIN username.
    pub username: String,
    /// AUTH LOGIN password.
    pub password: String,
    /// Connect and per-read timeout in seconds.
    pub timeout: u64,
    /// Default sender address.
    pub from_address: String,
    /// Default sender display name.
    pub from_name: String,
    /// EHLO name. Defaults to the machine hostname.
    pub helo_name: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: LOCALHOST.to_string(),
            port: 587,
            encryption: Security::StartTls,
            username: String::new(),
            password: String::new(),
            timeout: 10,
            from_address: "noreply@example.com".to_string(),
            from_name: "App".to_string(),
            helo_name: None,
        }
    }
}

impl TransportConfig {
    /// Creates a builder starting from the defaults.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> TransportConfigBuilder {
        TransportConfigBuilder {
            config: Self {
                host: host.into(),
                ..Self::default()
            },
            port: None,
        }
    }

    /// Reads settings from `MAIL_*` environment variables.
    ///
    /// Unset variables keep their defaults. When `MAIL_PORT` is unset the
    /// port follows the encryption mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `MAIL_PORT`, `MAIL_TIMEOUT` or
    /// `MAIL_ENCRYPTION` cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Self::builder(lookup("MAIL_HOST").unwrap_or_else(|| LOCALHOST.into()));

        if let Some(value) = lookup("MAIL_ENCRYPTION") {
            let security = value
                .parse::<Security>()
                .map_err(|e| ConfigError::invalid("MAIL_ENCRYPTION", &value, e))?;
            builder = builder.encryption(security);
        }
        if let Some(value) = lookup("MAIL_PORT") {
            let port = value
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid("MAIL_PORT", &value, e))?;
            builder = builder.port(port);
        }
        if let Some(value) = lookup("MAIL_TIMEOUT") {
            let secs = value
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid("MAIL_TIMEOUT", &value, e))?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let username = lookup("MAIL_USERNAME").unwrap_or_default();
        let password = lookup("MAIL_PASSWORD").unwrap_or_default();
        builder = builder.credentials(username, password);

        let defaults = Self::default();
        builder = builder.from(
            lookup("MAIL_FROM_ADDRESS").unwrap_or(defaults.from_address),
            lookup("MAIL_FROM_NAME").unwrap_or(defaults.from_name),
        );
        if let Some(name) = lookup("MAIL_HELO_NAME") {
            builder = builder.helo_name(name);
        }

        Ok(builder.build())
    }

    /// Returns the connect and per-read timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Returns the name announced with EHLO.
    #[must_use]
    pub fn client_id(&self) -> String {
        self.helo_name
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| hostname::get().ok().and_then(|s| s.into_string().ok()))
            .unwrap_or_else(|| LOCALHOST.to_string())
    }

    /// Projects the settings onto the connector.
    #[must_use]
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::builder(self.host.clone())
            .port(self.port)
            .security(self.encryption)
            .timeout(self.timeout())
            .build()
    }

    /// Returns AUTH credentials, or `None` when AUTH is skipped.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
    port: Option<u16>,
}

impl TransportConfigBuilder {
    /// Sets the port. Defaults to the encryption mode's standard port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the encryption mode.
    #[must_use]
    pub const fn encryption(mut self, encryption: Security) -> Self {
        self.config.encryption = encryption;
        self
    }

    /// Sets the AUTH LOGIN credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    /// Sets the timeout. Sub-second parts are dropped, with a minimum of one second.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout.as_secs().max(1);
        self
    }

    /// Sets the default sender.
    #[must_use]
    pub fn from(mut self, address: impl Into<String>, name: impl Into<String>) -> Self {
        self.config.from_address = address.into();
        self.config.from_name = name.into();
        self
    }

    /// Sets the EHLO name.
    #[must_use]
    pub fn helo_name(mut self, name: impl Into<String>) -> Self {
        self.config.helo_name = Some(name.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(mut self) -> TransportConfig {
        self.config.port = self
            .port
            .unwrap_or_else(|| self.config.encryption.default_port());
        self.config
    }
}

/// Serialized form of [`TransportConfig`]; every field is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct TransportSettings {
    host: String,
    port: Option<u16>,
    #[serde(deserialize_with = "deserialize_security")]
    encryption: Security,
    username: String,
    password: String,
    timeout: u64,
    from_address: String,
    from_name: String,
    helo_name: Option<String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        let defaults = TransportConfig::default();
        Self {
            host: defaults.host,
            port: None,
            encryption: defaults.encryption,
            username: defaults.username,
            password: defaults.password,
            timeout: defaults.timeout,
            from_address: defaults.from_address,
            from_name: defaults.from_name,
            helo_name: defaults.helo_name,
        }
    }
}

impl From<TransportSettings> for TransportConfig {
    fn from(settings: TransportSettings) -> Self {
        let mut builder = Self::builder(settings.host)
            .encryption(settings.encryption)
            .credentials(settings.username, settings.password)
            .timeout(Duration::from_secs(settings.timeout))
            .from(settings.from_address, settings.from_name);
        if let Some(port) = settings.port {
            builder = builder.port(port);
        }
        if let Some(name) = settings.helo_name {
            builder = builder.helo_name(name);
        }
        builder.build()
    }
}

fn deserialize_security<'de, D>(deserializer: D) -> Result<Security, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    value.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 587);
        assert_eq!(config.encryption, Security::StartTls);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.from_address, "noreply@example.com");
        assert_eq!(config.from_name, "App");
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_builder_port_follows_encryption() {
        let config = TransportConfig::builder("smtp.example.com")
            .encryption(Security::Tls)
            .build();
        assert_eq!(config.port, 465);

        let config = TransportConfig::builder("smtp.example.com")
            .encryption(Security::Tls)
            .port(2465)
            .build();
        assert_eq!(config.port, 2465);
    }

    #[test]
    fn test_credentials_require_both_parts() {
        let config = TransportConfig::builder("h").credentials("user", "").build();
        assert!(config.credentials().is_none());

        let config = TransportConfig::builder("h").credentials("user", "pw").build();
        assert_eq!(config.credentials().unwrap().username(), "user");
    }

    #[test]
    fn test_connection_config() {
        let config = TransportConfig::builder("127.0.0.1")
            .port(2525)
            .encryption(Security::None)
            .timeout(Duration::from_secs(3))
            .build();
        let conn = config.connection_config();
        assert_eq!(conn.host, "127.0.0.1");
        assert_eq!(conn.port, 2525);
        assert_eq!(conn.security, Security::None);
        assert_eq!(conn.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_client_id() {
        let config = TransportConfig::builder("h").helo_name("mailer.test").build();
        assert_eq!(config.client_id(), "mailer.test");

        let config = TransportConfig::builder("h").helo_name("").build();
        assert!(!config.client_id().is_empty());
    }

    #[test]
    fn test_from_lookup() {
        let config = TransportConfig::from_lookup(lookup(&[
            ("MAIL_HOST", "smtp.example.com"),
            ("MAIL_ENCRYPTION", "ssl"),
            ("MAIL_USERNAME", "user"),
            ("MAIL_PASSWORD", "secret"),
            ("MAIL_TIMEOUT", "5"),
            ("MAIL_FROM_ADDRESS", "app@example.com"),
            ("MAIL_FROM_NAME", "Example"),
        ]))
        .unwrap();

        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.encryption, Security::Tls);
        assert_eq!(config.port, 465);
        assert_eq!(config.timeout, 5);
        assert_eq!(config.from_address, "app@example.com");
        assert_eq!(config.from_name, "Example");
        assert!(config.credentials().is_some());
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = TransportConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TransportConfig::default());
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = TransportConfig::from_lookup(lookup(&[("MAIL_PORT", "smtp")])).unwrap_err();
        assert!(err.to_string().contains("MAIL_PORT"));

        assert!(TransportConfig::from_lookup(lookup(&[("MAIL_ENCRYPTION", "rot13")])).is_err());
        assert!(TransportConfig::from_lookup(lookup(&[("MAIL_TIMEOUT", "-1")])).is_err());
    }

    #[test]
    fn test_deserialize() {
        let config: TransportConfig = serde_json::from_value(serde_json::json!({
            "host": "smtp.example.com",
            "port": 465,
            "encryption": "tls",
            "username": "user",
            "password": "pw"
        }))
        .unwrap();

        assert_eq!(config.encryption, Security::Tls);
        assert_eq!(config.port, 465);
        assert_eq!(config.timeout, 10);
        assert_eq!(config.from_name, "App");
    }

    #[test]
    fn test_deserialize_port_follows_encryption() {
        let config: TransportConfig =
            serde_json::from_value(serde_json::json!({ "encryption": "tls" })).unwrap();
        assert_eq!(config.port, 465);

        let config: TransportConfig =
            serde_json::from_value(serde_json::json!({ "encryption": "none" })).unwrap();
        assert_eq!(config.port, 25);

        let config: TransportConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config, TransportConfig::default());
    }

    #[test]
    fn test_deserialize_zero_timeout_clamped() {
        let config: TransportConfig =
            serde_json::from_value(serde_json::json!({ "timeout": 0 })).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(config.connection_config().timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_deserialize_rejects_unknown_encryption() {
        let result: Result<TransportConfig, _> =
            serde_json::from_value(serde_json::json!({ "encryption": "rot13" }));
        assert!(result.is_err());
    }
}
