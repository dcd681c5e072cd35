//! Error types for the mailer.

use ferrymail_smtp::ErrorKind;
use thiserror::Error;

/// Everything that can make a single send fail.
///
/// [`crate::Mailer`] never returns this to callers; it is logged and turned
/// into `false`. It stays precise so the outcome can be inspected in tests
/// through [`crate::Mailer::try_send`].
#[derive(Debug, Error)]
pub enum MailError {
    /// Connection, TLS, protocol or authentication failure.
    #[error(transparent)]
    Smtp(#[from] ferrymail_smtp::Error),

    /// The message could not be composed.
    #[error("Invalid message: {0}")]
    Compose(#[from] ferrymail_mime::Error),

    /// The template renderer has no template with this name.
    #[error("Email template not found: {name}")]
    TemplateNotFound {
        /// Requested template name.
        name: String,
    },

    /// The template exists but could not be rendered.
    #[error("Failed to render template {name}: {reason}")]
    Template {
        /// Requested template name.
        name: String,
        /// Renderer message.
        reason: String,
    },
}

impl MailError {
    /// Returns the failure category recorded in log context.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Smtp(err) => match err.kind() {
                ErrorKind::InvalidInput => "InvalidMessage",
                other => other.as_str(),
            },
            Self::Compose(_) => "InvalidMessage",
            Self::TemplateNotFound { .. } => "TemplateNotFound",
            Self::Template { .. } => "TemplateFailure",
        }
    }
}

/// Result type alias using [`MailError`].
pub type Result<T> = std::result::Result<T, MailError>;

/// Invalid transport configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable held a value that could not be parsed.
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
        /// Parser message.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl ToString) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
