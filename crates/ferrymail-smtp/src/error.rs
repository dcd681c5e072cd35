//! Error types for SMTP operations.

use crate::types::{ReplyCode, Step};
use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Could not open the connection (DNS, refused, connect timeout).
    #[error("Connection to {host}:{port} failed: {source}")]
    Connect {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// TLS negotiation failed (implicit TLS or STARTTLS).
    #[error("TLS handshake with {host} failed: {reason}")]
    Tls {
        /// Server name used for the handshake.
        host: String,
        /// Failure detail.
        reason: String,
    },

    /// Server answered a gated step with the wrong code.
    #[error("Unexpected reply at {step}: expected {expected}, got {actual}: {response}")]
    UnexpectedReply {
        /// Step that was being performed.
        step: Step,
        /// Code required by the step.
        expected: ReplyCode,
        /// Code the server sent.
        actual: ReplyCode,
        /// Raw reply text.
        response: String,
    },

    /// Server rejected the AUTH LOGIN exchange.
    #[error("Authentication rejected at {step}: expected {expected}, got {actual}: {response}")]
    AuthRejected {
        /// Step of the AUTH exchange.
        step: Step,
        /// Code required by the step.
        expected: ReplyCode,
        /// Code the server sent.
        actual: ReplyCode,
        /// Raw reply text.
        response: String,
    },

    /// A read or write did not complete in time.
    #[error("Timed out after {after:?} during {operation}")]
    Timeout {
        /// What was in progress (`read`, `write`, ...).
        operation: &'static str,
        /// Configured timeout.
        after: Duration,
    },

    /// Server closed the connection mid-exchange.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed reply or invalid use of the stream.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid envelope address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Failure category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No protocol exchange took place.
    ConnectionFailure,
    /// TLS could not be negotiated.
    TlsHandshakeFailure,
    /// Unexpected reply code at a gated step.
    ProtocolFailure,
    /// Unexpected reply code during AUTH.
    AuthFailure,
    /// I/O failure, timeout or malformed reply after connecting.
    TransportFailure,
    /// Bad input from the caller.
    InvalidInput,
}

impl ErrorKind {
    /// Returns the category name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionFailure => "ConnectionFailure",
            Self::TlsHandshakeFailure => "TlsHandshakeFailure",
            Self::ProtocolFailure => "ProtocolFailure",
            Self::AuthFailure => "AuthFailure",
            Self::TransportFailure => "TransportFailure",
            Self::InvalidInput => "InvalidInput",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Creates a reply-code mismatch error for a step.
    ///
    /// Steps of the AUTH exchange produce [`Error::AuthRejected`].
    #[must_use]
    pub fn unexpected_reply(
        step: Step,
        expected: ReplyCode,
        actual: ReplyCode,
        response: impl Into<String>,
    ) -> Self {
        let response = response.into();
        if step.is_auth() {
            Self::AuthRejected {
                step,
                expected,
                actual,
                response,
            }
        } else {
            Self::UnexpectedReply {
                step,
                expected,
                actual,
                response,
            }
        }
    }

    /// Returns the failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. } => ErrorKind::ConnectionFailure,
            Self::Tls { .. } => ErrorKind::TlsHandshakeFailure,
            Self::UnexpectedReply { .. } => ErrorKind::ProtocolFailure,
            Self::AuthRejected { .. } => ErrorKind::AuthFailure,
            Self::Timeout { .. } | Self::ConnectionClosed | Self::Io(_) | Self::Protocol(_) => {
                ErrorKind::TransportFailure
            }
            Self::InvalidAddress(_) => ErrorKind::InvalidInput,
        }
    }

    /// Returns the step, expected code and actual code of a reply mismatch.
    #[must_use]
    pub const fn reply_mismatch(&self) -> Option<(Step, ReplyCode, ReplyCode)> {
        match self {
            Self::UnexpectedReply {
                step,
                expected,
                actual,
                ..
            }
            | Self::AuthRejected {
                step,
                expected,
                actual,
                ..
            } => Some((*step, *expected, *actual)),
            _ => None,
        }
    }

    /// Returns true if the server's code was permanent (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self.reply_mismatch(), Some((_, _, actual)) if actual.is_permanent())
    }

    /// Returns true if the server's code was transient (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.reply_mismatch(), Some((_, _, actual)) if actual.is_transient())
    }
}
