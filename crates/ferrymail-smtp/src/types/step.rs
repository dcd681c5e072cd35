//! Handshake steps and session states.

use std::fmt;

/// A gated step of the send sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Server banner.
    Greeting,
    /// `EHLO`, before or after STARTTLS.
    Ehlo,
    /// `STARTTLS`.
    StartTls,
    /// `AUTH LOGIN`.
    AuthLogin,
    /// Base64 username line.
    AuthUsername,
    /// Base64 password line.
    AuthPassword,
    /// `MAIL FROM`.
    MailFrom,
    /// `RCPT TO`.
    RcptTo,
    /// `DATA`.
    Data,
    /// Message content and terminator.
    Payload,
}

impl Step {
    /// Returns the step name used in errors and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Ehlo => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::AuthLogin => "AUTH LOGIN",
            Self::AuthUsername => "AUTH username",
            Self::AuthPassword => "AUTH password",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Data => "DATA",
            Self::Payload => "payload",
        }
    }

    /// Returns true for the steps of the AUTH LOGIN exchange.
    #[must_use]
    pub const fn is_auth(self) -> bool {
        matches!(self, Self::AuthLogin | Self::AuthUsername | Self::AuthPassword)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a session in the handshake.
///
/// Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    /// Socket open, nothing read yet.
    Connected,
    /// 220 banner received.
    GreetingReceived,
    /// First EHLO accepted.
    EhloDone,
    /// STARTTLS accepted and TLS negotiated.
    TlsUpgraded,
    /// EHLO accepted over TLS.
    EhloDoneAgain,
    /// AUTH LOGIN accepted.
    Authenticated,
    /// MAIL FROM accepted.
    MailAccepted,
    /// RCPT TO accepted.
    RecipientAccepted,
    /// DATA accepted (354).
    DataAccepted,
    /// Payload accepted.
    PayloadSent,
    /// Socket closed.
    Closed,
}
