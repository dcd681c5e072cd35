//! Outbound message value.

use crate::composer::{assemble_payload, header_block, normalize_line_endings, validate_override};
use crate::error::Result;
use crate::header::Headers;

/// A single-recipient message ready for the DATA phase.
///
/// Built once from the sender, recipient, subject and rendered body;
/// immutable afterwards. `Date` and `Message-ID` are fixed at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    from_address: String,
    to: String,
    subject: String,
    headers: Headers,
    body: String,
}

impl OutboundMessage {
    /// Creates a message builder.
    #[must_use]
    pub fn builder() -> OutboundMessageBuilder {
        OutboundMessageBuilder::default()
    }

    /// Envelope sender.
    #[must_use]
    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    /// Envelope recipient.
    #[must_use]
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Subject as given (before header encoding).
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Final header block, overrides applied.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Body with CRLF line endings, not yet dot-stuffed.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the exact DATA payload, terminator included.
    #[must_use]
    pub fn payload(&self) -> String {
        assemble_payload(&self.headers.to_string(), &self.body)
    }
}

/// Builder for [`OutboundMessage`].
#[derive(Debug, Clone, Default)]
pub struct OutboundMessageBuilder {
    from_address: String,
    from_name: String,
    to: String,
    subject: String,
    body: String,
    overrides: Vec<(String, String)>,
}

impl OutboundMessageBuilder {
    /// Sets the sender address and display name.
    #[must_use]
    pub fn from(mut self, address: impl Into<String>, name: impl Into<String>) -> Self {
        self.from_address = address.into();
        self.from_name = name.into();
        self
    }

    /// Sets the recipient.
    #[must_use]
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to = address.into();
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the already-rendered body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Overrides (or adds) a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((name.into(), value.into()));
        self
    }

    /// Builds the message.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is invalid or a header value would
    /// break the message framing.
    pub fn build(self) -> Result<OutboundMessage> {
        let mut headers = header_block(&self.from_address, &self.from_name, &self.to, &self.subject)?;
        for (name, value) in self.overrides {
            validate_override(&name, &value)?;
            headers.set(name, value);
        }

        Ok(OutboundMessage {
            from_address: self.from_address,
            to: self.to,
            subject: self.subject,
            headers,
            body: normalize_line_endings(&self.body),
        })
    }
}
