//! SMTP connection management with type-state pattern.

mod client;
mod config;
mod session;
mod stream;

pub use client::{
    Authenticated, Client, Connected, Data, MailTransaction, ReadyForMail, RecipientAdded,
};
pub use config::{
    ConnectionConfig, ConnectionConfigBuilder, DEFAULT_TIMEOUT, ParseSecurityError, Security,
};
pub use session::{SessionConfig, deliver};
pub use stream::{SmtpStream, TcpConnector, connect};

use crate::error::Result;
use std::future::Future;

/// Byte stream an SMTP session runs over.
///
/// Implemented by [`SmtpStream`] for real sockets; tests substitute
/// scripted transports.
pub trait Transport: Send {
    /// Reads one line, terminator included.
    ///
    /// Returns [`crate::Error::ConnectionClosed`] at end of stream.
    fn read_line(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Writes and flushes `data`.
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Negotiates TLS on the already-open connection.
    ///
    /// Later reads and writes go through the encrypted channel of the
    /// same transport. A failure leaves the transport unusable.
    fn upgrade_to_tls(&mut self, hostname: &str) -> impl Future<Output = Result<()>> + Send;

    /// Closes the connection.
    fn shutdown(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens transports for a connection configuration.
pub trait Connector: Send + Sync {
    /// Transport produced by this connector.
    type Stream: Transport;

    /// Opens a connection, including implicit TLS where configured.
    fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> impl Future<Output = Result<Self::Stream>> + Send;
}
