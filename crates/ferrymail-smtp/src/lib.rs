//! # ferrymail-smtp
//!
//! Minimal SMTP client for delivering one message per connection (RFC 5321).
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   SMTP state transitions
//! - **Strict reply gating**: every step requires one exact reply code
//! - **TLS support**: Both implicit TLS (port 465) and STARTTLS, with
//!   certificate and hostname verification
//! - **Authentication**: LOGIN
//!
//! ## Quick Start
//!
//! ```ignore
//! use ferrymail_smtp::{Address, Client, ConnectionConfig, Credentials, Security};
//! use ferrymail_smtp::connection::connect;
//!
//! #[tokio::main]
//! async fn main() -> ferrymail_smtp::Result<()> {
//!     let config = ConnectionConfig::builder("smtp.example.com")
//!         .security(Security::StartTls)
//!         .build();
//!     let stream = connect(&config).await?;
//!
//!     let client = Client::from_transport(stream, "client.example.com").await?;
//!     let client = client.ehlo().await?;
//!     let client = client.starttls("smtp.example.com").await?;
//!
//!     let credentials = Credentials::new("user@example.com", "password").unwrap();
//!     let client = client.auth_login(&credentials).await?;
//!
//!     let from = Address::new("sender@example.com")?;
//!     let to = Address::new("recipient@example.com")?;
//!
//!     let client = client.mail_from(&from).await?;
//!     let client = client.rcpt_to(&to).await?;
//!     let client = client.data().await?;
//!     let client = client
//!         .send_payload(b"Subject: Test\r\n\r\nHello, World!\r\n.\r\n")
//!         .await?;
//!
//!     client.quit().await;
//!     Ok(())
//! }
//! ```
//!
//! [`deliver`] runs the same sequence from a [`SessionConfig`].
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── auth_login() ───→ Authenticated
//! └──────────────┘
//!        │
//!        └─── mail_from() ───→ MailTransaction ───→ RecipientAdded ───→ Data
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Connection management and type-state client
//! - [`parser`]: Response parser
//! - [`types`]: Core SMTP types (addresses, credentials, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, ConnectionConfig, Connector, Data, MailTransaction,
    RecipientAdded, Security, SessionConfig, SmtpStream, TcpConnector, Transport, deliver,
};
pub use error::{Error, ErrorKind, Result};
pub use types::{Address, Credentials, Reply, ReplyCode, SessionState, Step};
