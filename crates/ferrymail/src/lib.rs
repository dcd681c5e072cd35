//! # ferrymail
//!
//! Sends single emails over SMTP and reports the outcome as a boolean plus
//! one structured log entry.
//!
//! ## Features
//!
//! - **Plain, implicit TLS or STARTTLS** transport with certificate and
//!   hostname verification
//! - **AUTH LOGIN** when a username and password are configured
//! - **Templates**: bodies rendered with Tera from a template directory
//! - **Outcome logging** through a pluggable [`LogSink`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use ferrymail::{Mailer, SendOptions, TeraRenderer, TransportConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TransportConfig::from_env()?;
//!     let mailer = Mailer::new(config)
//!         .with_renderer(Arc::new(TeraRenderer::from_dir("templates")?));
//!
//!     let sent = mailer
//!         .send_template(
//!             "user@example.org",
//!             "Reset your password",
//!             "emails/password-reset",
//!             &serde_json::json!({ "name": "Ada", "link": "https://example.com/r/abc" }),
//!         )
//!         .await;
//!
//!     println!("sent: {sent}");
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: transport settings, from code, serde or the environment
//! - [`logging`]: log entries and sinks
//! - [`template`]: template rendering

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod logging;
mod mailer;
pub mod template;

pub use config::{TransportConfig, TransportConfigBuilder};
pub use error::{ConfigError, MailError, Result};
pub use logging::{Level, LogEntry, LogSink, MemorySink, TracingSink};
pub use mailer::{Mailer, SendOptions};
pub use template::{TemplateError, TemplateRenderer, TeraRenderer};

pub use ferrymail_smtp::{Connector, Security, TcpConnector};
