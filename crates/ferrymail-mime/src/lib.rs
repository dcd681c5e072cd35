//! # ferrymail-mime
//!
//! RFC 5322 message composition for the ferrymail SMTP transport.
//!
//! ## Features
//!
//! - **Headers**: `From`, `To`, `Subject`, `Date`, `Message-ID` and the MIME
//!   headers for a single `text/html` part
//! - **Header encoding**: RFC 2047 encoded-words for non-ASCII text
//! - **Transparency**: SMTP dot-stuffing and the DATA terminator
//!
//! ## Quick Start
//!
//! ```ignore
//! use ferrymail_mime::OutboundMessage;
//!
//! let message = OutboundMessage::builder()
//!     .from("noreply@example.com", "App")
//!     .to("user@example.org")
//!     .subject("Welcome")
//!     .body("<p>Hello!</p>")
//!     .build()?;
//!
//! let payload = message.payload(); // ends with "\r\n.\r\n"
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod header;
mod message;

pub mod composer;
pub mod encoding;

pub use composer::{
    assemble_payload, build_headers, dot_stuff, header_block, message_id, validate_address,
};
pub use error::{Error, Result};
pub use header::{Headers, validate_header};
pub use message::{OutboundMessage, OutboundMessageBuilder};
