//! Core SMTP types.

mod address;
mod credentials;
mod reply;
mod step;

pub use address::Address;
pub use credentials::Credentials;
pub use reply::{Reply, ReplyCode};
pub use step::{SessionState, Step};
