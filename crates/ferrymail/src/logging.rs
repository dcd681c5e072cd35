//! Outcome logging.
//!
//! Each send produces exactly one [`LogEntry`] on the `mail` channel. The
//! sink is injected into [`crate::Mailer`] so applications can route entries
//! wherever they like; [`TracingSink`] forwards them to `tracing`.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Channel used for every mailer entry.
pub const MAIL_CHANNEL: &str = "mail";

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Successful outcome.
    Info,
    /// Failed outcome.
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// One structured log record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// Channel name.
    pub channel: String,
    /// Severity.
    pub level: Level,
    /// Short human-readable message.
    pub message: String,
    /// Structured key/value context.
    pub context: Map<String, Value>,
}

impl LogEntry {
    /// Creates an entry on the mail channel with empty context.
    #[must_use]
    pub fn mail(level: Level, message: impl Into<String>) -> Self {
        Self {
            channel: MAIL_CHANNEL.to_string(),
            level,
            message: message.into(),
            context: Map::new(),
        }
    }

    /// Adds a context value.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    /// Returns a context value as a string, if present.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str)
    }
}

/// Destination for log entries.
///
/// Implementations must be safe to call from concurrent sends and must not
/// fail.
pub trait LogSink: Send + Sync {
    /// Records one entry.
    fn record(&self, entry: LogEntry);
}

/// Sink that emits entries as `tracing` events with target `mail`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, entry: LogEntry) {
        let context = Value::Object(entry.context).to_string();
        match entry.level {
            Level::Info => tracing::info!(
                target: "mail",
                channel = %entry.channel,
                context = %context,
                "{}",
                entry.message
            ),
            Level::Error => tracing::error!(
                target: "mail",
                channel = %entry.channel,
                context = %context,
                "{}",
                entry.message
            ),
        }
    }
}

/// Sink that keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl LogSink for MemorySink {
    fn record(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
