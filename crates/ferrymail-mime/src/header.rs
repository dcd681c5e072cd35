//! Message header handling.

use crate::error::{Error, Result};
use std::fmt;

/// Ordered collection of message headers.
///
/// Insertion order is preserved when the headers are written out, and
/// name lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, keeping any existing values with the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Sets a header value.
    ///
    /// The first header with the same name is replaced in place and any
    /// further duplicates are dropped; otherwise the header is appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.position(&name) {
            Some(index) => {
                self.entries[index] = (name.clone(), value);
                let mut seen = 0usize;
                self.entries.retain(|(existing, _)| {
                    if existing.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Checks every header for values that would break the message framing.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty or malformed name, or a value that
    /// contains CR or LF.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.entries {
            validate_header(name, value)?;
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

/// Validates a single header name and value.
///
/// # Errors
///
/// Returns an error if the name is empty or not printable ASCII without
/// a colon, or if the value contains a line break.
pub fn validate_header(name: &str, value: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_header(name, "name is empty"));
    }

    if !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
        return Err(Error::invalid_header(name, "name contains invalid characters"));
    }

    if value.contains(['\r', '\n']) {
        return Err(Error::invalid_header(name, "value contains a line break"));
    }

    Ok(())
}

impl fmt::Display for Headers {
    /// Writes every header as a CRLF-terminated `Name: value` line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}
