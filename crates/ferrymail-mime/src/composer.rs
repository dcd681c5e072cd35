//! Header construction and DATA payload assembly.
//!
//! Everything here is pure apart from the clock and random source used
//! for the `Date` and `Message-ID` headers.

use crate::encoding::{encode_display_name, encode_rfc2047};
use crate::error::{Error, Result};
use crate::header::{Headers, validate_header};
use rand::Rng;
use std::fmt::Write as _;

/// Line terminator used on the wire.
pub const CRLF: &str = "\r\n";

/// End-of-data marker written after the body.
pub const DATA_TERMINATOR: &str = "\r\n.\r\n";

/// Domain used in `Message-ID` when the sender address has none.
const DEFAULT_MESSAGE_ID_DOMAIN: &str = "localhost";

/// Builds the standard header block for a single-recipient HTML message.
///
/// Produces `From`, `To`, `Subject`, `Date` (RFC 2822), `Message-ID`,
/// `MIME-Version`, `Content-Type` and `Content-Transfer-Encoding`.
///
/// # Errors
///
/// Returns an error if an address is malformed or any value contains a
/// line break.
pub fn header_block(from_address: &str, from_name: &str, to: &str, subject: &str) -> Result<Headers> {
    let date = chrono::Local::now().to_rfc2822();
    standard_headers(
        from_address,
        from_name,
        to,
        subject,
        &date,
        message_id(from_address),
    )
}

/// Builds the standard header block as wire text.
///
/// Every header line is terminated with CRLF, so
/// `headers + CRLF + body` separates the header block from the body.
///
/// # Errors
///
/// See [`header_block`].
pub fn build_headers(from_address: &str, from_name: &str, to: &str, subject: &str) -> Result<String> {
    header_block(from_address, from_name, to, subject).map(|headers| headers.to_string())
}

fn standard_headers(
    from_address: &str,
    from_name: &str,
    to: &str,
    subject: &str,
    date: &str,
    message_id: String,
) -> Result<Headers> {
    validate_address(from_address)?;
    validate_address(to)?;

    let from = if from_name.is_empty() {
        format!("<{from_address}>")
    } else {
        format!("{} <{from_address}>", encode_display_name(from_name))
    };

    let mut headers = Headers::new();
    headers.add("From", from);
    headers.add("To", to);
    headers.add("Subject", encode_rfc2047(subject, "UTF-8"));
    headers.add("Date", date);
    headers.add("Message-ID", message_id);
    headers.add("MIME-Version", "1.0");
    headers.add("Content-Type", "text/html; charset=UTF-8");
    headers.add("Content-Transfer-Encoding", "8bit");

    headers.validate()?;
    Ok(headers)
}

/// Generates a globally unique `Message-ID` value.
///
/// The left side is 16 random bytes in hex, the right side is the domain
/// of `from_address`.
#[must_use]
pub fn message_id(from_address: &str) -> String {
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    let mut id = String::with_capacity(32);
    for byte in bytes {
        let _ = write!(id, "{byte:02x}");
    }

    let domain = from_address
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
        .unwrap_or(DEFAULT_MESSAGE_ID_DOMAIN);

    format!("<{id}@{domain}>")
}

/// Validates an address used in `From`, `To` and the SMTP envelope.
///
/// `ferrymail_smtp::Address` delegates here, so headers and envelope
/// accept exactly the same addresses.
///
/// # Errors
///
/// Returns an error if the address is empty, lacks a single `@` with
/// non-empty local and domain parts, or contains whitespace, angle
/// brackets or control characters.
pub fn validate_address(address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(Error::InvalidAddress("address cannot be empty".into()));
    }

    if address
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>')
    {
        return Err(Error::InvalidAddress(format!(
            "address contains invalid characters: {address:?}"
        )));
    }

    match address.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(Error::InvalidAddress(format!(
            "address must be local@domain: {address}"
        ))),
    }
}

/// Converts bare LF line endings to CRLF.
#[must_use]
pub fn normalize_line_endings(body: &str) -> String {
    if !body.contains('\n') {
        return body.to_string();
    }
    body.replace("\r\n", "\n").replace('\n', CRLF)
}

/// Applies SMTP transparency to a CRLF-delimited body.
///
/// Any line that is exactly `.` becomes `..`; all other lines are left
/// as they are. A line that merely starts with `.` (such as `.hidden` or
/// `..`) is sent unchanged, and a server applying RFC 5321 section 4.5.2
/// strips that leading dot on receipt.
#[must_use]
pub fn dot_stuff(body: &str) -> String {
    body.split(CRLF)
        .map(|line| if line == "." { ".." } else { line })
        .collect::<Vec<_>>()
        .join(CRLF)
}

/// Assembles the exact bytes written during the DATA phase.
///
/// `headers + CRLF + dot_stuff(body) + CRLF + "." + CRLF`
#[must_use]
pub fn assemble_payload(headers: &str, body: &str) -> String {
    let stuffed = dot_stuff(body);
    let mut payload = String::with_capacity(headers.len() + stuffed.len() + 7);
    payload.push_str(headers);
    payload.push_str(CRLF);
    payload.push_str(&stuffed);
    payload.push_str(DATA_TERMINATOR);
    payload
}

/// Checks a user-supplied header override.
pub(crate) fn validate_override(name: &str, value: &str) -> Result<()> {
    validate_header(name, value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DATE: &str = "Tue, 1 Jul 2025 10:52:37 +0200";

    #[test]
    fn test_standard_headers_order_and_values() {
        let headers = standard_headers(
            "noreply@example.com",
            "App",
            "user@example.org",
            "Welcome",
            DATE,
            "<abc@example.com>".to_string(),
        )
        .unwrap();

        assert_eq!(
            headers.to_string(),
            concat!(
                "From: App <noreply@example.com>\r\n",
                "To: user@example.org\r\n",
                "Subject: Welcome\r\n",
                "Date: Tue, 1 Jul 2025 10:52:37 +0200\r\n",
                "Message-ID: <abc@example.com>\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Type: text/html; charset=UTF-8\r\n",
                "Content-Transfer-Encoding: 8bit\r\n",
            )
        );
    }

    #[test]
    fn test_build_headers_has_rfc2822_date() {
        let text = build_headers("a@example.com", "A", "b@example.com", "Hi").unwrap();
        let date = text
            .lines()
            .find_map(|line| line.strip_prefix("Date: "))
            .unwrap();
        assert!(chrono::DateTime::parse_from_rfc2822(date).is_ok());
    }

    #[test]
    fn test_subject_injection_rejected() {
        let result = build_headers(
            "a@example.com",
            "A",
            "b@example.com",
            "Hi\r\nBcc: c@example.com",
        );
        assert!(matches!(result, Err(Error::InvalidHeader { .. })));
    }

    #[test]
    fn test_non_ascii_subject_encoded() {
        let headers = header_block("a@example.com", "", "b@example.com", "Grüße").unwrap();
        assert_eq!(headers.get("Subject"), Some("=?UTF-8?B?R3LDvMOfZQ==?="));
        assert_eq!(headers.get("From"), Some("<a@example.com>"));
    }

    #[test]
    fn test_message_id_uses_sender_domain() {
        let id = message_id("noreply@mail.example.com");
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@mail.example.com>"));
        assert_eq!(id.len(), 1 + 32 + 1 + "mail.example.com".len() + 1);
    }

    #[test]
    fn test_message_id_unique() {
        assert_ne!(message_id("a@example.com"), message_id("a@example.com"));
    }

    #[test]
    fn test_message_id_without_domain() {
        assert!(message_id("postmaster").ends_with("@localhost>"));
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address("user@example.com").is_ok());
        assert!(validate_address("").is_err());
        assert!(validate_address("userexample.com").is_err());
        assert!(validate_address("@example.com").is_err());
        assert!(validate_address("user@").is_err());
        assert!(validate_address("a@b@c").is_err());
        assert!(validate_address("user@example.com>\r\nRCPT TO:<x@y").is_err());
    }

    #[test]
    fn test_dot_stuff_bare_dot_line() {
        assert_eq!(dot_stuff("a\r\n.\r\nb"), "a\r\n..\r\nb");
    }

    #[test]
    fn test_dot_stuff_first_and_last_line() {
        assert_eq!(dot_stuff(".\r\nmiddle\r\n."), "..\r\nmiddle\r\n..");
    }

    #[test]
    fn test_dot_stuff_leaves_other_lines() {
        let body = "<p>.hidden</p>\r\n..\r\n. \r\nend.";
        assert_eq!(dot_stuff(body), body);
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(normalize_line_endings("single"), "single");
    }

    #[test]
    fn test_assemble_payload() {
        let payload = assemble_payload("Subject: x\r\n", "line\r\n.\r\nlast");
        assert_eq!(payload, "Subject: x\r\n\r\nline\r\n..\r\nlast\r\n.\r\n");
    }

    #[test]
    fn test_assemble_payload_empty_body() {
        let payload = assemble_payload("Subject: x\r\n", "");
        assert_eq!(payload, "Subject: x\r\n\r\n\r\n.\r\n");
        assert!(payload.ends_with(DATA_TERMINATOR));
    }

    proptest! {
        #[test]
        fn prop_dot_stuff_only_touches_bare_dot_lines(
            lines in proptest::collection::vec("[.a-z <>]{0,6}", 0..12)
        ) {
            let body = lines.join(CRLF);
            let stuffed = dot_stuff(&body);
            let out: Vec<&str> = stuffed.split(CRLF).collect();
            let input: Vec<&str> = body.split(CRLF).collect();
            prop_assert_eq!(out.len(), input.len());
            for (before, after) in input.iter().zip(out.iter()) {
                if *before == "." {
                    prop_assert_eq!(*after, "..");
                } else {
                    prop_assert_eq!(after, before);
                }
            }
        }

        #[test]
        fn prop_payload_always_terminated(body in "[\\PC\r\n]{0,64}") {
            let payload = assemble_payload("X-Test: 1\r\n", &body);
            prop_assert!(payload.ends_with(DATA_TERMINATOR));
        }
    }
}
