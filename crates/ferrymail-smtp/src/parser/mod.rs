//! SMTP response parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from raw response lines.
///
/// Lines are passed as read from the wire, terminators included.
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// The code is taken from the final line; the raw text keeps every line.
///
/// # Errors
///
/// Returns an error if the reply is empty, a line is shorter than four
/// characters, or the final line does not start with three digits.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(last) = lines.last() else {
        return Err(Error::Protocol("Empty reply".into()));
    };

    let mut message = Vec::with_capacity(lines.len());
    for line in lines {
        if line.len() < 4 {
            return Err(Error::Protocol(format!(
                "Reply line too short: {:?}",
                line.trim_end()
            )));
        }
        message.push(line.get(4..).unwrap_or_default().trim_end().to_string());
    }

    let code = parse_code(last)?;
    Ok(Reply::new(code, message, lines.concat()))
}

/// Parses the three-digit code at the start of a reply line.
///
/// # Errors
///
/// Returns an error if the first three characters are not all digits.
pub fn parse_code(line: &str) -> Result<ReplyCode> {
    let digits = line
        .get(0..3)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| {
            Error::Protocol(format!("Invalid reply code: {:?}", line.trim_end()))
        })?;

    digits
        .parse::<u16>()
        .map(ReplyCode::new)
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {digits}")))
}

/// Checks if a raw line is the last line of a multi-line reply.
///
/// Continuation lines carry `-` as their fourth character; any other
/// fourth character ends the reply.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.as_bytes().get(3).is_some_and(|&b| b != b'-')
}
