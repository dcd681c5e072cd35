//! Header encoding utilities.
//!
//! Supports RFC 2047 `B` encoded-words for non-ASCII header text.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Longest encoded-word allowed by RFC 2047 section 2.
const MAX_ENCODED_WORD_LEN: usize = 75;

/// Encodes header text as RFC 2047 encoded-words when needed.
///
/// Plain ASCII text is returned unchanged. Anything containing non-ASCII
/// characters, or the `=?` sequence that would be mistaken for an
/// encoded-word, is wrapped as `=?<charset>?B?<base64>?=`. Text too long
/// for one 75-character word is split on character boundaries into
/// several words separated by a space, which decoders drop.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if text.is_ascii() && !text.contains("=?") {
        return text.to_string();
    }

    let overhead = "=??B??=".len() + charset.len();
    let max_bytes = (MAX_ENCODED_WORD_LEN.saturating_sub(overhead) / 4 * 3).max(4);

    let mut words = Vec::new();
    let mut start = 0;
    for (index, c) in text.char_indices() {
        if index + c.len_utf8() - start > max_bytes && index > start {
            words.push(encoded_word(&text[start..index], charset));
            start = index;
        }
    }
    words.push(encoded_word(&text[start..], charset));

    words.join(" ")
}

fn encoded_word(chunk: &str, charset: &str) -> String {
    format!("=?{charset}?B?{}?=", STANDARD.encode(chunk.as_bytes()))
}

/// Formats a display name for use in an address header.
///
/// Non-ASCII names are RFC 2047 encoded, names containing RFC 5322
/// specials are quoted.
#[must_use]
pub fn encode_display_name(name: &str) -> String {
    const SPECIALS: &[char] = &[
        '(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"',
    ];

    if !name.is_ascii() {
        return encode_rfc2047(name, "UTF-8");
    }

    if name.contains(SPECIALS) {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        return format!("\"{escaped}\"");
    }

    name.to_string()
}
