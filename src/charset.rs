//! Latin-1 encoding for text sent over the link
//!
//! The Minitel consumes single-byte characters. Text coming from files or
//! from the chat collaborator is normalized before transmission:
//!
//! - `Plain`: every code point above U+00FF becomes `?`
//! - `Sanitized`: text is composed (NFC) and typographic punctuation is
//!   folded to ASCII. Characters still outside Latin-1 get their NFKC
//!   compatibility form, so ligatures and full-width forms survive. Control
//!   characters other than CR, LF and TAB become `?` as well

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Placeholder byte for characters the link cannot carry
pub const PLACEHOLDER: u8 = b'?';

/// How text is normalized before encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextMode {
    /// Encode as-is, replacing only non-Latin-1 code points
    Plain,
    /// Fold typography and scrub stray control characters
    #[default]
    Sanitized,
}

/// ASCII replacement for common typographic characters
fn fold(c: char) -> Option<&'static str> {
    let folded = match c {
        '\u{2018}' | '\u{2019}' => "'",
        '\u{201C}' | '\u{201D}' => "\"",
        '\u{2013}' | '\u{2014}' => "-",
        '\u{2026}' => "...",
        '\u{2022}' => "*",
        '\u{00A0}' | '\u{2009}' | '\u{202F}' => " ",
        _ => return None,
    };
    Some(folded)
}

fn push_latin1(out: &mut Vec<u8>, c: char, scrub_controls: bool) {
    let code = c as u32;
    let keep_control = matches!(c, '\r' | '\n' | '\t');
    if code > 0xFF || (scrub_controls && code < 0x20 && !keep_control) {
        out.push(PLACEHOLDER);
    } else {
        out.push(code as u8);
    }
}

fn push_sanitized(out: &mut Vec<u8>, c: char) {
    match fold(c) {
        Some(ascii) => out.extend_from_slice(ascii.as_bytes()),
        None => push_latin1(out, c, true),
    }
}

/// Encode text into Latin-1 bytes according to `mode`
pub fn encode(text: &str, mode: TextMode) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    match mode {
        TextMode::Plain => {
            for c in text.chars() {
                push_latin1(&mut out, c, false);
            }
        },
        TextMode::Sanitized => {
            for c in text.nfc() {
                if fold(c).is_some() || u32::from(c) <= 0xFF {
                    push_sanitized(&mut out, c);
                } else {
                    for k in std::iter::once(c).nfkc() {
                        push_sanitized(&mut out, k);
                    }
                }
            }
        },
    }
    out
}

/// Decode Latin-1 bytes; every byte maps to the code point of equal value
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Apply the `Sanitized` folding without encoding
pub fn sanitize(text: &str) -> String {
    decode(&encode(text, TextMode::Sanitized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_keeps_latin1() {
        assert_eq!(encode("Café", TextMode::Plain), b"Caf\xe9".to_vec());
    }

    #[test]
    fn test_plain_replaces_wide_chars() {
        assert_eq!(encode("a\u{2014}b", TextMode::Plain), b"a?b".to_vec());
        assert_eq!(encode("\u{1F600}", TextMode::Plain), b"?".to_vec());
    }

    #[test]
    fn test_sanitized_folds_typography() {
        let text = "\u{201C}Hi\u{201D} \u{2018}x\u{2019} a\u{2013}b\u{2014}c\u{2026}\u{00A0}\u{2022}";
        assert_eq!(encode(text, TextMode::Sanitized), b"\"Hi\" 'x' a-b-c... *".to_vec());
    }

    #[test]
    fn test_sanitized_scrubs_controls() {
        assert_eq!(
            encode("a\x07b\r\n\tc\x1b", TextMode::Sanitized),
            b"a?b\r\n\tc?".to_vec()
        );
    }

    #[test]
    fn test_sanitized_compatibility_forms() {
        assert_eq!(encode("\u{FB01}le", TextMode::Sanitized), b"file".to_vec());
        assert_eq!(encode("\u{FF21}\u{FF11}", TextMode::Sanitized), b"A1".to_vec());
        assert_eq!(encode("\u{2122}", TextMode::Sanitized), b"TM".to_vec());
        assert_eq!(encode("\u{65E5}", TextMode::Sanitized), b"?".to_vec());
    }

    #[test]
    fn test_sanitized_composes_and_keeps_latin1() {
        assert_eq!(encode("e\u{0301}t\u{00E9}", TextMode::Sanitized), b"\xe9t\xe9".to_vec());
        assert_eq!(encode("\u{00BD} \u{00B5}", TextMode::Sanitized), b"\xbd \xb5".to_vec());
    }

    #[test]
    fn test_plain_keeps_controls() {
        assert_eq!(encode("\x1b[K", TextMode::Plain), b"\x1b[K".to_vec());
    }

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode(b"Caf\xe9"), "Café");
    }

    #[test]
    fn test_sanitize_string() {
        assert_eq!(sanitize("l\u{2019}\u{00E9}t\u{00E9}"), "l'été");
    }
}
