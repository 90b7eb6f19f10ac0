//! On-disk format of a config file.
//!
//! Encoding:
//! ```text
//! pretty:   {\n  "some": "thing"\n}\n
//! compact:  {"some":"thing"}\n
//! ```
//! Pretty output uses two-space indentation.  Both forms end with exactly one
//! newline.
//!
//! Decoding accepts an optional UTF-8 byte-order mark and, when enabled,
//! `//` line comments and `/* */` block comments outside string literals.
//! Comments are blanked out rather than removed, so line and column numbers
//! in parse errors still point at the original text.  The top-level value
//! must be an object.

use serde_json::Value;
use thiserror::Error;

use crate::domain::document::Document;
use crate::domain::resolver::ValueKind;

const BOM: &str = "\u{feff}";

/// Errors produced while decoding file contents.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not valid UTF-8.
    #[error("content is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The text is not valid JSON.
    #[error("{0}")]
    Syntax(#[from] serde_json::Error),

    /// The text is valid JSON but not an object.
    #[error("top-level value is {0}, expected an object")]
    NotAnObject(ValueKind),
}

/// Decodes raw file bytes into a [`Document`].
///
/// # Errors
///
/// Returns [`DecodeError`] for non-UTF-8 content, malformed JSON, or a
/// top-level value that is not an object.
pub fn decode(bytes: &[u8], allow_comments: bool) -> Result<Document, DecodeError> {
    let text = std::str::from_utf8(bytes)?;
    let text = text.strip_prefix(BOM).unwrap_or(text);

    let value: Value = if allow_comments {
        serde_json::from_str(&strip_comments(text))?
    } else {
        serde_json::from_str(text)?
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::NotAnObject(ValueKind::of(Some(&other)))),
    }
}

/// Encodes a [`Document`] in the on-disk format.
///
/// # Errors
///
/// Only fails if `serde_json` cannot serialise the value, which does not
/// happen for documents built from parsed JSON.
pub fn encode(document: &Document, pretty: bool) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = if pretty {
        serde_json::to_vec_pretty(document)?
    } else {
        serde_json::to_vec(document)?
    };
    out.push(b'\n');
    Ok(out)
}

/// Replaces `//` and `/* */` comments outside of strings with whitespace.
///
/// Newlines inside block comments are kept.  An unterminated block comment
/// runs to the end of the input.
pub fn strip_comments(text: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        Str,
        StrEscape,
        Line,
        Block,
    }

    let mut out = String::with_capacity(text.len());
    let mut state = State::Code;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '"' => {
                    state = State::Str;
                    out.push(c);
                }
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = State::Line;
                    out.push_str("  ");
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::Block;
                    out.push_str("  ");
                }
                _ => out.push(c),
            },
            State::Str => {
                match c {
                    '\\' => state = State::StrEscape,
                    '"' => state = State::Code,
                    _ => {}
                }
                out.push(c);
            }
            State::StrEscape => {
                state = State::Str;
                out.push(c);
            }
            State::Line => {
                if c == '\n' {
                    state = State::Code;
                    out.push(c);
                } else {
                    out.push(' ');
                }
            }
            State::Block => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                    out.push_str("  ");
                } else if c == '\n' || c == '\r' {
                    out.push(c);
                } else {
                    out.push(' ');
                }
            }
        }
    }

    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().expect("object fixture")
    }

    // ── encode ────────────────────────────────────────────────────────────────

    #[test]
    fn test_encode_pretty_uses_two_space_indent_and_newline() {
        let bytes = encode(&doc(json!({ "some": "thing" })), true).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "{\n  \"some\": \"thing\"\n}\n");
    }

    #[test]
    fn test_encode_compact_has_no_whitespace() {
        let bytes = encode(&doc(json!({ "some": "thing" })), false).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "{\"some\":\"thing\"}\n");
    }

    #[test]
    fn test_encode_empty_document() {
        assert_eq!(encode(&Document::new(), true).unwrap(), b"{}\n");
        assert_eq!(encode(&Document::new(), false).unwrap(), b"{}\n");
    }

    #[test]
    fn test_encode_preserves_insertion_order() {
        let mut document = Document::new();
        document.insert("zeta".into(), json!(1));
        document.insert("alpha".into(), json!(2));
        let text = String::from_utf8(encode(&document, false).unwrap()).unwrap();
        assert_eq!(text, "{\"zeta\":1,\"alpha\":2}\n");
    }

    // ── decode ────────────────────────────────────────────────────────────────

    #[test]
    fn test_decode_plain_object() {
        let document = decode(br#"{"a": [1, 2]}"#, false).unwrap();
        assert_eq!(Value::Object(document), json!({ "a": [1, 2] }));
    }

    #[test]
    fn test_decode_strips_byte_order_mark() {
        let mut bytes = "\u{feff}".as_bytes().to_vec();
        bytes.extend_from_slice(b"{\"a\":1}\n");
        let document = decode(&bytes, false).unwrap();
        assert_eq!(document["a"], json!(1));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = decode(b"[1, 2]", false).unwrap_err();
        assert!(matches!(err, DecodeError::NotAnObject(ValueKind::Array)));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let err = decode(b"{\"a\": }", false).unwrap_err();
        assert!(matches!(err, DecodeError::Syntax(_)));
    }

    #[test]
    fn test_decode_rejects_empty_file() {
        assert!(matches!(decode(b"", false), Err(DecodeError::Syntax(_))));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert!(matches!(decode(&[0xff, 0xfe, 0x7b], false), Err(DecodeError::Utf8(_))));
    }

    #[test]
    fn test_decode_comments_only_when_allowed() {
        let text = b"{\n  // port\n  \"port\": 80 /* http */\n}\n";
        assert!(decode(text, false).is_err());
        let document = decode(text, true).unwrap();
        assert_eq!(document["port"], json!(80));
    }

    // ── strip_comments ────────────────────────────────────────────────────────

    #[test]
    fn test_strip_comments_keeps_comment_markers_inside_strings() {
        let text = r#"{"url": "http://example.com/*x*/", "q": "a\"//b"}"#;
        assert_eq!(strip_comments(text), text);
    }

    #[test]
    fn test_strip_comments_preserves_line_structure() {
        let text = "{ /* a\nb */ \"k\": 1 } // tail";
        let stripped = strip_comments(text);
        assert_eq!(stripped.len(), text.len());
        assert_eq!(stripped.lines().count(), 2);
        let value: Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value, json!({ "k": 1 }));
    }

    #[test]
    fn test_strip_comments_unterminated_block_runs_to_end() {
        assert_eq!(strip_comments("{} /* open"), format!("{{}}{}", " ".repeat(8)));
    }
}
