//! JSON text as stored in object metadata and cell scripts
//!
//! Items are separated by `", "`, keys by `": "`, and non-ASCII characters
//! are written as `\uXXXX` escapes (UTF-16 surrogate pairs above the BMP).
//! Object keys keep their insertion order.

use serde::ser::Error as _;
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use std::io;

#[derive(Debug, Clone, Copy, Default)]
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..index])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// Serialize `value` in the spaced, ASCII-only layout
///
/// # Errors
/// Whatever `value`'s `Serialize` impl reports
pub fn to_spaced_string<T: ?Sized + Serialize>(value: &T) -> serde_json::Result<String> {
    let mut out = Vec::new();
    value.serialize(&mut Serializer::with_formatter(&mut out, SpacedFormatter))?;
    String::from_utf8(out).map_err(serde_json::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn separators_are_spaced() {
        let text = to_spaced_string(&json!({"methods": [], "apps": [1, 2], "job_usage": {"queue_time": 0}})).unwrap();
        assert_eq!(text, r#"{"methods": [], "apps": [1, 2], "job_usage": {"queue_time": 0}}"#);
    }

    #[test]
    fn keys_keep_insertion_order() {
        let text = to_spaced_string(&json!({"zeta": 1, "alpha": {"y": null, "b": true}})).unwrap();
        assert_eq!(text, r#"{"zeta": 1, "alpha": {"y": null, "b": true}}"#);
    }

    #[test]
    fn non_ascii_is_escaped() {
        assert_eq!(to_spaced_string("café").unwrap(), r#""caf\u00e9""#);
        assert_eq!(to_spaced_string("a😀b").unwrap(), r#""a\ud83d\ude00b""#);
        assert_eq!(to_spaced_string("say \"hi\"\n").unwrap(), r#""say \"hi\"\n""#);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(to_spaced_string(&json!({"a": {}, "b": []})).unwrap(), r#"{"a": {}, "b": []}"#);
    }
}
