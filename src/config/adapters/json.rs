//! JSON configuration files.
//!
//! Backslashes do not need to be doubled in these files: a value written as
//! `"some\class\name"` reads back exactly as written. A pair already written
//! as `\\` stays one backslash. `\"` escapes a quote only when another quote
//! follows on the same line; otherwise it is a trailing backslash, so both
//! `"C:\temp\"` and `"C:\\temp\\"` read as `C:\temp\`.

use super::{AdapterError, FormatAdapter, has_extension, read_text, require_container};
use serde_json::Value;
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

/// Adapter for `*.json` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAdapter;

impl JsonAdapter {
    /// Decode JSON text into a container value.
    pub fn decode(&self, content: &str) -> Result<Value, AdapterError> {
        let escaped = escape_backslashes(content);
        let value: Value = serde_json::from_str(&escaped)
            .map_err(|e| AdapterError::DecodeFailed(e.to_string()))?;
        require_container(value)
    }
}

impl FormatAdapter for JsonAdapter {
    fn format_name(&self) -> &'static str {
        "json"
    }

    fn is_supported(&self, filename: &str) -> bool {
        has_extension(filename, "json")
    }

    fn read(&self, path: &Path) -> Result<Value, AdapterError> {
        let content = read_text(path)?;
        debug!(path = %path.display(), bytes = content.len(), "decoding json config");
        self.decode(&content)
    }
}

/// Double bare backslashes so the text parses as JSON.
fn escape_backslashes(content: &str) -> Cow<'_, str> {
    if !content.contains('\\') {
        return Cow::Borrowed(content);
    }

    let bytes = content.as_bytes();
    let mut out = String::with_capacity(content.len() + 16);
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        out.push_str(&content[start..i]);
        match bytes.get(i + 1) {
            Some(b'\\') => {
                out.push_str("\\\\");
                i += 2;
            }
            Some(b'"') if quote_follows(&bytes[i + 2..]) => {
                out.push_str("\\\"");
                i += 2;
            }
            _ => {
                out.push_str("\\\\");
                i += 1;
            }
        }
        start = i;
    }
    out.push_str(&content[start..]);
    Cow::Owned(out)
}

/// Whether another `"` appears before the end of the line.
fn quote_follows(rest: &[u8]) -> bool {
    rest.iter()
        .take_while(|&&b| b != b'\n')
        .any(|&b| b == b'"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_is_supported() {
        let adapter = JsonAdapter;
        assert!(adapter.is_supported("properties.json"));
        assert!(adapter.is_supported("Properties.JSON"));
        assert!(adapter.is_supported("connections.development.json"));
        assert!(!adapter.is_supported("properties.yaml"));
        assert!(!adapter.is_supported("properties.json~"));
    }

    #[test]
    fn test_decode_object() {
        let value = JsonAdapter.decode(r#"{"service": "unknown"}"#).unwrap();
        assert_eq!(value, json!({"service": "unknown"}));
    }

    #[test]
    fn test_empty_containers_are_valid() {
        assert_eq!(JsonAdapter.decode("{}").unwrap(), json!({}));
        assert_eq!(JsonAdapter.decode("[]").unwrap(), json!([]));
    }

    #[test]
    fn test_scalars_are_not_containers() {
        for content in [r#""just a string""#, "true", "false", "42", "null"] {
            let err = JsonAdapter.decode(content).unwrap_err();
            assert!(
                matches!(err, AdapterError::NotAContainer),
                "{content} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_decode_failures() {
        for content in ["", "{", "{\"a\": }", "not json"] {
            let err = JsonAdapter.decode(content).unwrap_err();
            assert!(
                matches!(err, AdapterError::DecodeFailed(_)),
                "{content:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_bare_backslashes() {
        let value = JsonAdapter
            .decode(r#"{"class": "app\models\User", "quote": "say \"hi\""}"#)
            .unwrap();
        assert_eq!(value["class"], json!("app\\models\\User"));
        assert_eq!(value["quote"], json!("say \"hi\""));
    }

    #[test]
    fn test_trailing_backslash() {
        let bare = JsonAdapter.decode(r#"{"dir": "C:\temp\"}"#).unwrap();
        assert_eq!(bare["dir"], json!(r"C:\temp\"));

        let doubled = JsonAdapter.decode(r#"{"dir": "C:\\temp\\"}"#).unwrap();
        assert_eq!(doubled["dir"], json!(r"C:\temp\"));

        let multiline = JsonAdapter
            .decode("{\n  \"dir\": \"C:\\temp\\\",\n  \"name\": \"x\"\n}")
            .unwrap();
        assert_eq!(multiline, json!({"dir": r"C:\temp\", "name": "x"}));
    }

    #[test]
    fn test_escaped_backslash_before_escaped_quote() {
        let value = JsonAdapter.decode(r#"{"a": "x\\\"y\""}"#).unwrap();
        assert_eq!(value["a"], json!(r#"x\"y""#));
    }

    #[test]
    fn test_invalid_utf8_is_decode_failure() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("binary.json");
        std::fs::write(&path, b"{\"a\": \"\xff\xfe\"}").unwrap();
        let err = JsonAdapter.read(&path).unwrap_err();
        assert!(matches!(err, AdapterError::DecodeFailed(_)), "{err:?}");
    }

    #[test]
    fn test_control_sequences_stay_textual() {
        let value = JsonAdapter.decode(r#"{"text": "two\nlines"}"#).unwrap();
        assert_eq!(value["text"], json!("two\\nlines"));
    }

    #[test]
    fn test_read_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = JsonAdapter
            .read(&temp.path().join("missing.json"))
            .unwrap_err();
        assert!(matches!(err, AdapterError::ReadFailed(_)));
    }

    #[test]
    fn test_read_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("properties.json");
        std::fs::write(&path, r#"{"dir": "test", "list": [1, 2]}"#).unwrap();
        assert_eq!(
            JsonAdapter.read(&path).unwrap(),
            json!({"dir": "test", "list": [1, 2]})
        );
    }
}
