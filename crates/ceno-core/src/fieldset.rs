//! Line-oriented `key=value` field sets.
//!
//! This is the text format the bridge publishes its puzzle record in, the format
//! of the client's reply, and the header format of client-protocol messages:
//!
//! ```text
//! question=abc123
//! id=42
//! End
//! ```
//!
//! A line without `=` terminates the set. Serialization is ordered by key so
//! that identical sets always produce identical bytes.

use std::collections::BTreeMap;

use crate::constants::{DATA_MARKER, END_MARKER, END_MESSAGE_MARKER};
use crate::error::FieldSetError;

/// An ordered set of string fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    fields: BTreeMap<String, String>,
}

impl FieldSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a field set from text, ignoring the end marker.
    pub fn parse(content: &str) -> Result<Self, FieldSetError> {
        Self::parse_with_marker(content).map(|(set, _)| set)
    }

    /// Parse a field set from raw bytes, which must be UTF-8.
    pub fn parse_bytes(content: &[u8]) -> Result<Self, FieldSetError> {
        let text = std::str::from_utf8(content).map_err(|_| FieldSetError::NotUtf8)?;
        Self::parse(text)
    }

    /// Parse a field set and return the end marker that terminated it, if any.
    ///
    /// Everything after the end marker is ignored.
    pub fn parse_with_marker(content: &str) -> Result<(Self, Option<String>), FieldSetError> {
        let mut set = Self::new();
        for (index, raw) in content.split('\n').enumerate() {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.is_empty() {
                continue;
            }
            let line_no = index + 1;
            match line.split_once('=') {
                Some((key, value)) => {
                    if key.is_empty() {
                        return Err(FieldSetError::EmptyKey { line: line_no });
                    }
                    if set.fields.contains_key(key) {
                        return Err(FieldSetError::DuplicateKey(key.to_string()));
                    }
                    set.fields.insert(key.to_string(), value.to_string());
                }
                None if is_end_marker(line) => return Ok((set, Some(line.to_string()))),
                None => {
                    return Err(FieldSetError::UnexpectedLine {
                        line: line_no,
                        content: line.to_string(),
                    });
                }
            }
        }
        Ok((set, None))
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Read an `i32` field. `Ok(None)` if absent.
    pub fn get_i32(&self, key: &str) -> Result<Option<i32>, FieldSetError> {
        self.get_parsed(key, "i32")
    }

    /// Read an `i64` field. `Ok(None)` if absent.
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, FieldSetError> {
        self.get_parsed(key, "i64")
    }

    /// Read a boolean field (`true`/`false`, case-insensitive). `Ok(None)` if absent.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, FieldSetError> {
        let Some(value) = self.get_str(key) else {
            return Ok(None);
        };
        if value.eq_ignore_ascii_case("true") {
            Ok(Some(true))
        } else if value.eq_ignore_ascii_case("false") {
            Ok(Some(false))
        } else {
            Err(invalid_type(key, "bool", value))
        }
    }

    fn get_parsed<T: std::str::FromStr>(
        &self,
        key: &str,
        expected: &'static str,
    ) -> Result<Option<T>, FieldSetError> {
        let Some(value) = self.get_str(key) else {
            return Ok(None);
        };
        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid_type(key, expected, value))
    }

    /// Set a field, replacing any previous value.
    pub fn put_overwrite(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), FieldSetError> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() || key.contains(['=', '\n', '\r']) {
            return Err(FieldSetError::InvalidKey(key));
        }
        if value.contains(['\n', '\r']) {
            return Err(FieldSetError::InvalidValue(key));
        }
        self.fields.insert(key, value);
        Ok(())
    }

    pub fn put_i32(&mut self, key: impl Into<String>, value: i32) -> Result<(), FieldSetError> {
        self.put_overwrite(key, value.to_string())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Append the `key=value` lines, sorted by key, without an end marker.
    pub fn write_fields(&self, out: &mut String) {
        for (key, value) in &self.fields {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
    }

    /// Serialize sorted by key and terminated by `End`.
    #[must_use]
    pub fn to_ordered_string(&self) -> String {
        let mut out = String::new();
        self.write_fields(&mut out);
        out.push_str(END_MARKER);
        out.push('\n');
        out
    }
}

fn is_end_marker(line: &str) -> bool {
    matches!(line, END_MARKER | END_MESSAGE_MARKER | DATA_MARKER)
}

fn invalid_type(key: &str, expected: &'static str, value: &str) -> FieldSetError {
    FieldSetError::InvalidType {
        key: key.to_string(),
        expected,
        value: value.to_string(),
    }
}
