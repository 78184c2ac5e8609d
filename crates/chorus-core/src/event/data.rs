//! Scalar field values for event payloads.
//!
//! Every event kind's additional data is a flat mapping of named fields to
//! scalars. The per-kind schema table fixes which fields exist and their
//! scalar types; this module defines the value and type enums plus the
//! string encoding used by the `event_data` store table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The scalar type of a data field, as declared by a kind schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Int,
    Bool,
}

impl FieldType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Int => "int",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar data field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl FieldValue {
    /// The scalar type of this value.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Text(_) => FieldType::Text,
            Self::Int(_) => FieldType::Int,
            Self::Bool(_) => FieldType::Bool,
        }
    }

    /// The text payload, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Encode for the `event_data.value` column.
    ///
    /// Bools encode as `0`/`1` so decoding never depends on locale or
    /// serde configuration.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Int(n) => n.to_string(),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        }
    }

    /// Decode a stored `(value_type, value)` column pair.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeFieldError`] if the stored text does not parse as
    /// the declared scalar type.
    pub fn decode(field_type: FieldType, raw: &str) -> Result<Self, DecodeFieldError> {
        match field_type {
            FieldType::Text => Ok(Self::Text(raw.to_string())),
            FieldType::Int => raw
                .parse::<i64>()
                .map(Self::Int)
                .map_err(|_| DecodeFieldError {
                    field_type,
                    raw: raw.to_string(),
                }),
            FieldType::Bool => match raw {
                "0" => Ok(Self::Bool(false)),
                "1" => Ok(Self::Bool(true)),
                _ => Err(DecodeFieldError {
                    field_type,
                    raw: raw.to_string(),
                }),
            },
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Error returned when a stored field value fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored value '{raw}' does not decode as {field_type}")]
pub struct DecodeFieldError {
    pub field_type: FieldType,
    pub raw: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let cases = [
            FieldValue::Text("no rows after midnight".into()),
            FieldValue::Int(-41),
            FieldValue::Bool(true),
            FieldValue::Bool(false),
        ];
        for value in cases {
            let decoded =
                FieldValue::decode(value.field_type(), &value.encode()).expect("roundtrip");
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn decode_rejects_bad_int() {
        let err = FieldValue::decode(FieldType::Int, "not-a-number").unwrap_err();
        assert_eq!(err.field_type, FieldType::Int);
    }

    #[test]
    fn decode_rejects_bad_bool() {
        assert!(FieldValue::decode(FieldType::Bool, "true").is_err());
        assert!(FieldValue::decode(FieldType::Bool, "2").is_err());
    }

    #[test]
    fn as_text_only_for_text() {
        assert_eq!(FieldValue::Text("hi".into()).as_text(), Some("hi"));
        assert_eq!(FieldValue::Int(3).as_text(), None);
    }
}
