//! # Envelope Codec
//!
//! Converts between the status store's typed-attribute wire form and the in-memory
//! domain shape ([`Document`], [`Item`]).
//!
//! The wire form wraps every value in a single-key object naming its type:
//! strings as `{"S": "..."}`, numbers as string-wrapped `{"N": "..."}`, nested
//! objects as `{"M": {...}}`.

use crate::RecordStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Wire Types
// ============================================================================

/// A single typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),

    /// Numbers are carried as strings to avoid precision loss in transit
    #[serde(rename = "N")]
    N(String),

    #[serde(rename = "BOOL")]
    Bool(bool),

    #[serde(rename = "NULL")]
    Null(bool),

    #[serde(rename = "M")]
    M(BTreeMap<String, AttributeValue>),

    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Name of the wire type tag, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::M(_) => "M",
            Self::L(_) => "L",
        }
    }

    /// Wrap an integer as a string-wrapped number
    pub fn number(value: i64) -> Self {
        Self::N(value.to_string())
    }

    /// Borrow the string if this is an `S` value
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(value) => Some(value),
            _ => None,
        }
    }
}

/// Wire representation of one tracked record
///
/// A typed attribute map keyed by attribute name. Unknown attributes are
/// preserved untouched and ignored by [`decode`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredRecord(BTreeMap<String, AttributeValue>);

impl StoredRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Create a record holding only a key and a status
    ///
    /// This is what an upserting status update leaves behind for a key that
    /// did not exist before.
    pub fn status_only(id: &str, status: RecordStatus) -> Self {
        let mut record = Self::new();
        record.insert("id", AttributeValue::S(id.to_string()));
        record.set_status(status);
        record
    }

    /// Parse a record from an untyped JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, CodecError> {
        serde_json::from_value(value).map_err(|e| CodecError::Malformed {
            message: e.to_string(),
        })
    }

    /// Get an attribute by name
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    /// Insert or replace an attribute
    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.0.insert(name.into(), value);
    }

    /// Replace the status attribute
    pub fn set_status(&mut self, status: RecordStatus) {
        self.insert("status", AttributeValue::S(status.as_str().to_string()));
    }

    /// Get the record key, if present as a string attribute
    pub fn id(&self) -> Option<&str> {
        self.get("id").and_then(AttributeValue::as_s)
    }

    /// Get the status attribute, if present and recognised
    pub fn status(&self) -> Option<RecordStatus> {
        self.get("status")
            .and_then(AttributeValue::as_s)
            .and_then(|s| s.parse().ok())
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the record has no attributes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, AttributeValue>> for StoredRecord {
    fn from(attributes: BTreeMap<String, AttributeValue>) -> Self {
        Self(attributes)
    }
}

// ============================================================================
// Domain Types
// ============================================================================

/// Decoded form of a [`StoredRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Record key, assigned at creation time
    pub id: String,
    pub status: RecordStatus,
    /// Creation time in epoch seconds
    pub timestamp: i64,
    pub payload: Item,
}

/// The unit actually mutated downstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub body: String,
    /// Epoch seconds
    pub timestamp: i64,
}

// ============================================================================
// Error Types
// ============================================================================

/// Reasons a typed-attribute record could not be read
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("Missing attribute '{name}'")]
    MissingAttribute { name: String },

    #[error("Attribute '{name}' has type {actual}, expected {expected}")]
    UnexpectedType {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Attribute '{name}' is not an integer: '{value}'")]
    InvalidNumber { name: String, value: String },

    #[error("Unrecognised status '{value}'")]
    InvalidStatus { value: String },

    #[error("Malformed attribute map: {message}")]
    Malformed { message: String },
}

// ============================================================================
// Decode / Encode
// ============================================================================

/// Decode a stored record into a [`Document`]
///
/// Returns `None` when any mandatory attribute is missing or has the wrong type.
/// Callers treat `None` as a parse failure; use [`try_decode`] to learn why.
pub fn decode(record: &StoredRecord) -> Option<Document> {
    try_decode(record).ok()
}

/// Decode a stored record, reporting the first structural problem found
pub fn try_decode(record: &StoredRecord) -> Result<Document, CodecError> {
    let attributes = &record.0;

    let status_value = read_string(attributes, "status")?;
    let status = status_value
        .parse::<RecordStatus>()
        .map_err(|_| CodecError::InvalidStatus {
            value: status_value.to_string(),
        })?;

    let payload = match required(attributes, "payload")? {
        AttributeValue::M(inner) => decode_item(inner)?,
        other => {
            return Err(CodecError::UnexpectedType {
                name: "payload".to_string(),
                expected: "M",
                actual: other.type_name(),
            })
        }
    };

    Ok(Document {
        id: read_string(attributes, "id")?.to_string(),
        status,
        timestamp: read_number(attributes, "timestamp")?,
        payload,
    })
}

/// Encode a [`Document`] into its typed-attribute wire form
pub fn encode(document: &Document) -> StoredRecord {
    let mut record = StoredRecord::new();
    record.insert("id", AttributeValue::S(document.id.clone()));
    record.set_status(document.status);
    record.insert("timestamp", AttributeValue::number(document.timestamp));
    record.insert("payload", AttributeValue::M(encode_item(&document.payload)));
    record
}

fn decode_item(attributes: &BTreeMap<String, AttributeValue>) -> Result<Item, CodecError> {
    Ok(Item {
        id: read_string(attributes, "id")?.to_string(),
        name: read_string(attributes, "name")?.to_string(),
        body: read_string(attributes, "body")?.to_string(),
        timestamp: read_number(attributes, "timestamp")?,
    })
}

fn encode_item(item: &Item) -> BTreeMap<String, AttributeValue> {
    let mut attributes = BTreeMap::new();
    attributes.insert("id".to_string(), AttributeValue::S(item.id.clone()));
    attributes.insert("name".to_string(), AttributeValue::S(item.name.clone()));
    attributes.insert("body".to_string(), AttributeValue::S(item.body.clone()));
    attributes.insert(
        "timestamp".to_string(),
        AttributeValue::number(item.timestamp),
    );
    attributes
}

fn required<'a>(
    attributes: &'a BTreeMap<String, AttributeValue>,
    name: &str,
) -> Result<&'a AttributeValue, CodecError> {
    attributes
        .get(name)
        .ok_or_else(|| CodecError::MissingAttribute {
            name: name.to_string(),
        })
}

fn read_string<'a>(
    attributes: &'a BTreeMap<String, AttributeValue>,
    name: &str,
) -> Result<&'a str, CodecError> {
    match required(attributes, name)? {
        AttributeValue::S(value) => Ok(value),
        other => Err(CodecError::UnexpectedType {
            name: name.to_string(),
            expected: "S",
            actual: other.type_name(),
        }),
    }
}

fn read_number(
    attributes: &BTreeMap<String, AttributeValue>,
    name: &str,
) -> Result<i64, CodecError> {
    match required(attributes, name)? {
        AttributeValue::N(value) => {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| CodecError::InvalidNumber {
                    name: name.to_string(),
                    value: value.clone(),
                })
        }
        other => Err(CodecError::UnexpectedType {
            name: name.to_string(),
            expected: "N",
            actual: other.type_name(),
        }),
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
