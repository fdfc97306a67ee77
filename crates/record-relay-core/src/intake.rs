//! # Record Intake
//!
//! Creation of PENDING records from inbound requests. A change stream on the
//! status table turns each created record into the INSERT notification the
//! delivery pipeline consumes.

use crate::codec::{encode, Document, Item};
use crate::status_store::{StatusStore, StatusStoreError};
use crate::{RecordStatus, Timestamp, ValidationError};
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// A validated request to create a record
///
/// All fields travel as strings on the wire; `timestamp` has been checked to be
/// integral epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeRequest {
    pub id: String,
    pub name: String,
    pub body: String,
    #[serde(serialize_with = "serialize_as_string")]
    pub timestamp: i64,
}

impl IntakeRequest {
    fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            id: required_string(value, "id")?,
            name: required_string(value, "name")?,
            body: required_string(value, "body")?,
            timestamp: required_timestamp(value)?,
        })
    }
}

/// Validate an inbound request body
///
/// # Returns
///
/// `Ok(None)` when the body is absent or empty, or when any field is missing,
/// empty, or the timestamp is not an integer.
///
/// # Errors
///
/// Returns [`ValidationError::MalformedJson`] if the body is not valid JSON.
pub fn validate_request_body(body: Option<&str>) -> Result<Option<IntakeRequest>, ValidationError> {
    let body = match body {
        Some(body) if !body.is_empty() => body,
        _ => return Ok(None),
    };

    let value: Value = serde_json::from_str(body).map_err(|e| ValidationError::MalformedJson {
        message: e.to_string(),
    })?;

    Ok(IntakeRequest::from_value(&value))
}

/// Build the PENDING document for a request
///
/// The record id is freshly generated; the caller's `id` only travels in the
/// payload.
pub fn new_pending_record(request: &IntakeRequest, now: Timestamp) -> Document {
    Document {
        id: Uuid::new_v4().to_string(),
        status: RecordStatus::Pending,
        timestamp: now.epoch_seconds(),
        payload: Item {
            id: request.id.clone(),
            name: request.name.clone(),
            body: request.body.clone(),
            timestamp: request.timestamp,
        },
    }
}

/// Create a PENDING record in the status store
///
/// # Errors
///
/// Returns [`StatusStoreError`] if the store rejects the write.
pub async fn create_record(
    store: &dyn StatusStore,
    table: &str,
    request: &IntakeRequest,
) -> Result<Document, StatusStoreError> {
    let document = new_pending_record(request, Timestamp::now());
    store.put(table, &encode(&document)).await?;

    info!(
        record_id = %document.id,
        payload_id = %document.payload.id,
        table = table,
        "Item inserted successfully"
    );

    Ok(document)
}

fn required_string(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required_timestamp(value: &Value) -> Option<i64> {
    match value.get("timestamp")? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn serialize_as_string<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;
