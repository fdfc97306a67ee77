//! # Queue Records and Change Notifications
//!
//! A [`RawEventRecord`] is the opaque envelope the upstream queue hands over; its
//! body carries a JSON-encoded [`ChangeNotification`].
//!
//! Bodies are read leniently through [`ReceivedNotification`]: anything that is
//! valid JSON parses, and eligibility and decoding are decided afterwards so the
//! processor can tell a malformed body from a skipped or undecodable one.

use crate::codec::{try_decode, CodecError, Document, StoredRecord};
use crate::EventKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names accepted for the event kind, preferred spelling first
const EVENT_KIND_FIELDS: [&str; 2] = ["eventKind", "eventName"];

/// Field names accepted for the new image, preferred spelling first
const NEW_IMAGE_FIELDS: [&str; 2] = ["newImage", "NewImage"];

/// One record delivered by the upstream queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEventRecord {
    /// Queue-assigned message id, used only for log correlation
    #[serde(
        rename = "messageId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub message_id: Option<String>,

    /// JSON-encoded change notification
    pub body: String,
}

impl RawEventRecord {
    /// Create a record from a body
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            message_id: None,
            body: body.into(),
        }
    }

    /// Attach a queue message id
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Wrap a change notification as a queue record
    pub fn from_notification(notification: &ChangeNotification) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_string(notification)?))
    }
}

/// A change to a single source-of-truth record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    #[serde(rename = "eventKind", alias = "eventName")]
    pub event_kind: EventKind,

    #[serde(rename = "newImage", alias = "NewImage")]
    pub new_image: StoredRecord,
}

impl ChangeNotification {
    /// Notification a change stream emits when a record is created
    pub fn insert(document: &Document) -> Self {
        Self {
            event_kind: EventKind::Insert,
            new_image: crate::codec::encode(document),
        }
    }
}

/// A change notification as read from a queue record body
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedNotification {
    raw: Value,
}

impl ReceivedNotification {
    /// Parse a record body
    ///
    /// # Errors
    ///
    /// Fails only when the body is not valid JSON.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            raw: serde_json::from_str(body)?,
        })
    }

    /// The notification exactly as received, for diagnostics
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Event kind as spelled in the notification, if it is a string
    pub fn event_kind_name(&self) -> Option<&str> {
        first_field(&self.raw, &EVENT_KIND_FIELDS).and_then(Value::as_str)
    }

    /// Recognised event kind; `None` for missing or unknown kinds
    pub fn event_kind(&self) -> Option<EventKind> {
        self.event_kind_name().and_then(|kind| kind.parse().ok())
    }

    /// The record id carried by the new image, even when the image fails to decode
    pub fn recoverable_id(&self) -> Option<&str> {
        first_field(&self.raw, &NEW_IMAGE_FIELDS)
            .and_then(|image| image.get("id"))
            .and_then(|id| id.get("S"))
            .and_then(Value::as_str)
    }

    /// Decode the new image into a [`Document`]
    pub fn decode_new_image(&self) -> Result<Document, CodecError> {
        let image = first_field(&self.raw, &NEW_IMAGE_FIELDS).ok_or_else(|| {
            CodecError::MissingAttribute {
                name: NEW_IMAGE_FIELDS[0].to_string(),
            }
        })?;

        try_decode(&StoredRecord::from_value(image.clone())?)
    }
}

fn first_field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| value.get(*name).filter(|v| !v.is_null()))
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
