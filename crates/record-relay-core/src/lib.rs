//! # Record Relay Core
//!
//! Core business logic for the Record Relay delivery pipeline.
//!
//! This crate receives batches of change-events describing newly created records,
//! forwards each eligible record as a GraphQL mutation to a downstream service, and
//! reconciles the delivery outcome against a durable status store.
//!
//! ## Architecture
//!
//! The core follows clean architecture principles:
//! - Business logic depends only on trait abstractions ([`StatusStore`], [`DeliveryClient`])
//! - Infrastructure implementations are injected at construction time
//! - Every record is processed independently; one failing record never affects its siblings
//!
//! ## Usage
//!
//! ```rust
//! use record_relay_core::{EventKind, RecordStatus};
//!
//! assert_eq!(RecordStatus::Succeeded.as_str(), "SUCCEEDED");
//! assert!(EventKind::Insert.is_eligible());
//! assert!(!EventKind::Modify.is_eligible());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Status and Event Kind Types
// ============================================================================

/// Delivery status tracked per record in the status store
///
/// Records are created as `PENDING`; the delivery pipeline only ever writes one of
/// the two terminal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Pending,
    Succeeded,
    Failed,
}

impl RecordStatus {
    /// Get the wire representation stored in the status attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }

    /// Check if this status is terminal from the pipeline's perspective
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SUCCEEDED" => Ok(Self::Succeeded),
            "FAILED" => Ok(Self::Failed),
            _ => Err(ParseError::InvalidFormat {
                expected: "PENDING, SUCCEEDED, or FAILED".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

/// Kind of change described by a change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Insert,
    Modify,
    Remove,
}

impl EventKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Modify => "MODIFY",
            Self::Remove => "REMOVE",
        }
    }

    /// Only inserts are forwarded downstream
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Insert)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSERT" => Ok(Self::Insert),
            "MODIFY" => Ok(Self::Modify),
            "REMOVE" => Ok(Self::Remove),
            _ => Err(ParseError::InvalidFormat {
                expected: "INSERT, MODIFY, or REMOVE".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Time Types
// ============================================================================

/// UTC timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from epoch seconds
    pub fn from_epoch_seconds(seconds: i64) -> Result<Self, ParseError> {
        DateTime::from_timestamp(seconds, 0)
            .map(Self)
            .ok_or_else(|| ParseError::InvalidFormat {
                expected: "epoch seconds within the representable range".to_string(),
                actual: seconds.to_string(),
            })
    }

    /// Whole seconds since the Unix epoch
    pub fn epoch_seconds(&self) -> i64 {
        self.0.timestamp()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Request body is not valid JSON: {message}")]
    MalformedJson { message: String },
}

/// Error type for string parsing failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Typed-attribute wire form and domain documents
pub mod codec;

/// GraphQL mutation construction
pub mod mutation;

/// HTTP delivery of mutation documents
pub mod delivery;

/// Status store interface
pub mod status_store;

/// Queue records and change notifications
pub mod notification;

/// Per-record delivery state machine
pub mod processor;

/// Concurrent batch fan-out
pub mod dispatcher;

/// Creation of pending records
pub mod intake;

/// Status store adapters
pub mod adapters;

// Re-export key types for convenience
pub use adapters::{FilesystemStatusStore, InMemoryStatusStore};
pub use codec::{decode, encode, AttributeValue, CodecError, Document, Item, StoredRecord};
pub use delivery::{
    DeliveryClient, DeliveryClientConfig, DeliveryError, GraphQLResponse, HttpDeliveryClient,
};
pub use dispatcher::{BatchDispatcher, BatchSummary, DispatchError};
pub use intake::{create_record, new_pending_record, validate_request_body, IntakeRequest};
pub use mutation::{attach_brand, build_mutation, ItemWithBrand, MutationDocument};
pub use notification::{ChangeNotification, RawEventRecord};
pub use processor::{DecodeFailurePolicy, EventProcessor, ProcessingError, RecordOutcome};
pub use status_store::{StatusStore, StatusStoreError, StatusWrite};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
