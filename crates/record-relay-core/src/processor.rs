//! # Event Processor
//!
//! Per-record delivery state machine.
//!
//! ```text
//! RECEIVED ─┬─> SKIPPED                      (not an INSERT; no write, no delivery)
//!           ├─> PARSE_FAILED                 (bad JSON: FAILED written for id "")
//!           ├─> PARSE_FAILED                 (image fails to decode: see DecodeFailurePolicy)
//!           └─> DELIVERING ─┬─> SUCCEEDED    (delivered and SUCCEEDED written)
//!                           └─> FAILED       (delivery or SUCCEEDED write failed)
//! ```
//!
//! Every reachable record sees exactly one downstream attempt, never retried here.
//! Redelivery is the upstream queue's job, so processing the same record twice is
//! safe: the last status write wins.

use crate::codec::{CodecError, Document};
use crate::delivery::{DeliveryClient, DeliveryError};
use crate::mutation::{attach_brand, build_mutation};
use crate::notification::{RawEventRecord, ReceivedNotification};
use crate::status_store::{StatusStore, StatusStoreError};
use crate::RecordStatus;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, Instrument, Span};

// ============================================================================
// Policy and Result Types
// ============================================================================

/// What to do when a notification's new image fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailurePolicy {
    /// Log and stop without touching the store
    #[default]
    Skip,

    /// Write FAILED keyed by the image's raw id, or `""` when none is readable
    MarkFailed,
}

/// Reasons a record did not reach SUCCEEDED
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessingError {
    #[error("Record body is not valid JSON: {message}")]
    MalformedBody { message: String },

    #[error("Change notification payload failed to decode: {0}")]
    DecodeFailure(#[from] CodecError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Delivery aborted unexpectedly: {message}")]
    DeliveryAborted { message: String },

    #[error("Status write failed: {0}")]
    StatusWrite(#[from] StatusStoreError),
}

/// Terminal state reached by one record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Not eligible for delivery
    Skipped { event_kind: Option<String> },

    /// Body or payload could not be read; `id` is set when FAILED was written
    ParseFailed {
        id: Option<String>,
        error: ProcessingError,
    },

    /// Delivered and SUCCEEDED written
    Succeeded { id: String },

    /// Delivery or the SUCCEEDED write failed; FAILED written
    Failed { id: String, error: ProcessingError },
}

impl RecordOutcome {
    /// Status this outcome wrote to the store, if any
    pub fn status_written(&self) -> Option<RecordStatus> {
        match self {
            Self::Skipped { .. } => None,
            Self::ParseFailed { id, .. } => id.as_ref().map(|_| RecordStatus::Failed),
            Self::Succeeded { .. } => Some(RecordStatus::Succeeded),
            Self::Failed { .. } => Some(RecordStatus::Failed),
        }
    }

    /// Check if the record ended in an error state
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ParseFailed { .. } | Self::Failed { .. })
    }
}

// ============================================================================
// Event Processor
// ============================================================================

/// Drives one raw event record through delivery and status reconciliation
pub struct EventProcessor {
    delivery_client: Arc<dyn DeliveryClient>,
    status_store: Arc<dyn StatusStore>,
    brand: String,
    decode_failure_policy: DecodeFailurePolicy,
    span: Span,
}

impl EventProcessor {
    /// Create a processor tagging every mutation with `brand`
    pub fn new(
        delivery_client: Arc<dyn DeliveryClient>,
        status_store: Arc<dyn StatusStore>,
        brand: impl Into<String>,
    ) -> Self {
        Self {
            delivery_client,
            status_store,
            brand: brand.into(),
            decode_failure_policy: DecodeFailurePolicy::default(),
            span: tracing::info_span!("event_processor", component = "event_processor"),
        }
    }

    /// Set the decode failure policy
    pub fn with_decode_failure_policy(mut self, policy: DecodeFailurePolicy) -> Self {
        self.decode_failure_policy = policy;
        self
    }

    /// Routing brand attached to every mutation
    pub fn brand(&self) -> &str {
        &self.brand
    }

    /// Process one record
    ///
    /// # Arguments
    ///
    /// * `record` - Raw queue record whose body holds a change notification
    /// * `endpoint` - GraphQL endpoint to deliver to
    /// * `table` - Status table to reconcile against
    ///
    /// # Returns
    ///
    /// The terminal [`RecordOutcome`]. Delivery and decode problems are outcomes,
    /// not errors.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::StatusWrite`] only when the best-effort FAILED
    /// write itself fails. The batch dispatcher isolates that error.
    pub async fn process_record(
        &self,
        record: &RawEventRecord,
        endpoint: &str,
        table: &str,
    ) -> Result<RecordOutcome, ProcessingError> {
        let record_span = tracing::info_span!(
            parent: &self.span,
            "process_record",
            message_id = record.message_id.as_deref().unwrap_or("")
        );

        self.run(record, endpoint, table)
            .instrument(record_span)
            .await
    }

    async fn run(
        &self,
        record: &RawEventRecord,
        endpoint: &str,
        table: &str,
    ) -> Result<RecordOutcome, ProcessingError> {
        let notification = match ReceivedNotification::parse(&record.body) {
            Ok(notification) => notification,
            Err(e) => {
                let error = ProcessingError::MalformedBody {
                    message: e.to_string(),
                };
                error!(
                    body = %record.body,
                    error = %error,
                    "Error processing record: body is not valid JSON"
                );

                self.mark_failed(table, "").await?;
                return Ok(RecordOutcome::ParseFailed {
                    id: Some(String::new()),
                    error,
                });
            }
        };

        if !notification.event_kind().is_some_and(|kind| kind.is_eligible()) {
            info!(
                event_kind = notification.event_kind_name().unwrap_or("<missing>"),
                "Skipping non-insert event"
            );
            return Ok(RecordOutcome::Skipped {
                event_kind: notification.event_kind_name().map(str::to_string),
            });
        }

        let document = match notification.decode_new_image() {
            Ok(document) => document,
            Err(e) => return self.handle_decode_failure(&notification, e, table).await,
        };

        self.deliver_document(document, endpoint, table).await
    }

    async fn handle_decode_failure(
        &self,
        notification: &ReceivedNotification,
        codec_error: CodecError,
        table: &str,
    ) -> Result<RecordOutcome, ProcessingError> {
        let error = ProcessingError::DecodeFailure(codec_error);
        error!(
            notification = %notification.raw(),
            error = %error,
            policy = ?self.decode_failure_policy,
            "Failed to parse item from change notification"
        );

        match self.decode_failure_policy {
            DecodeFailurePolicy::Skip => Ok(RecordOutcome::ParseFailed { id: None, error }),
            DecodeFailurePolicy::MarkFailed => {
                let id = notification.recoverable_id().unwrap_or_default().to_string();
                self.mark_failed(table, &id).await?;
                Ok(RecordOutcome::ParseFailed {
                    id: Some(id),
                    error,
                })
            }
        }
    }

    async fn deliver_document(
        &self,
        document: Document,
        endpoint: &str,
        table: &str,
    ) -> Result<RecordOutcome, ProcessingError> {
        let Document { id, payload, .. } = document;
        let mutation = build_mutation(&attach_brand(payload, &self.brand));

        let delivery = AssertUnwindSafe(self.delivery_client.deliver(endpoint, &mutation))
            .catch_unwind()
            .await;

        let error = match delivery {
            Ok(Ok(_)) => {
                info!(record_id = %id, endpoint = endpoint, "Successfully posted mutation");

                match self
                    .status_store
                    .update_status(table, &id, RecordStatus::Succeeded)
                    .await
                {
                    Ok(()) => {
                        info!(record_id = %id, table = table, "Record marked as succeeded");
                        return Ok(RecordOutcome::Succeeded { id });
                    }
                    Err(e) => {
                        error!(
                            record_id = %id,
                            table = table,
                            error = %e,
                            "Failed to record successful delivery"
                        );
                        ProcessingError::StatusWrite(e)
                    }
                }
            }
            Ok(Err(e)) => {
                error!(
                    record_id = %id,
                    endpoint = endpoint,
                    error = %e,
                    "Error delivering record"
                );
                ProcessingError::Delivery(e)
            }
            Err(panic) => {
                let error = ProcessingError::DeliveryAborted {
                    message: panic_message(panic.as_ref()),
                };
                error!(
                    record_id = %id,
                    endpoint = endpoint,
                    error = %error,
                    "Error delivering record"
                );
                error
            }
        };

        self.mark_failed(table, &id).await?;
        Ok(RecordOutcome::Failed { id, error })
    }

    /// Best-effort FAILED write; its own failure is returned to the caller
    async fn mark_failed(&self, table: &str, id: &str) -> Result<(), ProcessingError> {
        match self
            .status_store
            .update_status(table, id, RecordStatus::Failed)
            .await
        {
            Ok(()) => {
                info!(record_id = %id, table = table, "Record marked as failed");
                Ok(())
            }
            Err(e) => {
                error!(
                    record_id = %id,
                    table = table,
                    error = %e,
                    "Failed to record delivery failure"
                );
                Err(ProcessingError::StatusWrite(e))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
