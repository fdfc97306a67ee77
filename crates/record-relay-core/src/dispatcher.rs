//! # Batch Dispatcher
//!
//! Fans a batch of raw event records out to the [`EventProcessor`], one task per
//! record, and waits for every task to settle. A failing or panicking record never
//! stops its siblings and never reaches the caller.

use crate::notification::RawEventRecord;
use crate::processor::{EventProcessor, RecordOutcome};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, Instrument, Span};

/// Errors rejecting a batch before any record is processed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Delivery endpoint is not configured")]
    MissingEndpoint,

    #[error("Status table name is not configured")]
    MissingTableName,
}

/// Per-batch tally of record outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub parse_failed: usize,

    /// Records whose processing errored or panicked past the processor
    pub unhandled: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Skipped { .. } => self.skipped += 1,
            RecordOutcome::ParseFailed { .. } => self.parse_failed += 1,
            RecordOutcome::Succeeded { .. } => self.succeeded += 1,
            RecordOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Check if any record ended outside SUCCEEDED or SKIPPED
    pub fn has_failures(&self) -> bool {
        self.failed + self.parse_failed + self.unhandled > 0
    }
}

/// Concurrent per-record fan-out with all-settled semantics
pub struct BatchDispatcher {
    processor: Arc<EventProcessor>,
    span: Span,
}

impl BatchDispatcher {
    /// Create a dispatcher driving `processor`
    pub fn new(processor: Arc<EventProcessor>) -> Self {
        Self {
            processor,
            span: tracing::info_span!("dispatcher", component = "dispatcher"),
        }
    }

    /// Process every record in the batch concurrently
    ///
    /// Returns once every record has settled. Record ordering is not preserved.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if `endpoint` or `table` is empty. Nothing that
    /// happens while processing individual records is returned as an error.
    pub async fn dispatch(
        &self,
        records: Vec<RawEventRecord>,
        endpoint: &str,
        table: &str,
    ) -> Result<BatchSummary, DispatchError> {
        async move {
            if endpoint.is_empty() {
                error!("Delivery endpoint is not set");
                return Err(DispatchError::MissingEndpoint);
            }
            if table.is_empty() {
                error!("Status table name is not set");
                return Err(DispatchError::MissingTableName);
            }

            if records.is_empty() {
                error!("No records found in batch");
                return Ok(BatchSummary::default());
            }

            info!(record_count = records.len(), table = table, "Dispatching batch");

            let tasks = records.into_iter().map(|record| {
                let processor = Arc::clone(&self.processor);
                let endpoint = endpoint.to_string();
                let table = table.to_string();

                tokio::spawn(
                    async move { processor.process_record(&record, &endpoint, &table).await }
                        .instrument(Span::current()),
                )
            });

            let mut summary = BatchSummary::default();
            for settled in join_all(tasks).await {
                summary.total += 1;
                match settled {
                    Ok(Ok(outcome)) => summary.record(&outcome),
                    Ok(Err(e)) => {
                        summary.unhandled += 1;
                        error!(error = %e, "Record processing failed");
                    }
                    Err(e) => {
                        summary.unhandled += 1;
                        error!(error = %e, "Record processing task did not complete");
                    }
                }
            }

            info!(
                total = summary.total,
                succeeded = summary.succeeded,
                failed = summary.failed,
                skipped = summary.skipped,
                parse_failed = summary.parse_failed,
                unhandled = summary.unhandled,
                "Batch settled"
            );

            Ok(summary)
        }
        .instrument(self.span.clone())
        .await
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
