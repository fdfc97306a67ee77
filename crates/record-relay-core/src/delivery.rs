//! # Delivery Client
//!
//! Transmits mutation documents to the downstream GraphQL endpoint.
//!
//! Success is any HTTP status in `[200, 300)`. Every failure mode is folded into
//! [`DeliveryError`] so callers see a single error channel while still being able
//! to tell a remote rejection from a missing response or a request that never left.

use crate::mutation::MutationDocument;
use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn, Instrument, Span};

// ============================================================================
// Response and Error Types
// ============================================================================

/// Body returned by the GraphQL endpoint
///
/// GraphQL-level `errors` in a 2xx response do not make the delivery fail.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl GraphQLResponse {
    /// Check if the endpoint reported GraphQL-level errors
    pub fn has_errors(&self) -> bool {
        match &self.errors {
            Some(serde_json::Value::Array(errors)) => !errors.is_empty(),
            Some(serde_json::Value::Null) | None => false,
            Some(_) => true,
        }
    }
}

/// Errors that can occur while delivering a mutation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeliveryError {
    /// A response arrived with a non-2xx status
    #[error("GraphQL request failed with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    /// The request was sent but no usable response arrived
    #[error("GraphQL request failed: no response received ({message})")]
    NoResponse { message: String },

    /// The request could not be dispatched at all
    #[error("GraphQL request failed: {message}")]
    Transport { message: String },
}

impl DeliveryError {
    /// Check if error is transient and might succeed on a later redelivery
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RemoteRejected { status, .. } => *status >= 500 || *status == 429,
            Self::NoResponse { .. } => true,
            Self::Transport { .. } => false,
        }
    }

    /// HTTP status of a remote rejection
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// Delivery Client Trait
// ============================================================================

/// Interface for transmitting a mutation document to an endpoint
///
/// One call is exactly one network round trip; implementations never retry.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Deliver a mutation document
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Absolute URL of the GraphQL endpoint
    /// * `mutation` - Mutation document to POST as the JSON body
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] when the endpoint rejects the request, no
    /// response arrives, or the request cannot be built.
    async fn deliver(
        &self,
        endpoint: &str,
        mutation: &MutationDocument,
    ) -> Result<GraphQLResponse, DeliveryError>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// Configuration for [`HttpDeliveryClient`]
#[derive(Debug, Clone)]
pub struct DeliveryClientConfig {
    /// Transport timeout for the whole round trip
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for DeliveryClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("record-relay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// reqwest-backed delivery client
#[derive(Debug, Clone)]
pub struct HttpDeliveryClient {
    client: reqwest::Client,
    span: Span,
}

impl HttpDeliveryClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: DeliveryClientConfig) -> Result<Self, DeliveryError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| DeliveryError::Transport {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            span: tracing::info_span!("delivery_client", component = "delivery_client"),
        })
    }
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn deliver(
        &self,
        endpoint: &str,
        mutation: &MutationDocument,
    ) -> Result<GraphQLResponse, DeliveryError> {
        async move {
            let url = reqwest::Url::parse(endpoint).map_err(|e| DeliveryError::Transport {
                message: format!("invalid endpoint '{}': {}", endpoint, e),
            })?;

            let body = mutation.to_json().map_err(|e| DeliveryError::Transport {
                message: format!("failed to serialize mutation: {}", e),
            })?;

            debug!(endpoint = %url, "Posting mutation");

            let response = self
                .client
                .post(url)
                .body(body)
                .send()
                .await
                .map_err(classify_send_error)?;

            let status = response.status();
            if !status.is_success() {
                // The status code alone classifies the rejection
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("failed to read response body: {}", e));
                return Err(DeliveryError::RemoteRejected {
                    status: status.as_u16(),
                    body,
                });
            }

            let text = response.text().await.map_err(|e| DeliveryError::NoResponse {
                message: format!("failed to read response body: {}", e),
            })?;

            let graphql_response = parse_response_body(&text);
            if graphql_response.has_errors() {
                warn!(
                    endpoint = endpoint,
                    status = status.as_u16(),
                    errors = ?graphql_response.errors,
                    "GraphQL endpoint reported errors in a successful response"
                );
            }

            Ok(graphql_response)
        }
        .instrument(self.span.clone())
        .await
    }
}

/// Map a reqwest send failure onto the delivery taxonomy
fn classify_send_error(error: reqwest::Error) -> DeliveryError {
    if error.is_builder() {
        DeliveryError::Transport {
            message: error.to_string(),
        }
    } else {
        DeliveryError::NoResponse {
            message: error.to_string(),
        }
    }
}

/// Parse a 2xx body, tolerating empty or non-JSON content
fn parse_response_body(text: &str) -> GraphQLResponse {
    if text.trim().is_empty() {
        return GraphQLResponse::default();
    }

    match serde_json::from_str::<GraphQLResponse>(text) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Successful response body is not a GraphQL JSON object");
            GraphQLResponse::default()
        }
    }
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
