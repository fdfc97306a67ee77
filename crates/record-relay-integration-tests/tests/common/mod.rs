//! Common test utilities for record-relay integration tests
//!
//! This module provides:
//! - Document and record builders
//! - A wiremock-backed GraphQL endpoint
//! - Pipeline wiring over a caller-supplied status store

use record_relay_core::{
    BatchDispatcher, ChangeNotification, DeliveryClientConfig, Document, EventProcessor,
    HttpDeliveryClient, Item, RawEventRecord, RecordStatus, StatusStore,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TABLE: &str = "record-events";
#[allow(dead_code)]
pub const BRAND: &str = "testBrand";
pub const GRAPHQL_PATH: &str = "/graphql";

// ============================================================================
// Builders
// ============================================================================

/// The reference document: id "123" carrying payload "payload-123"
pub fn reference_document() -> Document {
    Document {
        id: "123".to_string(),
        status: RecordStatus::Pending,
        timestamp: 1_678_886_500,
        payload: Item {
            id: "payload-123".to_string(),
            name: "Test Item".to_string(),
            body: "This is a test item".to_string(),
            timestamp: 1_678_886_400,
        },
    }
}

/// Document `record-{n}` carrying payload `payload-{n}`
pub fn numbered_document(n: usize) -> Document {
    Document {
        id: format!("record-{n}"),
        status: RecordStatus::Pending,
        timestamp: 1_700_000_000 + n as i64,
        payload: Item {
            id: format!("payload-{n}"),
            name: format!("Item {n}"),
            body: format!("Body of item {n}"),
            timestamp: 1_700_000_000,
        },
    }
}

/// Queue record holding the INSERT notification for a document
pub fn insert_record(document: &Document) -> RawEventRecord {
    RawEventRecord::from_notification(&ChangeNotification::insert(document))
        .expect("notification serializes")
        .with_message_id(format!("msg-{}", document.id))
}

// ============================================================================
// GraphQL endpoint
// ============================================================================

/// Endpoint URL for a mock server
pub fn endpoint(server: &MockServer) -> String {
    format!("{}{}", server.uri(), GRAPHQL_PATH)
}

/// Accept every well-formed mutation POST
pub async fn mount_accepting_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "createItem": { "id": "ok" } } })),
        )
        .mount(server)
        .await;
}

/// Reject mutations for one payload id with `status`, ahead of any other mock
pub async fn mount_rejection_for(server: &MockServer, payload_id: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({ "variables": { "id": payload_id } })))
        .respond_with(ResponseTemplate::new(status).set_body_string("downstream rejected"))
        .with_priority(1)
        .mount(server)
        .await;
}

// ============================================================================
// Pipeline wiring
// ============================================================================

/// Dispatcher delivering over HTTP into `store`
#[allow(dead_code)]
pub fn pipeline(store: Arc<dyn StatusStore>) -> BatchDispatcher {
    let client = HttpDeliveryClient::new(DeliveryClientConfig {
        timeout: Duration::from_secs(5),
        ..DeliveryClientConfig::default()
    })
    .expect("HTTP client builds");

    BatchDispatcher::new(Arc::new(EventProcessor::new(
        Arc::new(client),
        store,
        BRAND,
    )))
}
