//! Tests for the HTTP delivery client

use super::*;
use crate::codec::Item;
use crate::mutation::{attach_brand, build_mutation};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_mutation() -> MutationDocument {
    build_mutation(&attach_brand(
        Item {
            id: "payload-123".to_string(),
            name: "Test Item".to_string(),
            body: "This is a test item".to_string(),
            timestamp: 1_678_886_400,
        },
        "testBrand",
    ))
}

fn client_with_timeout(timeout: Duration) -> HttpDeliveryClient {
    HttpDeliveryClient::new(DeliveryClientConfig {
        timeout,
        ..DeliveryClientConfig::default()
    })
    .expect("client must build")
}

fn client() -> HttpDeliveryClient {
    client_with_timeout(Duration::from_secs(5))
}

// ============================================================================
// Success Contract
// ============================================================================

#[tokio::test]
async fn test_deliver_posts_json_mutation() {
    let mock_server = MockServer::start().await;
    let mutation = sample_mutation();

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::to_value(&mutation).unwrap()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "createItem": { "id": "payload-123" } }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = format!("{}/graphql", mock_server.uri());
    let response = client().deliver(&endpoint, &mutation).await.unwrap();

    assert_eq!(
        response.data,
        Some(json!({ "createItem": { "id": "payload-123" } }))
    );
    assert!(!response.has_errors());
}

#[tokio::test]
async fn test_graphql_errors_in_success_response_still_deliver() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [ { "message": "brand not allowed" } ]
        })))
        .mount(&mock_server)
        .await;

    let response = client()
        .deliver(&mock_server.uri(), &sample_mutation())
        .await
        .expect("2xx is a successful delivery");

    assert!(response.has_errors());
    assert_eq!(response.data, None);
}

#[tokio::test]
async fn test_any_2xx_status_is_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "data": {} })))
        .mount(&mock_server)
        .await;

    let result = client().deliver(&mock_server.uri(), &sample_mutation()).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_empty_success_body_yields_empty_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let response = client()
        .deliver(&mock_server.uri(), &sample_mutation())
        .await
        .unwrap();

    assert_eq!(response, GraphQLResponse::default());
}

#[tokio::test]
async fn test_non_json_success_body_yields_empty_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let response = client()
        .deliver(&mock_server.uri(), &sample_mutation())
        .await
        .unwrap();

    assert_eq!(response, GraphQLResponse::default());
}

// ============================================================================
// Failure Taxonomy
// ============================================================================

#[tokio::test]
async fn test_server_error_is_remote_rejected_with_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let err = client()
        .deliver(&mock_server.uri(), &sample_mutation())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DeliveryError::RemoteRejected {
            status: 500,
            body: "upstream exploded".to_string(),
        }
    );
    assert!(err.is_transient());
    assert!(err.to_string().contains("status 500"));
}

#[tokio::test]
async fn test_redirect_status_is_not_success() {
    let mock_server = MockServer::start().await;

    // 304 is never followed as a redirect, so it reaches the status check
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&mock_server)
        .await;

    let err = client()
        .deliver(&mock_server.uri(), &sample_mutation())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(304));
}

#[tokio::test]
async fn test_client_error_is_permanent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad variables"))
        .mount(&mock_server)
        .await;

    let err = client()
        .deliver(&mock_server.uri(), &sample_mutation())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_truncated_rejection_body_keeps_status() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promise a longer body than is sent, then close the connection
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buffer = [0u8; 4096];
        while !request.ends_with(b"}") {
            let read = socket.read(&mut buffer).await.unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buffer[..read]);
        }
        socket
            .write_all(b"HTTP/1.1 502 Bad Gateway\r\ncontent-length: 100\r\n\r\npartial")
            .await
            .unwrap();
    });

    let err = client()
        .deliver(&format!("http://{}/graphql", address), &sample_mutation())
        .await
        .unwrap_err();
    server.await.unwrap();

    match err {
        DeliveryError::RemoteRejected { status, .. } => assert_eq!(status, 502),
        other => panic!("Expected RemoteRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_url_is_transport_error() {
    let err = client()
        .deliver("not a url", &sample_mutation())
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::Transport { .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_refused_connection_is_no_response() {
    // Reserve a port, then release it so nothing is listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let err = client()
        .deliver(&format!("http://{}/graphql", address), &sample_mutation())
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::NoResponse { .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_timeout_is_no_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": {} }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let err = client_with_timeout(Duration::from_millis(100))
        .deliver(&mock_server.uri(), &sample_mutation())
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::NoResponse { .. }));
}

// ============================================================================
// Response Helpers
// ============================================================================

#[test]
fn test_has_errors_variants() {
    let empty_list = GraphQLResponse {
        data: None,
        errors: Some(json!([])),
    };
    let null_errors = GraphQLResponse {
        data: None,
        errors: Some(serde_json::Value::Null),
    };
    let object_errors = GraphQLResponse {
        data: None,
        errors: Some(json!({ "message": "boom" })),
    };

    assert!(!empty_list.has_errors());
    assert!(!null_errors.has_errors());
    assert!(object_errors.has_errors());
}
