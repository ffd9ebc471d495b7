// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the throttled registry client over HTTP.

mod harness;

use axum::http::StatusCode;
use harness::registry::FakeRegistry;
use registry_throttle::{
    config::{Config, RegistryConfig, ThrottleConfig},
    transport::{DocumentRequest, DocumentType, HttpTransport, ProductGroup, SubmissionTransport},
    AdmissionGate, ClientError, RegistryClient, TransportError,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn request(group: ProductGroup) -> DocumentRequest {
    DocumentRequest {
        document: "<doc>shoes</doc>".to_string(),
        signature: "detached-signature".to_string(),
        document_type: DocumentType::LpIntroduceGoodsXml,
        product_group: group,
        token: "secret-token".to_string(),
    }
}

fn config_for(registry: &FakeRegistry, capacity: u32, window_ms: u64) -> Config {
    Config {
        throttle: ThrottleConfig { capacity, window_ms },
        registry: RegistryConfig {
            base_url: registry.base_url(),
            timeout_secs: 5,
        },
    }
}

#[tokio::test]
async fn test_transport_sends_documented_request() {
    let registry = FakeRegistry::start(StatusCode::OK, r#"{"value":"doc-42"}"#).await;
    let transport = HttpTransport::new(&RegistryConfig {
        base_url: registry.base_url(),
        timeout_secs: 5,
    })
    .unwrap();

    let body = transport.submit(&request(ProductGroup::Shoes)).await.unwrap();
    assert_eq!(body, r#"{"value":"doc-42"}"#);

    let captured = registry.requests();
    assert_eq!(captured.len(), 1);
    let sent = &captured[0];
    assert_eq!(sent.query.get("pg").map(String::as_str), Some("shoes"));
    assert_eq!(sent.authorization.as_deref(), Some("Bearer secret-token"));
    assert_eq!(sent.content_type.as_deref(), Some("application/json"));
    assert_eq!(
        sent.body,
        serde_json::json!({
            "document_format": "XML",
            "product_document": "PGRvYz5zaG9lczwvZG9jPg==",
            "product_group": 2,
            "signature": "ZGV0YWNoZWQtc2lnbmF0dXJl",
            "type": "LP_INTRODUCE_GOODS_XML",
        })
    );
}

#[tokio::test]
async fn test_error_status_body_is_returned_raw() {
    let registry = FakeRegistry::start(StatusCode::UNAUTHORIZED, r#"{"error":"token expired"}"#).await;
    let client = RegistryClient::from_config(&config_for(&registry, 5, 1000)).unwrap();

    let body = client.create_document(&request(ProductGroup::Milk)).await.unwrap();
    assert_eq!(body, r#"{"error":"token expired"}"#);
}

#[tokio::test]
async fn test_submissions_are_throttled_end_to_end() {
    let registry = FakeRegistry::start(StatusCode::OK, "{}").await;
    let client = Arc::new(RegistryClient::from_config(&config_for(&registry, 2, 300)).unwrap());

    let start = Instant::now();
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.create_document(&request(ProductGroup::Tobacco)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Five calls at two per 300ms need two full windows.
    assert!(start.elapsed() >= Duration::from_millis(600));
    assert_eq!(registry.requests().len(), 5);
    assert_eq!(client.gate().metrics().admissions(), 5);
    assert_eq!(client.gate().metrics().delayed_admissions(), 3);
}

#[tokio::test]
async fn test_transport_failure_does_not_touch_ledger() {
    // Nothing listens on this port once the listener is dropped.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gate = Arc::new(AdmissionGate::new(Duration::from_secs(10), 3).unwrap());
    let transport = HttpTransport::new(&RegistryConfig {
        base_url: format!("http://{}", addr),
        timeout_secs: 2,
    })
    .unwrap();
    let client = RegistryClient::new(gate.clone(), transport);

    let result = client.create_document(&request(ProductGroup::Bicycle)).await;
    assert!(matches!(
        result,
        Err(ClientError::Transport(TransportError::Http(_)))
    ));
    assert_eq!(gate.in_flight().await, 1);
    assert_eq!(gate.next_available_in().await, Duration::ZERO);
}

#[tokio::test]
async fn test_clients_sharing_a_gate_share_the_limit() {
    let registry = FakeRegistry::start(StatusCode::OK, "{}").await;
    let gate = Arc::new(AdmissionGate::new(Duration::from_secs(30), 2).unwrap());
    let registry_config = RegistryConfig {
        base_url: registry.base_url(),
        timeout_secs: 5,
    };

    let first = RegistryClient::new(gate.clone(), HttpTransport::new(&registry_config).unwrap());
    let second = RegistryClient::new(gate.clone(), HttpTransport::new(&registry_config).unwrap());

    first.create_document(&request(ProductGroup::Clothes)).await.unwrap();
    second.create_document(&request(ProductGroup::Clothes)).await.unwrap();

    let result = second
        .create_document_with_cancel(
            &request(ProductGroup::Clothes),
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;
    assert!(matches!(
        result,
        Err(ClientError::Gate(registry_throttle::GateError::Cancelled))
    ));
    assert_eq!(registry.requests().len(), 2);
}
