// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fake registry document endpoint.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// One request as seen by the fake registry.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct FakeState {
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    status: StatusCode,
    reply: &'static str,
}

/// Running fake registry.
pub struct FakeRegistry {
    pub addr: SocketAddr,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl FakeRegistry {
    /// Start a registry that answers every submission with `status` and `reply`.
    pub async fn start(status: StatusCode, reply: &'static str) -> Self {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            captured: captured.clone(),
            status,
            reply,
        };

        let app = Router::new()
            .route("/api/v3/lk/documents/create", post(create_document))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, captured }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }
}

async fn create_document(
    State(state): State<FakeState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, &'static str) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.captured.lock().unwrap().push(CapturedRequest {
        query,
        authorization: header("authorization"),
        content_type: header("content-type"),
        body,
    });
    (state.status, state.reply)
}
