//! Stub business handlers.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tollbooth_x402::{BusinessHandler, HttpRequest, HttpResponse};

/// Answers every request with a fixed status and counts calls.
#[derive(Clone)]
pub struct StatusHandler {
    status: u16,
    calls: Arc<AtomicUsize>,
}

impl StatusHandler {
    /// Number of times the handler ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Handler that answers `status` with a small JSON body.
pub fn status_handler(status: u16) -> StatusHandler {
    StatusHandler {
        status,
        calls: Arc::new(AtomicUsize::new(0)),
    }
}

#[async_trait]
impl BusinessHandler for StatusHandler {
    async fn call(&self, _request: HttpRequest) -> HttpResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = serde_json::json!({ "status": self.status }).to_string();
        http::Response::builder()
            .status(self.status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body.into_bytes())
            .unwrap()
    }
}

/// Echoes the method, path and body back as JSON.
#[derive(Clone, Default)]
pub struct EchoHandler;

/// Handler that echoes the request.
pub fn echo_handler() -> EchoHandler {
    EchoHandler
}

#[async_trait]
impl BusinessHandler for EchoHandler {
    async fn call(&self, request: HttpRequest) -> HttpResponse {
        let (parts, body) = request.into_parts();
        let echoed = serde_json::json!({
            "method": parts.method.as_str(),
            "path": parts.uri.path(),
            "body": String::from_utf8_lossy(&body),
        });
        http::Response::new(echoed.to_string().into_bytes())
    }
}
