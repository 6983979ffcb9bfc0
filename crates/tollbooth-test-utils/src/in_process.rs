//! Transport that delivers client requests straight to a gated handler.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tollbooth_x402::{BusinessHandler, HttpRequest, HttpResponse, HttpTransport, X402Result};

/// In-process `HttpTransport` wired to a `BusinessHandler`, usually a
/// `PaidHandler` produced by `with_payment`.
pub struct InProcessTransport<H> {
    handler: H,
    requests: AtomicUsize,
}

impl<H: BusinessHandler> InProcessTransport<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            requests: AtomicUsize::new(0),
        }
    }

    /// The wrapped handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Number of requests delivered so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<H: BusinessHandler> HttpTransport for InProcessTransport<H> {
    async fn send(&self, request: HttpRequest) -> X402Result<HttpResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.handler.call(request).await)
    }
}
