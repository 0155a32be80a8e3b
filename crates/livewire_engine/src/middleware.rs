use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use livewire_base::LivewireResult;
use livewire_base::pal::http::{HttpRequest, HttpResponse};

use crate::router::RequestHandler;

/// Wraps request handling. Call `next.run(request)` to continue down the chain.
pub trait Middleware: std::fmt::Debug + Send + Sync + 'static {
    fn handle(&self, request: &HttpRequest, next: Next<'_>) -> LivewireResult<HttpResponse>;
}

/// The remainder of a middleware chain, ending in the route handler.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    handler: &'a dyn RequestHandler,
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Middleware>], handler: &'a dyn RequestHandler) -> Self {
        Self { chain, handler }
    }

    pub fn run(self, request: &HttpRequest) -> LivewireResult<HttpResponse> {
        match self.chain.split_first() {
            Some((first, rest)) => first.handle(
                request,
                Next {
                    chain: rest,
                    handler: self.handler,
                },
            ),
            None => self.handler.handle(request),
        }
    }
}

/// Logs every request with its status and duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceRequests;

impl Middleware for TraceRequests {
    fn handle(&self, request: &HttpRequest, next: Next<'_>) -> LivewireResult<HttpResponse> {
        let started = Instant::now();
        let result = next.run(request);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(response) => info!(
                method = %request.method(),
                path = %request.path(),
                status = response.status().as_u16(),
                elapsed_ms,
                "request"
            ),
            Err(e) => warn!(
                method = %request.method(),
                path = %request.path(),
                elapsed_ms,
                error = %e,
                "request failed"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livewire_base::pal::http::{HttpMethod, HttpStatusCode};

    #[derive(Debug)]
    struct Deny;

    impl Middleware for Deny {
        fn handle(&self, _request: &HttpRequest, _next: Next<'_>) -> LivewireResult<HttpResponse> {
            Ok(HttpResponse::new(HttpStatusCode::FORBIDDEN))
        }
    }

    fn handler(_request: &HttpRequest) -> LivewireResult<HttpResponse> {
        Ok(HttpResponse::text("handled"))
    }

    #[test]
    fn test_empty_chain_calls_handler() {
        let response = Next::new(&[], &handler)
            .run(&HttpRequest::new(HttpMethod::Get, "/"))
            .unwrap();
        assert_eq!(response.body().to_string_lossy(), "handled");
    }

    #[test]
    fn test_middleware_can_short_circuit() {
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(TraceRequests), Arc::new(Deny)];
        let response = Next::new(&chain, &handler)
            .run(&HttpRequest::new(HttpMethod::Post, "/livewire/message"))
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::FORBIDDEN);
    }

    #[test]
    fn test_trace_requests_passes_errors_through() {
        let failing = |_request: &HttpRequest| -> LivewireResult<HttpResponse> {
            Err(livewire_base::err!("boom"))
        };
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(TraceRequests)];
        let error = Next::new(&chain, &failing)
            .run(&HttpRequest::new(HttpMethod::Get, "/"))
            .unwrap_err();
        assert_eq!(error.to_string(), "boom");
    }
}
