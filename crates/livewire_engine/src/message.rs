use std::sync::Arc;

use livewire_base::LivewireResult;
use livewire_base::pal::http::{HttpRequest, HttpResponse, HttpStatusCode};

use crate::router::RequestHandler;

/// Receives component update messages posted by the browser.
///
/// The component runtime lives outside this crate; the provider only routes the
/// endpoint to whatever implementation the host supplies.
pub trait MessageHandler: std::fmt::Debug + Send + Sync + 'static {
    fn handle_message(&self, request: &HttpRequest) -> LivewireResult<HttpResponse>;
}

/// Adapts a [`MessageHandler`] to a route handler.
#[derive(Debug, Clone)]
pub struct MessageEndpoint(pub Arc<dyn MessageHandler>);

impl RequestHandler for MessageEndpoint {
    fn handle(&self, request: &HttpRequest) -> LivewireResult<HttpResponse> {
        self.0.handle_message(request)
    }
}

/// Answers every message with 501, for hosts without a component runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedMessageHandler;

impl MessageHandler for UnsupportedMessageHandler {
    fn handle_message(&self, _request: &HttpRequest) -> LivewireResult<HttpResponse> {
        Ok(HttpResponse::new(HttpStatusCode::NOT_IMPLEMENTED)
            .with_content_type("text/plain; charset=utf-8")
            .with_body("No component runtime is installed to handle Livewire messages"))
    }
}
