use std::sync::Arc;

use tracing::info;

use livewire_base::pal::http::HttpServerConfig;
use livewire_base::{LivewireResult, ResultExt};

use super::{CommandContext, CommandOutcome, ConsoleCommand};

/// `livewire:start`: serve the booted router on the configured host and port.
#[derive(Debug, Default, Clone, Copy)]
pub struct StartCommand;

impl ConsoleCommand for StartCommand {
    fn name(&self) -> &'static str {
        "livewire:start"
    }

    fn description(&self) -> &'static str {
        "Serve the application's routes"
    }

    fn run(&self, context: &CommandContext, args: &[String]) -> LivewireResult<CommandOutcome> {
        if !args.is_empty() {
            livewire_base::bail!("livewire:start takes no arguments");
        }
        let server = &context.config.server;
        let config = HttpServerConfig::new(server.host.as_str()).with_port(server.port);
        let handle = context
            .pal
            .start_http_server(Box::new(context.router.clone()), config)
            .with_context(|| format!("Failed to start server on {}:{}", server.host, server.port))?;

        let address = handle.address(&server.host);
        info!(%address, routes = context.router.routes().len(), "livewire server started");
        Ok(CommandOutcome::Running {
            description: format!("Serving on http://{}", address),
            stop: Arc::clone(handle.shutdown_flag()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::router::Router;
    use livewire_base::pal::http::{HttpMethod, HttpRequest, HttpResponse};
    use livewire_base::{MockPal, PalHandle};

    #[test]
    fn test_start_serves_router() {
        let mock = MockPal::new();
        let mut router = Router::new();
        router.get(
            "/ping",
            "ping",
            |_request: &HttpRequest| -> LivewireResult<HttpResponse> { Ok(HttpResponse::text("pong")) },
        );
        let context = CommandContext {
            pal: PalHandle::new(mock.clone()),
            config: Config::default(),
            router,
            doc_pages: Vec::new(),
        };

        let outcome = StartCommand.run(&context, &[]).unwrap();
        assert_eq!(outcome.message(), "Serving on http://127.0.0.1:8000");
        assert_eq!(mock.http_server_count(), 1);

        let response = mock
            .simulate_request(8000, HttpRequest::new(HttpMethod::Get, "/ping"))
            .unwrap();
        assert_eq!(response.body().to_string_lossy(), "pong");

        let CommandOutcome::Running { stop, .. } = &outcome else {
            panic!("expected a running outcome");
        };
        stop.store(true, std::sync::atomic::Ordering::SeqCst);
        outcome.wait();
    }

    #[test]
    fn test_start_reports_bind_failure() {
        let mock = MockPal::new();
        let context = CommandContext {
            pal: PalHandle::new(mock),
            config: Config::default(),
            router: Router::new(),
            doc_pages: Vec::new(),
        };

        StartCommand.run(&context, &[]).unwrap();
        let error = StartCommand.run(&context, &[]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Failed to start server on 127.0.0.1:8000: Port 8000 is already in use"
        );
    }
}
