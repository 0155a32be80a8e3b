/* 📖 # What does booting the provider do?

`LivewireServiceProvider::boot` wires Livewire into a host `Application` in four steps:
routes (documentation pages plus the message endpoint), console commands, routing
macros, and template directives. The host owns the registries; the provider only owns
the capabilities it delegates to, the message handler, the directive handler and
optionally a markdown renderer.
*/

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use livewire_base::pal::http::{HttpRequest, HttpResponse};
use livewire_base::{FilePath, LivewireResult, PalHandle, ResultExt};

use crate::commands::{
    CommandContext, CommandOutcome, CommandRegistry, MakeCommand, StartCommand, WatchCommand,
};
use crate::config::Config;
use crate::directives::{DirectiveHandler, DirectiveRegistry};
use crate::docs::{DocPage, NavLink, discover_doc_pages};
use crate::macros::{ComponentRouteMacros, ComponentRouterMacros};
use crate::markdown::{CachedMarkdownRenderer, GithubMarkdownRenderer, MarkdownRenderer};
use crate::message::{MessageEndpoint, MessageHandler};
use crate::router::{RequestHandler, Router};
use crate::template::{PageContext, render_page};

/// The host application the provider registers into.
#[derive(Debug, Clone)]
pub struct Application {
    pub pal: PalHandle,
    pub config: Config,
    pub router: Router,
    pub commands: CommandRegistry,
    pub directives: DirectiveRegistry,
    /// Documentation pages registered at boot, in navigation order.
    pub doc_pages: Vec<DocPage>,
    running_in_console: bool,
}

impl Application {
    pub fn new(pal: PalHandle, config: Config) -> Self {
        Self {
            pal,
            config,
            router: Router::new(),
            commands: CommandRegistry::new(),
            directives: DirectiveRegistry::new(),
            doc_pages: Vec::new(),
            running_in_console: false,
        }
    }

    /// Mark the application as a console process, which enables console commands.
    pub fn with_console(mut self, running_in_console: bool) -> Self {
        self.running_in_console = running_in_console;
        self
    }

    pub fn is_running_in_console(&self) -> bool {
        self.running_in_console
    }

    pub fn command_context(&self) -> CommandContext {
        CommandContext {
            pal: self.pal.clone(),
            config: self.config.clone(),
            router: self.router.clone(),
            doc_pages: self.doc_pages.clone(),
        }
    }

    pub fn run_command(&self, name: &str, args: &[String]) -> LivewireResult<CommandOutcome> {
        self.commands.run(name, &self.command_context(), args)
    }
}

/// Registers Livewire's routes, commands, macros and directives.
#[derive(Debug, Clone)]
pub struct LivewireServiceProvider {
    message_handler: Arc<dyn MessageHandler>,
    directive_handler: Arc<dyn DirectiveHandler>,
    markdown_renderer: Option<Arc<dyn MarkdownRenderer>>,
}

impl LivewireServiceProvider {
    pub fn new(
        message_handler: Arc<dyn MessageHandler>,
        directive_handler: Arc<dyn DirectiveHandler>,
    ) -> Self {
        Self {
            message_handler,
            directive_handler,
            markdown_renderer: None,
        }
    }

    /// Use `renderer` for documentation pages instead of the cached GitHub renderer.
    pub fn with_markdown_renderer(mut self, renderer: Arc<dyn MarkdownRenderer>) -> Self {
        self.markdown_renderer = Some(renderer);
        self
    }

    #[instrument(skip(self, app), fields(console = app.is_running_in_console()))]
    pub fn boot(&self, app: &mut Application) -> LivewireResult<()> {
        self.register_routes(app)?;
        self.register_commands(app);
        self.register_router_macros(app);
        self.register_directives(app);
        info!(
            routes = app.router.routes().len(),
            doc_pages = app.doc_pages.len(),
            commands = app.commands.len(),
            "livewire booted"
        );
        Ok(())
    }

    /// Documentation pages (when enabled) and the message endpoint behind `web`.
    pub fn register_routes(&self, app: &mut Application) -> LivewireResult<()> {
        if app.config.docs.enabled {
            self.register_docs_routes(app)?;
        } else {
            debug!("documentation routes disabled");
        }

        app.router
            .post(
                app.config.server.message_path.as_str(),
                "livewire:message",
                MessageEndpoint(Arc::clone(&self.message_handler)),
            )
            .middleware("web");
        Ok(())
    }

    /// One GET route per documentation page.
    ///
    /// A project without a docs directory simply has no pages.
    pub fn register_docs_routes(&self, app: &mut Application) -> LivewireResult<()> {
        let directory = FilePath::from(app.config.docs.directory.as_str());
        if !app.pal.file_exists(&directory)? {
            warn!(directory = %directory, "documentation directory not found, no docs routes registered");
            return Ok(());
        }
        let pages = discover_doc_pages(&app.pal, &app.config.docs)?;
        let links: Arc<Vec<NavLink>> = Arc::new(pages.iter().map(DocPage::nav_link).collect());
        let renderer: Arc<dyn MarkdownRenderer> = match &self.markdown_renderer {
            Some(renderer) => Arc::clone(renderer),
            None => Arc::new(CachedMarkdownRenderer::new(
                GithubMarkdownRenderer::new(app.pal.clone(), &app.config.markdown),
                app.config.markdown.cache_ttl(),
                app.config.markdown.cache_capacity,
            )),
        };

        for page in &pages {
            app.router.get(
                page.path.as_str(),
                format!("docs:{}", page.slug),
                DocPageHandler {
                    page: page.clone(),
                    links: Arc::clone(&links),
                    renderer: Arc::clone(&renderer),
                    pal: app.pal.clone(),
                    stylesheet: FilePath::from(app.config.docs.stylesheet.as_str()),
                },
            );
        }
        app.doc_pages = pages;
        Ok(())
    }

    /// `livewire:make`, `livewire:start` and `livewire:watch`, in console mode only.
    pub fn register_commands(&self, app: &mut Application) {
        if !app.is_running_in_console() {
            debug!("not running in console, skipping commands");
            return;
        }
        app.commands.register(Arc::new(MakeCommand));
        app.commands.register(Arc::new(StartCommand));
        app.commands.register(Arc::new(WatchCommand::default()));
    }

    pub fn register_router_macros(&self, app: &mut Application) {
        app.router.route_mixin(&ComponentRouteMacros);
        app.router
            .mixin(&ComponentRouterMacros::new(Arc::clone(&self.directive_handler)));
    }

    /// `livewire`, `on` and `endlivewire`, each delegating to the directive handler.
    pub fn register_directives(&self, app: &mut Application) {
        let handler = Arc::clone(&self.directive_handler);
        app.directives
            .register("livewire", Arc::new(move |expression: &str| handler.livewire(expression)));
        let handler = Arc::clone(&self.directive_handler);
        app.directives
            .register("on", Arc::new(move |expression: &str| handler.on(expression)));
        let handler = Arc::clone(&self.directive_handler);
        app.directives.register(
            "endlivewire",
            Arc::new(move |expression: &str| handler.endlivewire(expression)),
        );
    }
}

/// Serves one documentation page.
#[derive(Debug)]
struct DocPageHandler {
    page: DocPage,
    links: Arc<Vec<NavLink>>,
    renderer: Arc<dyn MarkdownRenderer>,
    pal: PalHandle,
    stylesheet: FilePath,
}

impl RequestHandler for DocPageHandler {
    fn handle(&self, _request: &HttpRequest) -> LivewireResult<HttpResponse> {
        let css = self
            .pal
            .read_file_to_string(&self.stylesheet)
            .with_context(|| format!("Failed to read stylesheet {}", self.stylesheet))?;
        let markdown = self
            .pal
            .read_file_to_string(&self.page.file)
            .with_context(|| format!("Failed to read documentation page {}", self.page.file))?;
        let content = self
            .renderer
            .render(&markdown)
            .with_context(|| format!("Failed to render {}", self.page.file))?;

        let html = render_page(&PageContext {
            title: &self.page.title,
            css: &css,
            content: &content,
            links: &self.links,
        })?;
        Ok(HttpResponse::html(html))
    }
}
