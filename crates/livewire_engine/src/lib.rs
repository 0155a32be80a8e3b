/* 📖 # What lives in livewire_engine?

Everything the service provider registers and everything those registrations need:
configuration, documentation discovery, markdown rendering with its cache, the page
template, the router with middleware and macros, template directives, the message
endpoint boundary and the console commands. All I/O goes through the PAL handle from
livewire_base, so the whole crate is tested against MockPal.
*/

pub mod commands;
pub mod config;
pub mod directives;
pub mod docs;
pub mod macros;
pub mod markdown;
pub mod message;
pub mod middleware;
pub mod provider;
pub mod router;
pub mod template;

pub use commands::{CommandContext, CommandOutcome, CommandRegistry, ConsoleCommand};
pub use config::{Config, load_config, parse_config};
pub use directives::{ComponentMarkupDirectives, DirectiveHandler, DirectiveRegistry};
pub use docs::{DocPage, NavLink, discover_doc_pages, extract_title, parse_doc_filename};
pub use macros::{ComponentRouteMacros, ComponentRouterMacros};
pub use markdown::{CachedMarkdownRenderer, GithubMarkdownRenderer, MarkdownRenderer};
pub use message::{MessageHandler, UnsupportedMessageHandler};
pub use middleware::{Middleware, Next, TraceRequests};
pub use provider::{Application, LivewireServiceProvider};
pub use router::{RequestHandler, Route, RouteSummary, Router};
pub use template::{PageContext, render_page};
