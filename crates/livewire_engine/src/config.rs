use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, instrument};

use livewire_base::{FilePath, LivewireResult, PalHandle, ResultExt};

/// Configuration read from `livewire.toml`. Every section and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub docs: DocsConfig,
    pub markdown: MarkdownConfig,
    pub server: ServerConfig,
    pub components: ComponentsConfig,
}

/// Where the documentation pages live and where they are mounted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocsConfig {
    /// Register the documentation routes at all.
    pub enabled: bool,
    /// Directory scanned (non-recursively) for `<order>_<slug>.md` files.
    pub directory: String,
    /// Stylesheet inlined into every page.
    pub stylesheet: String,
    /// URL prefix for the page routes.
    pub route_prefix: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "docs".to_string(),
            stylesheet: "docs/template.css".to_string(),
            route_prefix: "/livewire/docs".to_string(),
        }
    }
}

/// Remote markdown rendering API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    pub api_url: String,
    pub user_agent: String,
    /// How long a rendered page stays cached.
    pub cache_ttl_minutes: u64,
    /// Most rendered pages kept at once.
    pub cache_capacity: u64,
}

impl MarkdownConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes.saturating_mul(60))
    }
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com/markdown/raw".to_string(),
            user_agent: "Livewire Docs".to_string(),
            cache_ttl_minutes: 1200,
            cache_capacity: 500,
        }
    }
}

/// Bundled HTTP server used by `livewire:start`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Endpoint receiving component update messages.
    pub message_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            message_path: "/livewire/message".to_string(),
        }
    }
}

/// Component scaffolding used by `livewire:make`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentsConfig {
    pub views_directory: String,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            views_directory: "resources/views/livewire".to_string(),
        }
    }
}

/// Parse a configuration string.
pub fn parse_config(source: &str) -> LivewireResult<Config> {
    toml::from_str(source).map_err(|e| livewire_base::err!("Invalid configuration: {}", e))
}

/// Load the configuration file at `path` through the PAL.
///
/// # Examples
/// ```no_run
/// use livewire_base::{RealPal, PalHandle, FilePath};
/// use livewire_engine::load_config;
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let config = load_config(&pal, &FilePath::from("livewire.toml")).unwrap();
/// println!("docs under {}", config.docs.route_prefix);
/// ```
#[instrument(skip(pal), fields(path = %path))]
pub fn load_config(pal: &PalHandle, path: &FilePath) -> LivewireResult<Config> {
    let source = pal
        .read_file_to_string(path)
        .with_context(|| format!("Failed to read configuration from {}", path))?;
    let config = parse_config(&source).with_context(|| format!("Failed to parse {}", path))?;
    debug!(?config, "configuration loaded");
    Ok(config)
}
