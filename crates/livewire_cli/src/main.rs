/* 📖 # How does the CLI host the provider?

The `livewire` binary plays the host application: it loads `livewire.toml` from the
current directory (defaults when the file is absent), defines the `web` middleware
group, boots the service provider in console mode and then hands the subcommand to
the matching console command. `routes` is the one subcommand of its own; it lists the
table the provider built.

There is no component runtime behind the message endpoint, so it answers 501.

Exit codes:
- 0: Success
- 1: Error (invalid config, unreadable docs page, command failure)
*/

use std::env;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use livewire_base::tracing::init_tracing;
use livewire_base::{FilePath, LivewireError, LivewireResult, PalHandle, RealPal};
use livewire_engine::{
    Application, ComponentMarkupDirectives, Config, LivewireServiceProvider, Middleware,
    TraceRequests, UnsupportedMessageHandler, load_config,
};

#[derive(Parser, Debug)]
#[command(
    name = "livewire",
    version,
    about = "Serve Livewire documentation and scaffold components."
)]
struct Cli {
    /// Configuration file, relative to the current directory.
    #[arg(long, default_value = "livewire.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the registered routes.
    Routes {
        /// Print the routes as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Create a new component view (`livewire:make`).
    Make {
        /// Component name; dots separate directories.
        name: String,
    },
    /// Serve the routes over HTTP (`livewire:start`).
    Start {
        /// Bind address, overrides `server.host`.
        #[arg(long)]
        host: Option<String>,
        /// Bind port, overrides `server.port`.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Watch the documentation directory (`livewire:watch`).
    Watch,
}

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> LivewireResult<()> {
    let current_dir = env::current_dir().map_err(|e| {
        Box::new(LivewireError::file_error(".", e).context("Failed to get current directory"))
    })?;
    let pal = PalHandle::new(RealPal::new(current_dir));

    let config_path = FilePath::from(cli.config.as_str());
    let mut config = if pal.file_exists(&config_path)? {
        load_config(&pal, &config_path)?
    } else {
        info!(path = %config_path, "no configuration file, using defaults");
        Config::default()
    };
    if let Commands::Start { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }

    let mut app = Application::new(pal, config).with_console(true);
    let web: Vec<Arc<dyn Middleware>> = vec![Arc::new(TraceRequests)];
    app.router.middleware_group("web", web);
    LivewireServiceProvider::new(
        Arc::new(UnsupportedMessageHandler),
        Arc::new(ComponentMarkupDirectives),
    )
    .boot(&mut app)?;

    let (name, args) = match cli.command {
        Commands::Routes { json } => {
            let summaries = app.router.summaries();
            if json {
                let output = serde_json::to_string_pretty(&summaries)
                    .map_err(|e| livewire_base::err!("Failed to serialize routes: {}", e))?;
                println!("{}", output);
            } else {
                for summary in &summaries {
                    println!("{}", summary);
                }
            }
            return Ok(());
        }
        Commands::Make { name } => ("livewire:make", vec![name]),
        Commands::Start { .. } => ("livewire:start", Vec::new()),
        Commands::Watch => ("livewire:watch", Vec::new()),
    };

    let outcome = app.run_command(name, &args)?;
    println!("{}", outcome.message());
    outcome.wait();
    Ok(())
}
