/* 📖 # Why do console commands return an outcome instead of blocking?

`livewire:start` and `livewire:watch` run until the process is stopped. Blocking inside
the command would make them untestable, so they start their background work through
the PAL and return `CommandOutcome::Running`; the CLI then calls `wait()`. Tests run the
same command against MockPal and inspect the server or watch it registered.
*/

mod make;
mod start;
mod watch;

pub use make::{MakeCommand, component_view_path};
pub use start::StartCommand;
pub use watch::{DocChange, WatchCommand, classify_doc_change};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::info;

use livewire_base::{LivewireResult, PalHandle};

use crate::config::Config;
use crate::docs::DocPage;
use crate::router::Router;

/// Everything a command may use from the booted application.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub pal: PalHandle,
    pub config: Config,
    pub router: Router,
    pub doc_pages: Vec<DocPage>,
}

/// Result of running a console command.
#[derive(Debug)]
pub enum CommandOutcome {
    /// The command finished; the message is meant for the user.
    Completed(String),
    /// Background work is running until `stop` is set.
    Running {
        description: String,
        stop: Arc<AtomicBool>,
    },
}

impl CommandOutcome {
    pub fn message(&self) -> &str {
        match self {
            CommandOutcome::Completed(message) => message,
            CommandOutcome::Running { description, .. } => description,
        }
    }

    /// Block until a running command is stopped. Returns immediately for completed ones.
    pub fn wait(&self) {
        if let CommandOutcome::Running { stop, description } = self {
            info!(%description, "running until stopped");
            while !stop.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(200));
            }
        }
    }
}

/// A console command, invoked by name with positional arguments.
pub trait ConsoleCommand: std::fmt::Debug + Send + Sync + 'static {
    /// Name including the `livewire:` namespace.
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn run(&self, context: &CommandContext, args: &[String]) -> LivewireResult<CommandOutcome>;
}

/// Commands available to the console, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Arc<dyn ConsoleCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Arc<dyn ConsoleCommand>) {
        self.commands.insert(command.name(), command);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ConsoleCommand>> {
        self.commands.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn run(
        &self,
        name: &str,
        context: &CommandContext,
        args: &[String],
    ) -> LivewireResult<CommandOutcome> {
        let command = self.get(name).ok_or_else(|| {
            livewire_base::err!(
                "Unknown command '{}' (available: {})",
                name,
                self.names().join(", ")
            )
        })?;
        info!(command = name, ?args, "running console command");
        command.run(context, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livewire_base::MockPal;

    #[derive(Debug)]
    struct Echo;

    impl ConsoleCommand for Echo {
        fn name(&self) -> &'static str {
            "livewire:echo"
        }

        fn description(&self) -> &'static str {
            "Echo the arguments"
        }

        fn run(&self, _context: &CommandContext, args: &[String]) -> LivewireResult<CommandOutcome> {
            Ok(CommandOutcome::Completed(args.join(" ")))
        }
    }

    fn context() -> CommandContext {
        CommandContext {
            pal: PalHandle::new(MockPal::new()),
            config: Config::default(),
            router: Router::new(),
            doc_pages: Vec::new(),
        }
    }

    #[test]
    fn test_run_by_name() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Echo));

        let outcome = registry
            .run("livewire:echo", &context(), &["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(outcome.message(), "a b");
        outcome.wait();
    }

    #[test]
    fn test_unknown_command() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Echo));

        let error = registry.run("livewire:nope", &context(), &[]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unknown command 'livewire:nope' (available: livewire:echo)"
        );
    }

    #[test]
    fn test_wait_returns_once_stopped() {
        let stop = Arc::new(AtomicBool::new(true));
        let outcome = CommandOutcome::Running {
            description: "serving".to_string(),
            stop,
        };
        outcome.wait();
        assert_eq!(outcome.message(), "serving");
    }
}
