/* 📖 # What does livewire:watch report?

Page bodies are read on every request, so an edited page is live as soon as it is saved.
What cannot change without a restart is the route table: a new file has no route yet,
a deleted file leaves a route that now fails, and a changed title leaves the navigation
stale. The watcher maps each changed markdown file onto those cases and logs them, so
the developer knows when a restart is needed.
*/

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use livewire_base::pal::FileChangeEvent;
use livewire_base::{FilePath, LivewireResult, PalHandle, ResultExt};

use super::{CommandContext, CommandOutcome, ConsoleCommand};
use crate::config::DocsConfig;
use crate::docs::{DocPage, doc_route_path, extract_title, parse_doc_filename};

/// How a changed file affects the documentation routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocChange {
    /// A registered page was edited.
    Updated {
        path: String,
        title: String,
        title_changed: bool,
    },
    /// A page file appeared that has no route yet.
    Added { path: String },
    /// A registered page's file is gone.
    Removed { path: String },
    /// Not a documentation page.
    Ignored,
}

/// Work out what a change to `file` means for the registered `pages`.
pub fn classify_doc_change(
    pal: &PalHandle,
    config: &DocsConfig,
    pages: &[DocPage],
    file: &FilePath,
) -> LivewireResult<DocChange> {
    let Some((_order, slug)) = file.file_name().and_then(parse_doc_filename) else {
        return Ok(DocChange::Ignored);
    };
    let registered = pages.iter().find(|page| &page.file == file);
    let exists = pal.file_exists(file)?;
    Ok(match (registered, exists) {
        (Some(page), true) => {
            let markdown = pal
                .read_file_to_string(file)
                .with_context(|| format!("Failed to read changed page {}", file))?;
            let title = extract_title(&markdown);
            DocChange::Updated {
                path: page.path.clone(),
                title_changed: title != page.title,
                title,
            }
        }
        (Some(page), false) => DocChange::Removed {
            path: page.path.clone(),
        },
        (None, true) => DocChange::Added {
            path: doc_route_path(&config.route_prefix, &slug),
        },
        (None, false) => DocChange::Ignored,
    })
}

/// Observer notified of every classified change.
pub type DocChangeObserver = Arc<dyn Fn(&DocChange) + Send + Sync>;

/// `livewire:watch`: watch the docs directory and report affected routes.
#[derive(Clone)]
pub struct WatchCommand {
    debounce: Duration,
    observer: Option<DocChangeObserver>,
}

impl WatchCommand {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: DocChangeObserver) -> Self {
        self.observer = Some(observer);
        self
    }
}

impl Default for WatchCommand {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

impl std::fmt::Debug for WatchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchCommand")
            .field("debounce", &self.debounce)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl ConsoleCommand for WatchCommand {
    fn name(&self) -> &'static str {
        "livewire:watch"
    }

    fn description(&self) -> &'static str {
        "Watch the documentation directory and report affected routes"
    }

    fn run(&self, context: &CommandContext, args: &[String]) -> LivewireResult<CommandOutcome> {
        if !args.is_empty() {
            livewire_base::bail!("livewire:watch takes no arguments");
        }
        let directory = FilePath::from(context.config.docs.directory.as_str());
        let debouncer = Arc::new(Mutex::new(Debouncer::new(self.debounce)));
        let pal = context.pal.clone();
        let docs_config = context.config.docs.clone();
        let pages = context.doc_pages.clone();
        let observer = self.observer.clone();

        let callback = Box::new(move |event: FileChangeEvent| {
            for changed_file in event.changed_files {
                if !debouncer.lock().should_process(&changed_file) {
                    continue;
                }
                match classify_doc_change(&pal, &docs_config, &pages, &changed_file) {
                    Ok(change) => {
                        report(&changed_file, &change);
                        if let Some(observer) = &observer {
                            observer(&change);
                        }
                    }
                    Err(e) => warn!(file = %changed_file, error = %e, "failed to inspect changed file"),
                }
            }
        });
        context
            .pal
            .watch_directory(&directory, &["*.md".to_string()], callback)
            .with_context(|| format!("Failed to watch documentation directory '{}'", directory))?;

        info!(directory = %directory, pages = context.doc_pages.len(), "watching documentation");
        Ok(CommandOutcome::Running {
            description: format!("Watching {} for changes", directory),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }
}

fn report(file: &FilePath, change: &DocChange) {
    match change {
        DocChange::Updated {
            path,
            title,
            title_changed: false,
        } => info!(file = %file, route = %path, title = %title, "page updated, served fresh on next request"),
        DocChange::Updated {
            path,
            title,
            title_changed: true,
        } => warn!(file = %file, route = %path, title = %title, "page title changed, restart to refresh navigation"),
        DocChange::Added { path } => {
            warn!(file = %file, route = %path, "new page, restart to register its route")
        }
        DocChange::Removed { path } => {
            warn!(file = %file, route = %path, "page removed, its route fails until restart")
        }
        DocChange::Ignored => debug!(file = %file, "ignoring change"),
    }
}

/// Drops repeated events for the same file within a time window.
///
/// Editors often save a file several times in quick succession.
struct Debouncer {
    last_events: HashMap<FilePath, Instant>,
    debounce_duration: Duration,
}

impl Debouncer {
    fn new(debounce_duration: Duration) -> Self {
        Self {
            last_events: HashMap::new(),
            debounce_duration,
        }
    }

    /// Returns true if enough time has passed since the last event for this file.
    fn should_process(&mut self, file_path: &FilePath) -> bool {
        let now = Instant::now();

        if let Some(last_time) = self.last_events.get(file_path)
            && now.duration_since(*last_time) < self.debounce_duration
        {
            debug!(file = %file_path, "debouncing file change event");
            return false;
        }

        self.last_events.insert(file_path.clone(), now);
        true
    }
}
