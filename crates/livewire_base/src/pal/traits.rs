use std::io::{Read, Write};
use std::sync::Arc;

use crate::{LivewireError, LivewireResult};

use super::file_path::FilePath;
use super::http::{HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService};

/// File change event delivered to watch callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    /// Files that changed, relative to the PAL base directory.
    pub changed_files: Vec<FilePath>,
}

/// Callback invoked when watched files change.
pub type FileChangeCallback = Box<dyn Fn(FileChangeEvent) + Send + Sync>;

/* 📖 # Why is Pal a trait instead of a struct?

The docs routes read markdown, templates and stylesheets, the renderer calls a remote
API, the start command binds a socket and the watch command subscribes to filesystem
events. Routing all of that through one trait lets every one of those paths run against
MockPal in unit tests, with RealPal as the only place that touches std::fs, notify,
tiny_http and reqwest.
*/

/// Platform Abstraction Layer (PAL) trait.
///
/// Two implementations are provided:
/// - `RealPal`: real filesystem, tiny_http server, reqwest client, notify watcher
/// - `MockPal`: in-memory implementation for testing
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Check if a file or directory exists at the given path.
    fn file_exists(&self, path: &FilePath) -> LivewireResult<bool>;

    /// Open a file for reading.
    fn read_file(&self, path: &FilePath) -> LivewireResult<Box<dyn Read + 'static>>;

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, path: &FilePath) -> LivewireResult<String> {
        let mut reader = self.read_file(path)?;
        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .map_err(|e| Box::new(LivewireError::file_error(path.as_path(), e)))?;
        String::from_utf8(contents).map_err(|_e| crate::err!("File is not valid UTF-8: {}", path))
    }

    /// Create a new file, overwriting if it exists.
    fn create_file(&self, path: &FilePath) -> LivewireResult<Box<dyn Write>>;

    /// Create a directory and all parent directories.
    fn create_directory_all(&self, path: &FilePath) -> LivewireResult<()>;

    /// List the files directly inside `path` whose names match any of the glob patterns.
    ///
    /// The listing is not recursive and is sorted by path.
    fn list_directory(&self, path: &FilePath, globs: &[String]) -> LivewireResult<Vec<FilePath>>;

    /// Watch a directory for changes to files matching the glob patterns.
    ///
    /// Returns immediately; the callback is invoked from a background thread.
    fn watch_directory(
        &self,
        directory: &FilePath,
        globs: &[String],
        callback: FileChangeCallback,
    ) -> LivewireResult<()>;

    /// Start an HTTP server handing every request to `service`.
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> LivewireResult<HttpServerHandle>;

    /// Send an outbound HTTP request. The request target is the absolute URL.
    ///
    /// Any response that arrives is returned as `Ok`, whatever its status; only
    /// transport failures are errors.
    fn send_http_request(&self, request: HttpRequest) -> LivewireResult<HttpResponse>;
}

/// Handle to a PAL implementation, enabling shared ownership.
///
/// # Examples
///
/// ```no_run
/// use livewire_base::{RealPal, PalHandle};
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let pal_clone = pal.clone();
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
