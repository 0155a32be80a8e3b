use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use globset::GlobSet;
use parking_lot::Mutex;

use crate::{LivewireError, LivewireResult};

use super::FilePath;
use super::build_glob_set;
use super::http::{HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService};
use super::traits::{FileChangeCallback, FileChangeEvent, Pal};

/* 📖 # Why does MockPal record outbound requests and watch callbacks?

The behaviours worth testing here are interactions with the outside world: whether a
docs page hit the markdown API or the cache, which headers went out, which routes a
file change maps to. MockPal keeps files in memory, answers outbound HTTP through a
stub handler while recording every request, and lets a test fire watch callbacks
by hand with `trigger_file_change`.
*/

/// Stub for outbound HTTP calls made through [`Pal::send_http_request`].
pub type OutboundHttpHandler = Arc<dyn Fn(&HttpRequest) -> LivewireResult<HttpResponse> + Send + Sync>;

struct Watch {
    directory: FilePath,
    glob_set: GlobSet,
    callback: Arc<dyn Fn(FileChangeEvent) + Send + Sync>,
}

/// In-memory PAL implementation for testing.
///
/// # Examples
///
/// ```
/// use livewire_base::{MockPal, Pal, FilePath};
///
/// let mock = MockPal::new();
/// mock.add_file(FilePath::from("docs/01_intro.md"), b"# Intro".to_vec());
/// let content = mock.read_file_to_string(&FilePath::from("docs/01_intro.md")).unwrap();
/// assert_eq!(content, "# Intro");
/// ```
#[derive(Clone)]
pub struct MockPal {
    files: Arc<Mutex<BTreeMap<FilePath, Vec<u8>>>>,
    directories: Arc<Mutex<BTreeSet<FilePath>>>,
    http_servers: Arc<Mutex<HashMap<u16, Arc<dyn HttpService>>>>,
    next_port: Arc<AtomicU16>,
    watches: Arc<Mutex<Vec<Watch>>>,
    http_handler: Arc<Mutex<Option<OutboundHttpHandler>>>,
    outbound_requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockPal {
    /// Create a new empty MockPal.
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(BTreeMap::new())),
            directories: Arc::new(Mutex::new(BTreeSet::new())),
            http_servers: Arc::new(Mutex::new(HashMap::new())),
            next_port: Arc::new(AtomicU16::new(10000)),
            watches: Arc::new(Mutex::new(Vec::new())),
            http_handler: Arc::new(Mutex::new(None)),
            outbound_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a file to the mock storage.
    pub fn add_file(&self, path: FilePath, content: impl Into<Vec<u8>>) {
        self.files.lock().insert(path, content.into());
    }

    /// Add a directory to the mock storage.
    pub fn add_directory(&self, path: FilePath) {
        self.directories.lock().insert(path);
    }

    /// Raw content of a file, if present.
    pub fn file_content(&self, path: &FilePath) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }

    /// Answer outbound HTTP requests with `handler`.
    pub fn set_http_handler(
        &self,
        handler: impl Fn(&HttpRequest) -> LivewireResult<HttpResponse> + Send + Sync + 'static,
    ) {
        *self.http_handler.lock() = Some(Arc::new(handler));
    }

    /// Every outbound request sent so far, oldest first.
    pub fn outbound_requests(&self) -> Vec<HttpRequest> {
        self.outbound_requests.lock().clone()
    }

    pub fn outbound_request_count(&self) -> usize {
        self.outbound_requests.lock().len()
    }

    /// Simulate an HTTP request to a server started through this PAL.
    pub fn simulate_request(&self, port: u16, request: HttpRequest) -> LivewireResult<HttpResponse> {
        let service = self
            .http_servers
            .lock()
            .get(&port)
            .cloned()
            .ok_or_else(|| crate::err!("No HTTP server registered on port {}", port))?;
        service.handle_request(request)
    }

    /// Get the number of registered HTTP servers.
    pub fn http_server_count(&self) -> usize {
        self.http_servers.lock().len()
    }

    /// Number of active directory watches.
    pub fn watch_count(&self) -> usize {
        self.watches.lock().len()
    }

    /// Deliver a change notification for `files` to every watch covering them.
    ///
    /// Each watch only sees the files inside its directory that match its globs.
    pub fn trigger_file_change(&self, files: &[FilePath]) {
        let deliveries: Vec<_> = self
            .watches
            .lock()
            .iter()
            .filter_map(|watch| {
                let changed_files: Vec<FilePath> = files
                    .iter()
                    .filter(|file| {
                        file.strip_prefix(&watch.directory)
                            .is_some_and(|relative| watch.glob_set.is_match(relative.as_path()))
                    })
                    .cloned()
                    .collect();
                (!changed_files.is_empty())
                    .then(|| (Arc::clone(&watch.callback), FileChangeEvent { changed_files }))
            })
            .collect();
        for (callback, event) in deliveries {
            callback(event);
        }
    }

    fn directory_exists(&self, path: &FilePath) -> bool {
        if path.is_root() || self.directories.lock().contains(path) {
            return true;
        }
        self.files
            .lock()
            .keys()
            .any(|file| file != path && file.strip_prefix(path).is_some())
    }

    fn not_found(path: &FilePath, what: &str) -> Box<LivewireError> {
        Box::new(LivewireError::file_error(
            path.as_path(),
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found: {}", what, path),
            ),
        ))
    }
}

impl Default for MockPal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockPal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPal")
            .field("files", &self.files.lock().len())
            .field("directories", &self.directories.lock().len())
            .field("http_servers", &self.http_servers.lock().len())
            .field("watches", &self.watches.lock().len())
            .finish()
    }
}

impl Pal for MockPal {
    fn file_exists(&self, path: &FilePath) -> LivewireResult<bool> {
        Ok(self.files.lock().contains_key(path) || self.directory_exists(path))
    }

    fn read_file(&self, path: &FilePath) -> LivewireResult<Box<dyn Read + 'static>> {
        let content = self
            .files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path, "File"))?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn create_file(&self, path: &FilePath) -> LivewireResult<Box<dyn Write>> {
        Ok(Box::new(MockFileWriter {
            path: path.clone(),
            files: Arc::clone(&self.files),
            buffer: Vec::new(),
        }))
    }

    fn create_directory_all(&self, path: &FilePath) -> LivewireResult<()> {
        let mut directories = self.directories.lock();
        let mut current = Some(path.clone());
        while let Some(directory) = current {
            current = directory.parent();
            directories.insert(directory);
        }
        Ok(())
    }

    fn list_directory(&self, path: &FilePath, globs: &[String]) -> LivewireResult<Vec<FilePath>> {
        let glob_set = build_glob_set(globs)?;
        if !self.directory_exists(path) {
            return Err(Self::not_found(path, "Directory"));
        }
        // BTreeMap keys are already sorted
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|file| {
                file.strip_prefix(path).is_some_and(|relative| {
                    !relative.as_relative().as_str().contains('/')
                        && glob_set.is_match(relative.as_path())
                })
            })
            .cloned()
            .collect())
    }

    fn watch_directory(
        &self,
        directory: &FilePath,
        globs: &[String],
        callback: FileChangeCallback,
    ) -> LivewireResult<()> {
        let glob_set = build_glob_set(globs)?;
        if !self.directory_exists(directory) {
            return Err(Self::not_found(directory, "Directory"));
        }
        self.watches.lock().push(Watch {
            directory: directory.clone(),
            glob_set,
            callback: Arc::from(callback),
        });
        Ok(())
    }

    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> LivewireResult<HttpServerHandle> {
        let port = match config.port {
            Some(port) => port,
            None => self.next_port.fetch_add(1, Ordering::SeqCst),
        };
        let mut servers = self.http_servers.lock();
        if servers.contains_key(&port) {
            return Err(crate::err!("Port {} is already in use", port));
        }
        servers.insert(port, Arc::from(service));
        Ok(HttpServerHandle::new(port))
    }

    fn send_http_request(&self, request: HttpRequest) -> LivewireResult<HttpResponse> {
        self.outbound_requests.lock().push(request.clone());
        let handler = self.http_handler.lock().clone();
        match handler {
            Some(handler) => handler(&request),
            None => Err(Box::new(LivewireError::http(
                None,
                format!("no outbound HTTP handler configured for {}", request.target()),
            ))),
        }
    }
}

/// Writer that stores its buffer in the mock storage when dropped.
struct MockFileWriter {
    path: FilePath,
    files: Arc<Mutex<BTreeMap<FilePath, Vec<u8>>>>,
    buffer: Vec<u8>,
}

impl Write for MockFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for MockFileWriter {
    fn drop(&mut self) {
        self.files
            .lock()
            .insert(self.path.clone(), std::mem::take(&mut self.buffer));
    }
}
