use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::{LivewireError, LivewireResult};

use super::FilePath;
use super::build_glob_set;
use super::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService,
    HttpStatusCode,
};
use super::traits::{FileChangeCallback, FileChangeEvent, Pal};

/* 📖 # Why stay synchronous?

Every request is served on its own thread and the one slow operation, the markdown API
call on a cache miss, simply blocks that thread. std::fs, tiny_http and reqwest's
blocking client cover that model without pulling an async runtime into the engine.
*/

/// PAL implementation backed by the operating system.
///
/// All file paths are resolved relative to a configured base directory.
pub struct RealPal {
    base_dir: PathBuf,
    watchers: Mutex<Vec<RecommendedWatcher>>,
    http_client: Mutex<Option<reqwest::blocking::Client>>,
}

impl RealPal {
    /// Create a new RealPal rooted at `base_dir`.
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            watchers: Mutex::new(Vec::new()),
            http_client: Mutex::new(None),
        }
    }

    /// Resolve a FilePath to a filesystem path.
    fn resolve_path(&self, path: &FilePath) -> PathBuf {
        if path.is_root() {
            self.base_dir.clone()
        } else {
            self.base_dir.join(path.as_path())
        }
    }

    fn not_found(path: PathBuf, what: &str) -> Box<LivewireError> {
        Box::new(LivewireError::file_error(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("{} not found", what)),
        ))
    }

    fn http_client(&self) -> LivewireResult<reqwest::blocking::Client> {
        let mut slot = self.http_client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| Box::new(LivewireError::http(None, format!("failed to build client: {}", e))))?;
        *slot = Some(client.clone());
        Ok(client)
    }
}

impl std::fmt::Debug for RealPal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealPal")
            .field("base_dir", &self.base_dir)
            .field("watchers", &self.watchers.lock().len())
            .finish()
    }
}

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn file_exists(&self, path: &FilePath) -> LivewireResult<bool> {
        let resolved = self.resolve_path(path);
        let exists = resolved.exists();
        debug!(exists, resolved = %resolved.display(), "checked file existence");
        Ok(exists)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn read_file(&self, path: &FilePath) -> LivewireResult<Box<dyn Read + 'static>> {
        let resolved = self.resolve_path(path);
        let file = fs::File::open(&resolved).map_err(|e| {
            debug!(error = %e, "failed to open file");
            Box::new(LivewireError::file_error(resolved.clone(), e))
        })?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_file(&self, path: &FilePath) -> LivewireResult<Box<dyn Write>> {
        let resolved = self.resolve_path(path);
        let file = fs::File::create(&resolved)
            .map_err(|e| Box::new(LivewireError::file_error(resolved.clone(), e)))?;
        debug!(resolved = %resolved.display(), "file created");
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_directory_all(&self, path: &FilePath) -> LivewireResult<()> {
        let resolved = self.resolve_path(path);
        fs::create_dir_all(&resolved)
            .map_err(|e| Box::new(LivewireError::file_error(resolved.clone(), e)))?;
        debug!(resolved = %resolved.display(), "directory created");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path, globs = ?globs))]
    fn list_directory(&self, path: &FilePath, globs: &[String]) -> LivewireResult<Vec<FilePath>> {
        let resolved = self.resolve_path(path);
        if !resolved.is_dir() {
            debug!(resolved = %resolved.display(), "directory not found");
            return Err(Self::not_found(resolved, "directory"));
        }

        let glob_set = build_glob_set(globs)?;
        let mut files = Vec::new();
        for entry in WalkDir::new(&resolved).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let failed_path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| resolved.clone());
                Box::new(LivewireError::file_error(
                    failed_path,
                    std::io::Error::other(e.to_string()),
                ))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if glob_set.is_match(name.as_ref()) {
                files.push(path.join(name.as_ref()));
            }
        }
        files.sort();
        debug!(count = files.len(), "listed directory");
        Ok(files)
    }

    #[instrument(skip(self, callback), fields(directory = %directory, globs = ?globs))]
    fn watch_directory(
        &self,
        directory: &FilePath,
        globs: &[String],
        callback: FileChangeCallback,
    ) -> LivewireResult<()> {
        let resolved = self.resolve_path(directory);
        if !resolved.is_dir() {
            return Err(Self::not_found(resolved, "directory"));
        }

        let glob_set = build_glob_set(globs)?;
        let watched_dir = resolved.clone();
        let base = directory.clone();
        let mut watcher = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    let changed_files: Vec<FilePath> = event
                        .paths
                        .iter()
                        .filter_map(|p| p.strip_prefix(&watched_dir).ok())
                        .filter(|relative| glob_set.is_match(relative))
                        .map(|relative| base.join(relative.to_string_lossy()))
                        .collect();
                    if !changed_files.is_empty() {
                        callback(FileChangeEvent { changed_files });
                    }
                }
                Err(e) => warn!(error = %e, "file watch error"),
            },
        )
        .map_err(|e| crate::err!("Failed to create file watcher: {}", e))?;

        watcher
            .watch(&resolved, RecursiveMode::NonRecursive)
            .map_err(|e| crate::err!("Failed to watch {}: {}", resolved.display(), e))?;
        self.watchers.lock().push(watcher);
        info!(resolved = %resolved.display(), "watching directory");
        Ok(())
    }

    #[instrument(skip(self, service), fields(address = %config.address()))]
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> LivewireResult<HttpServerHandle> {
        let server = tiny_http::Server::http(config.address()).map_err(|e| {
            crate::err!("Failed to bind HTTP server on {}: {}", config.address(), e)
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| crate::err!("HTTP server is not listening on an IP address"))?;

        let handle = HttpServerHandle::new(port);
        let shutdown = Arc::clone(handle.shutdown_flag());
        let service: Arc<dyn HttpService> = Arc::from(service);
        let server_name: Arc<str> = Arc::from(config.server_name.as_str());
        info!(
            server = %config.server_name,
            address = %handle.address(&config.host),
            "HTTP server listening"
        );

        std::thread::spawn(move || {
            while !shutdown.load(Ordering::SeqCst) {
                match server.recv_timeout(Duration::from_millis(100)) {
                    Ok(Some(request)) => {
                        let service = Arc::clone(&service);
                        let server_name = Arc::clone(&server_name);
                        std::thread::spawn(move || {
                            serve_request(service.as_ref(), request, &server_name)
                        });
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "failed to receive HTTP request"),
                }
            }
            info!(port, "HTTP server stopped");
        });

        Ok(handle)
    }

    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.target()))]
    fn send_http_request(&self, request: HttpRequest) -> LivewireResult<HttpResponse> {
        let client = self.http_client()?;
        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|e| crate::err!("Invalid HTTP method: {}", e))?;

        let mut builder = client.request(method, request.target());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }
        let response = builder
            .body(request.body().as_bytes().to_vec())
            .send()
            .map_err(|e| {
                Box::new(
                    LivewireError::http(None, e.to_string())
                        .context(format!("{} {}", request.method(), request.target())),
                )
            })?;

        let status = HttpStatusCode::from(response.status().as_u16());
        let mut result = HttpResponse::new(status);
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                result.headers_mut().insert(name.as_str(), value);
            }
        }
        let body = response
            .bytes()
            .map_err(|e| Box::new(LivewireError::http(Some(status.as_u16()), e.to_string())))?;
        debug!(status = status.as_u16(), bytes = body.len(), "outbound request complete");
        Ok(result.with_body(body.to_vec()))
    }
}

/// Convert a tiny_http request, run it through the service and write the response.
fn serve_request(service: &dyn HttpService, mut request: tiny_http::Request, server_name: &str) {
    let url = request.url().to_string();
    let Some(method) = HttpMethod::parse(request.method().as_str()) else {
        let _ = request.respond(tiny_http::Response::empty(405));
        return;
    };

    let mut body = Vec::new();
    if let Err(e) = request.as_reader().read_to_end(&mut body) {
        warn!(url = %url, error = %e, "failed to read request body");
        let _ = request.respond(tiny_http::Response::empty(400));
        return;
    }

    let mut pal_request = HttpRequest::new(method, url.clone()).with_body(body);
    for header in request.headers() {
        pal_request
            .headers_mut()
            .insert(header.field.as_str().as_str(), header.value.as_str());
    }

    let response = match service.handle_request(pal_request) {
        Ok(response) => response,
        Err(e) => {
            warn!(method = %method, url = %url, error = %e, "request failed");
            HttpResponse::new(HttpStatusCode::SERVICE_FAILURE)
                .with_content_type("text/plain; charset=utf-8")
                .with_body(e.to_string())
        }
    };
    debug!(method = %method, url = %url, status = response.status().as_u16(), "request served");

    let status = response.status().as_u16();
    let headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    let mut reply = tiny_http::Response::from_data(response.into_body().into_bytes())
        .with_status_code(status);
    for (name, value) in headers {
        match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => reply.add_header(header),
            Err(()) => warn!(header = %name, "dropping invalid response header"),
        }
    }
    if let Ok(header) = tiny_http::Header::from_bytes("Server", server_name.as_bytes()) {
        reply.add_header(header);
    }
    if let Err(e) = request.respond(reply) {
        warn!(url = %url, error = %e, "failed to write response");
    }
}
