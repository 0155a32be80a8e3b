/* 📖 # Why render markdown remotely?

Pages are rendered by the GitHub markdown API so they look exactly like the README on
GitHub, without shipping a markdown engine. The call is slow and rate limited, so the
renderer is wrapped in a cache keyed by a checksum of the source: an unchanged page is
rendered once per TTL window, an edited page gets a new key and is rendered again.
*/

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use livewire_base::pal::http::{HttpMethod, HttpRequest};
use livewire_base::{LivewireError, LivewireResult, PalHandle, ResultExt};

use crate::config::MarkdownConfig;

/// Turns markdown source into HTML.
pub trait MarkdownRenderer: std::fmt::Debug + Send + Sync + 'static {
    fn render(&self, markdown: &str) -> LivewireResult<String>;
}

impl<R: MarkdownRenderer + ?Sized> MarkdownRenderer for Arc<R> {
    fn render(&self, markdown: &str) -> LivewireResult<String> {
        (**self).render(markdown)
    }
}

/// Hex SHA-256 checksum of the markdown source, used as the cache key.
pub fn markdown_checksum(markdown: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(markdown.as_bytes());
    let bytes = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for b in bytes {
        let _ = write!(hex, "{b:02x}");
    }
    hex
}

/// Renders through a GitHub-compatible `markdown/raw` endpoint.
#[derive(Debug, Clone)]
pub struct GithubMarkdownRenderer {
    pal: PalHandle,
    api_url: String,
    user_agent: String,
}

impl GithubMarkdownRenderer {
    pub fn new(pal: PalHandle, config: &MarkdownConfig) -> Self {
        Self {
            pal,
            api_url: config.api_url.clone(),
            user_agent: config.user_agent.clone(),
        }
    }
}

impl MarkdownRenderer for GithubMarkdownRenderer {
    #[instrument(skip(self, markdown), fields(api_url = %self.api_url, bytes = markdown.len()))]
    fn render(&self, markdown: &str) -> LivewireResult<String> {
        let request = HttpRequest::new(HttpMethod::Post, self.api_url.as_str())
            .with_header("Content-Type", "text/x-markdown")
            .with_header("User-Agent", self.user_agent.as_str())
            .with_body(markdown);
        let response = self
            .pal
            .send_http_request(request)
            .context("Failed to reach the markdown API")?;

        let status = response.status();
        if !status.is_success() {
            return Err(Box::new(LivewireError::http(
                Some(status.as_u16()),
                format!(
                    "markdown API answered {}: {}",
                    status,
                    response.body().to_string_lossy()
                ),
            )));
        }
        debug!(status = status.as_u16(), "markdown rendered");
        Ok(response.body().to_string_lossy())
    }
}

/// Memoises another renderer for a fixed time, keyed by [`markdown_checksum`].
///
/// Failed renders are not cached. Entries expire `ttl` after they were stored and the
/// cache never holds more than `max_capacity` pages, so keys of edited pages age out.
/// Concurrent misses for the same page each call the inner renderer.
pub struct CachedMarkdownRenderer<R> {
    inner: R,
    cache: Cache<String, String>,
}

impl<R: MarkdownRenderer> CachedMarkdownRenderer<R> {
    pub fn new(inner: R, ttl: Duration, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn cache(&self) -> &Cache<String, String> {
        &self.cache
    }
}

impl<R: MarkdownRenderer> std::fmt::Debug for CachedMarkdownRenderer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedMarkdownRenderer")
            .field("inner", &self.inner)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl<R: MarkdownRenderer> MarkdownRenderer for CachedMarkdownRenderer<R> {
    fn render(&self, markdown: &str) -> LivewireResult<String> {
        let key = markdown_checksum(markdown);
        if let Some(html) = self.cache.get(&key) {
            debug!(%key, "render cache hit");
            return Ok(html);
        }
        debug!(%key, "render cache miss");
        let html = self.inner.render(markdown)?;
        self.cache.insert(key, html.clone());
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use expect_test::expect;
    use livewire_base::MockPal;
    use livewire_base::pal::http::{HttpResponse, HttpStatusCode};

    fn github_pal() -> MockPal {
        let mock = MockPal::new();
        mock.set_http_handler(|request| {
            let markdown = request.body().to_string_lossy();
            let title = markdown.trim_start_matches('#').trim();
            Ok(HttpResponse::ok().with_body(format!("<h1>{}</h1>\n", title)))
        });
        mock
    }

    #[test]
    fn test_checksum_is_hex_sha256() {
        expect!["e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"]
            .assert_eq(&markdown_checksum(""));
        assert_ne!(markdown_checksum("# A"), markdown_checksum("# B"));
    }

    #[test]
    fn test_github_request_shape() {
        let mock = github_pal();
        let renderer =
            GithubMarkdownRenderer::new(PalHandle::new(mock.clone()), &MarkdownConfig::default());

        let html = renderer.render("# Introduction").unwrap();
        assert_eq!(html, "<h1>Introduction</h1>\n");

        let requests = mock.outbound_requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method(), HttpMethod::Post);
        assert_eq!(request.target(), "https://api.github.com/markdown/raw");
        assert_eq!(request.headers().get("content-type"), Some("text/x-markdown"));
        assert_eq!(request.headers().get("user-agent"), Some("Livewire Docs"));
        assert_eq!(request.body().to_string_lossy(), "# Introduction");
    }

    #[test]
    fn test_github_error_status() {
        let mock = MockPal::new();
        mock.set_http_handler(|_request| {
            Ok(HttpResponse::new(HttpStatusCode::FORBIDDEN).with_body("rate limit exceeded"))
        });
        let renderer =
            GithubMarkdownRenderer::new(PalHandle::new(mock), &MarkdownConfig::default());

        let error = renderer.render("# Intro").unwrap_err();
        expect!["HTTP error (status 403): markdown API answered 403 Forbidden: rate limit exceeded"]
            .assert_eq(&error.to_string());
    }

    #[test]
    fn test_github_transport_error() {
        let renderer = GithubMarkdownRenderer::new(
            PalHandle::new(MockPal::new()),
            &MarkdownConfig::default(),
        );
        let error = renderer.render("# Intro").unwrap_err();
        assert!(error.to_string().starts_with("Failed to reach the markdown API: HTTP error"));
    }

    #[test]
    fn test_cached_renderer_calls_api_once() {
        let mock = github_pal();
        let renderer = CachedMarkdownRenderer::new(
            GithubMarkdownRenderer::new(PalHandle::new(mock.clone()), &MarkdownConfig::default()),
            Duration::from_secs(60),
            100,
        );

        let first = renderer.render("# Introduction").unwrap();
        let second = renderer.render("# Introduction").unwrap();
        assert_eq!(first, second);
        assert_eq!(mock.outbound_request_count(), 1);

        renderer.render("# Quickstart").unwrap();
        assert_eq!(mock.outbound_request_count(), 2);
        assert!(renderer.cache().contains_key(&markdown_checksum("# Introduction")));
        assert!(renderer.cache().contains_key(&markdown_checksum("# Quickstart")));
    }

    #[test]
    fn test_cached_renderer_does_not_cache_failures() {
        let mock = MockPal::new();
        let renderer = CachedMarkdownRenderer::new(
            GithubMarkdownRenderer::new(PalHandle::new(mock.clone()), &MarkdownConfig::default()),
            Duration::from_secs(60),
            100,
        );

        assert!(renderer.render("# Introduction").is_err());
        assert!(!renderer.cache().contains_key(&markdown_checksum("# Introduction")));

        mock.set_http_handler(|_request| Ok(HttpResponse::ok().with_body("<h1>Introduction</h1>")));
        assert_eq!(renderer.render("# Introduction").unwrap(), "<h1>Introduction</h1>");
        assert_eq!(mock.outbound_request_count(), 2);
    }

    #[test]
    fn test_cached_renderer_keeps_empty_success() {
        let mock = MockPal::new();
        mock.set_http_handler(|_request| Ok(HttpResponse::ok()));
        let renderer = CachedMarkdownRenderer::new(
            GithubMarkdownRenderer::new(PalHandle::new(mock.clone()), &MarkdownConfig::default()),
            Duration::from_secs(60),
            100,
        );

        assert_eq!(renderer.render("").unwrap(), "");
        assert_eq!(renderer.render("").unwrap(), "");
        assert_eq!(mock.outbound_request_count(), 1);
    }

    #[test]
    fn test_expired_entries_render_again() {
        let mock = github_pal();
        let renderer = CachedMarkdownRenderer::new(
            GithubMarkdownRenderer::new(PalHandle::new(mock.clone()), &MarkdownConfig::default()),
            Duration::from_millis(100),
            100,
        );

        renderer.render("# Intro").unwrap();
        renderer.render("# Intro").unwrap();
        assert_eq!(mock.outbound_request_count(), 1);

        thread::sleep(Duration::from_millis(250));
        renderer.render("# Intro").unwrap();
        assert_eq!(mock.outbound_request_count(), 2);
    }

    #[test]
    fn test_expired_keys_are_dropped_from_the_cache() {
        let mock = github_pal();
        let renderer = CachedMarkdownRenderer::new(
            GithubMarkdownRenderer::new(PalHandle::new(mock.clone()), &MarkdownConfig::default()),
            Duration::from_millis(100),
            1000,
        );

        for revision in 0..200 {
            renderer.render(&format!("# Intro, revision {}", revision)).unwrap();
        }
        thread::sleep(Duration::from_millis(250));
        renderer.render("# Intro, latest").unwrap();

        renderer.cache().run_pending_tasks();
        assert_eq!(renderer.cache().entry_count(), 1);
    }

    #[test]
    fn test_cache_is_bounded() {
        let mock = github_pal();
        let renderer = CachedMarkdownRenderer::new(
            GithubMarkdownRenderer::new(PalHandle::new(mock.clone()), &MarkdownConfig::default()),
            Duration::from_secs(60),
            10,
        );

        for page in 0..50 {
            renderer.render(&format!("# Page {}", page)).unwrap();
        }
        renderer.cache().run_pending_tasks();
        assert!(renderer.cache().entry_count() <= 10);
    }
}
