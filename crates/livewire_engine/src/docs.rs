/* 📖 # Why discover documentation pages at boot?

The routes table is fixed once the provider has booted, so the set of pages, their
slugs, titles and navigation order is computed once from the docs directory listing.
Page bodies are not kept: each request reads the markdown again, which means an edited
page is served fresh while the checksum-keyed render cache absorbs unchanged ones.
*/

use tracing::{debug, info, instrument, warn};

use livewire_base::{FilePath, LivewireResult, PalHandle, ResultExt};

use crate::config::DocsConfig;

/// A documentation page found in the docs directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPage {
    /// Markdown source file.
    pub file: FilePath,
    /// Numeric prefix of the file name; pages are listed in ascending order.
    pub order: u64,
    /// Remainder of the file name, used as the last URL segment.
    pub slug: String,
    /// Route path, `<route_prefix>/<slug>`.
    pub path: String,
    pub title: String,
}

impl DocPage {
    pub fn nav_link(&self) -> NavLink {
        NavLink {
            path: self.path.clone(),
            title: self.title.clone(),
        }
    }
}

/// Navigation entry rendered into every documentation page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub path: String,
    pub title: String,
}

/// Split `<order>_<slug>.md` into its order and slug.
///
/// Returns `None` for names that do not follow the pattern, e.g. `readme.md`.
pub fn parse_doc_filename(file_name: &str) -> Option<(u64, String)> {
    let re = regex::Regex::new(r"^([0-9]+)_(.+)\.md$").ok()?;
    let captures = re.captures(file_name)?;
    let order = match captures[1].parse::<u64>() {
        Ok(order) => order,
        Err(e) => {
            warn!(file_name, error = %e, "documentation order prefix out of range");
            return None;
        }
    };
    Some((order, captures[2].to_string()))
}

/// Title of a markdown document: its first non-empty line with one leading `#` removed.
///
/// Only the first `#` goes, so a `## Quick Start` opening line keeps one of its marks.
pub fn extract_title(markdown: &str) -> String {
    markdown
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix('#').unwrap_or(line).trim().to_string())
        .unwrap_or_default()
}

/// Build the route path for a slug under `prefix`.
pub fn doc_route_path(prefix: &str, slug: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), slug)
}

/// Scan the docs directory and return its pages in navigation order.
///
/// # Examples
/// ```no_run
/// use livewire_base::{RealPal, PalHandle};
/// use livewire_engine::{Config, discover_doc_pages};
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let pages = discover_doc_pages(&pal, &Config::default().docs).unwrap();
/// for page in &pages {
///     println!("{} -> {}", page.path, page.title);
/// }
/// ```
#[instrument(skip(pal, config), fields(directory = %config.directory))]
pub fn discover_doc_pages(pal: &PalHandle, config: &DocsConfig) -> LivewireResult<Vec<DocPage>> {
    let directory = FilePath::from(config.directory.as_str());
    let files = pal
        .list_directory(&directory, &["*.md".to_string()])
        .with_context(|| format!("Failed to list documentation directory '{}'", directory))?;

    let mut pages = Vec::new();
    for file in files {
        let Some(file_name) = file.file_name() else {
            continue;
        };
        let Some((order, slug)) = parse_doc_filename(file_name) else {
            debug!(file = %file, "skipping file without an order prefix");
            continue;
        };
        let markdown = pal
            .read_file_to_string(&file)
            .with_context(|| format!("Failed to read documentation page {}", file))?;
        let title = extract_title(&markdown);
        debug!(file = %file, order, slug = %slug, title = %title, "found documentation page");
        pages.push(DocPage {
            path: doc_route_path(&config.route_prefix, &slug),
            file,
            order,
            slug,
            title,
        });
    }

    // stable: equal orders keep listing order
    pages.sort_by_key(|page| page.order);
    info!(count = pages.len(), "documentation pages discovered");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use livewire_base::MockPal;

    fn pal_with_docs(files: &[(&str, &str)]) -> PalHandle {
        let mock = MockPal::new();
        mock.add_directory(FilePath::from("docs"));
        for (path, content) in files {
            mock.add_file(FilePath::from(*path), *content);
        }
        PalHandle::new(mock)
    }

    #[test]
    fn test_parse_doc_filename() {
        assert_eq!(parse_doc_filename("01_intro.md"), Some((1, "intro".to_string())));
        assert_eq!(
            parse_doc_filename("10_getting_started.md"),
            Some((10, "getting_started".to_string()))
        );
        assert_eq!(parse_doc_filename("readme.md"), None);
        assert_eq!(parse_doc_filename("my_notes.md"), None);
        assert_eq!(parse_doc_filename("01_.md"), None);
        assert_eq!(parse_doc_filename("01_intro.txt"), None);
        assert_eq!(parse_doc_filename("99999999999999999999999_big.md"), None);
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(extract_title("# Introduction\n\nWelcome"), "Introduction");
        assert_eq!(extract_title("## Quick Start  \nbody"), "# Quick Start");
        assert_eq!(extract_title("  #  Spaced out \n"), "Spaced out");
        assert_eq!(extract_title("\n\n#Events\n"), "Events");
        assert_eq!(extract_title("Plain first line\n# Heading"), "Plain first line");
        assert_eq!(extract_title(""), "");
    }

    #[test]
    fn test_doc_route_path() {
        assert_eq!(doc_route_path("/livewire/docs", "intro"), "/livewire/docs/intro");
        assert_eq!(doc_route_path("/manual/", "intro"), "/manual/intro");
    }

    #[test]
    fn test_discover_sorts_by_numeric_order() {
        let pal = pal_with_docs(&[
            ("docs/10_events.md", "# Events\n"),
            ("docs/02_quickstart.md", "# Quickstart\n"),
            ("docs/01_intro.md", "# Introduction\n"),
            ("docs/readme.md", "# Not a page\n"),
            ("docs/template.css", "body {}"),
        ]);

        let pages = discover_doc_pages(&pal, &DocsConfig::default()).unwrap();
        let summary: Vec<String> = pages
            .iter()
            .map(|p| format!("{} {} {} ({})", p.order, p.path, p.title, p.file))
            .collect();
        expect![[r#"
            1 /livewire/docs/intro Introduction (docs/01_intro.md)
            2 /livewire/docs/quickstart Quickstart (docs/02_quickstart.md)
            10 /livewire/docs/events Events (docs/10_events.md)"#]]
        .assert_eq(&summary.join("\n"));
    }

    #[test]
    fn test_equal_orders_keep_listing_order() {
        let pal = pal_with_docs(&[
            ("docs/1_beta.md", "# Beta\n"),
            ("docs/01_alpha.md", "# Alpha\n"),
            ("docs/0_zero.md", "# Zero\n"),
        ]);

        let pages = discover_doc_pages(&pal, &DocsConfig::default()).unwrap();
        let slugs: Vec<&str> = pages.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["zero", "alpha", "beta"]);
    }

    #[test]
    fn test_custom_route_prefix() {
        let pal = pal_with_docs(&[("docs/01_intro.md", "# Introduction\n")]);
        let config = DocsConfig {
            route_prefix: "/manual".to_string(),
            ..DocsConfig::default()
        };

        let pages = discover_doc_pages(&pal, &config).unwrap();
        assert_eq!(pages[0].path, "/manual/intro");
        assert_eq!(
            pages[0].nav_link(),
            NavLink {
                path: "/manual/intro".to_string(),
                title: "Introduction".to_string()
            }
        );
    }

    #[test]
    fn test_empty_directory_has_no_pages() {
        let pal = pal_with_docs(&[]);
        let pages = discover_doc_pages(&pal, &DocsConfig::default()).unwrap();
        assert!(pages.is_empty());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let pal = PalHandle::new(MockPal::new());
        let error = discover_doc_pages(&pal, &DocsConfig::default()).unwrap_err();
        assert!(
            error
                .to_string()
                .starts_with("Failed to list documentation directory 'docs'")
        );
    }
}
