/* 📖 # Why is the page layout compiled in?

The page layout ships with the crate, like the docs it frames, so it is an askama
template checked at compile time: the title and nav titles are HTML-escaped by askama,
the stylesheet and the rendered markdown go in verbatim. The stylesheet stays a file
read per request, so restyling does not need a rebuild.
*/

use askama::Template;
use pulldown_cmark_escape::escape_href;

use livewire_base::LivewireResult;

use crate::docs::NavLink;

/// Values rendered into a documentation page.
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    pub title: &'a str,
    /// Inlined verbatim, inside a `<style>` element.
    pub css: &'a str,
    /// Rendered HTML, inserted verbatim.
    pub content: &'a str,
    pub links: &'a [NavLink],
}

#[derive(Template)]
#[template(path = "doc_page.html")]
struct DocPageTemplate<'a> {
    title: &'a str,
    css: &'a str,
    content: &'a str,
    links: Vec<NavItem<'a>>,
}

struct NavItem<'a> {
    /// Already escaped for an attribute value.
    href: String,
    title: &'a str,
}

/// Render a full documentation page.
pub fn render_page(context: &PageContext<'_>) -> LivewireResult<String> {
    let links = context
        .links
        .iter()
        .map(|link| {
            let mut href = String::new();
            let _ = escape_href(&mut href, &link.path);
            NavItem {
                href,
                title: &link.title,
            }
        })
        .collect();
    DocPageTemplate {
        title: context.title,
        css: context.css,
        content: context.content,
        links,
    }
    .render()
    .map_err(|e| livewire_base::err!("Failed to render page template: {}", e))
}
