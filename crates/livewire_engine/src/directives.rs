/* 📖 # How are directives compiled?

Templates mark component boundaries with `@livewire('counter')`, listeners with
`@on('saved')` and close components with `@endlivewire`. The registry maps each
directive name to a function of its raw argument text and expands every occurrence in
one left-to-right pass. Arguments may contain nested parentheses; `@@name` escapes a
literal `@name`. Names that are not registered are copied through untouched.
*/

use std::collections::BTreeMap;
use std::sync::Arc;

use pulldown_cmark_escape::escape_html;
use tracing::debug;

/// Produces the markup for the three component directives.
pub trait DirectiveHandler: std::fmt::Debug + Send + Sync + 'static {
    fn livewire(&self, expression: &str) -> String;
    fn on(&self, expression: &str) -> String;
    fn endlivewire(&self, expression: &str) -> String;
}

/// A directive body: raw argument text in, markup out.
pub type Directive = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Named template directives.
#[derive(Clone, Default)]
pub struct DirectiveRegistry {
    directives: BTreeMap<String, Directive>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directive, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, directive: Directive) {
        let name = name.into();
        debug!(name = %name, "registering directive");
        self.directives.insert(name, directive);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.directives.keys().map(String::as_str).collect()
    }

    /// Expand a single directive, if registered.
    pub fn render(&self, name: &str, expression: &str) -> Option<String> {
        self.directives.get(name).map(|directive| directive(expression))
    }

    /// Expand every registered directive occurring in `source`.
    pub fn compile(&self, source: &str) -> String {
        let mut output = String::with_capacity(source.len());
        let mut rest = source;
        while let Some(at) = rest.find('@') {
            let consumed = source.len() - rest.len() + at;
            output.push_str(&rest[..at]);
            let after = &rest[at + 1..];

            // `@` glued to a word, as in an email address, is plain text
            if source[..consumed].chars().next_back().is_some_and(is_word_char) {
                output.push('@');
                rest = after;
                continue;
            }

            if let Some(escaped) = after.strip_prefix('@') {
                let name_length = identifier_length(escaped);
                if name_length > 0 {
                    output.push('@');
                    output.push_str(&escaped[..name_length]);
                    rest = &escaped[name_length..];
                } else {
                    output.push_str("@@");
                    rest = escaped;
                }
                continue;
            }

            let name_length = identifier_length(after);
            let name = &after[..name_length];
            let Some(directive) = self.directives.get(name).filter(|_| name_length > 0) else {
                output.push('@');
                rest = after;
                continue;
            };

            let remainder = &after[name_length..];
            match remainder.strip_prefix('(').and_then(balanced_arguments) {
                Some(expression) => {
                    output.push_str(&directive(expression));
                    rest = &remainder[expression.len() + 2..];
                }
                None => {
                    output.push_str(&directive(""));
                    rest = remainder;
                }
            }
        }
        output.push_str(rest);
        output
    }
}

impl std::fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectiveRegistry")
            .field("directives", &self.names())
            .finish()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn identifier_length(text: &str) -> usize {
    text.char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(text.len(), |(index, _)| index)
}

/// Text up to the parenthesis closing an already opened one, if it is closed.
fn balanced_arguments(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        match (quote, c) {
            (Some(_), _) if escaped => escaped = false,
            (Some(_), '\\') => escaped = true,
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') if depth == 0 => return Some(&text[..index]),
            (None, ')') => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Strip one pair of matching surrounding quotes.
pub fn unquote(expression: &str) -> &str {
    let trimmed = expression.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    trimmed
}

/// Renders component boundaries as `wire:` attributed markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComponentMarkupDirectives;

impl DirectiveHandler for ComponentMarkupDirectives {
    fn livewire(&self, expression: &str) -> String {
        let mut html = String::from("<div wire:component=\"");
        let _ = escape_html(&mut html, unquote(expression));
        html.push_str("\">");
        html
    }

    fn on(&self, expression: &str) -> String {
        let mut html = String::from("<template wire:on=\"");
        let _ = escape_html(&mut html, unquote(expression));
        html.push_str("\"></template>");
        html
    }

    fn endlivewire(&self, _expression: &str) -> String {
        "</div>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    fn registry() -> DirectiveRegistry {
        let handler: Arc<dyn DirectiveHandler> = Arc::new(ComponentMarkupDirectives);
        let mut registry = DirectiveRegistry::new();
        let livewire = Arc::clone(&handler);
        registry.register("livewire", Arc::new(move |e: &str| livewire.livewire(e)));
        let on = Arc::clone(&handler);
        registry.register("on", Arc::new(move |e: &str| on.on(e)));
        registry.register("endlivewire", Arc::new(move |e: &str| handler.endlivewire(e)));
        registry
    }

    #[test]
    fn test_compile_component_template() {
        let compiled = registry().compile(
            "<main>\n@livewire('counter')\n  @on(\"saved\")\n@endlivewire\n</main>\n",
        );
        expect![[r#"
            <main>
            <div wire:component="counter">
              <template wire:on="saved"></template>
            </div>
            </main>
        "#]]
        .assert_eq(&compiled);
    }

    #[test]
    fn test_nested_parentheses_and_quotes() {
        let mut registry = DirectiveRegistry::new();
        registry.register("raw", Arc::new(|e: &str| format!("[{}]", e)));

        assert_eq!(registry.compile("@raw(f(a, (b)))!"), "[f(a, (b))]!");
        assert_eq!(registry.compile("@raw(')' . \"(\")x"), "[')' . \"(\"]x");
        assert_eq!(registry.compile("@raw(unclosed"), "[](unclosed");
        assert_eq!(
            registry.compile("@raw('it\\'s (fine)')x"),
            "['it\\'s (fine)']x"
        );
        assert_eq!(registry.compile("@raw(\"a\\\\\")b"), "[\"a\\\\\"]b");
        assert_eq!(registry.compile("@raw"), "[]");
    }

    #[test]
    fn test_unregistered_and_escaped_names_pass_through() {
        let registry = registry();
        assert_eq!(
            registry.compile("mail me@example.com @if($x) @@livewire('a') @ end"),
            "mail me@example.com @if($x) @livewire('a') @ end"
        );
        assert_eq!(registry.compile("@livewire2"), "@livewire2");
    }

    #[test]
    fn test_at_sign_inside_a_word_is_text() {
        let registry = registry();
        assert_eq!(
            registry.compile("Contact team@livewire.dev or dev_@on"),
            "Contact team@livewire.dev or dev_@on"
        );
        assert_eq!(
            registry.compile("<p>@livewire('a')</p>(@endlivewire)"),
            "<p><div wire:component=\"a\"></p>(</div>)"
        );
    }

    #[test]
    fn test_render_and_names() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["endlivewire", "livewire", "on"]);
        assert_eq!(
            registry.render("livewire", "'todo-list'").as_deref(),
            Some("<div wire:component=\"todo-list\">")
        );
        assert_eq!(registry.render("missing", ""), None);
    }

    #[test]
    fn test_markup_is_escaped() {
        assert_eq!(
            ComponentMarkupDirectives.on("'a\"b'"),
            "<template wire:on=\"a&quot;b\"></template>"
        );
        assert_eq!(unquote("  \"x\" "), "x");
        assert_eq!(unquote("$name"), "$name");
    }
}
