use std::sync::Arc;

use livewire_base::LivewireResult;
use livewire_base::pal::http::{HttpRequest, HttpResponse};

use crate::directives::DirectiveHandler;
use crate::router::{Route, RouteMacro, RouteMixin, Router, RouterMacro, RouterMixin};

/// Adds `livewire(uri, component)` to the router: a GET route rendering the component
/// as a full page.
#[derive(Debug, Clone)]
pub struct ComponentRouterMacros {
    directives: Arc<dyn DirectiveHandler>,
}

impl ComponentRouterMacros {
    pub fn new(directives: Arc<dyn DirectiveHandler>) -> Self {
        Self { directives }
    }
}

impl RouterMixin for ComponentRouterMacros {
    fn router_macros(&self) -> Vec<(&'static str, RouterMacro)> {
        let directives = Arc::clone(&self.directives);
        let livewire: RouterMacro = Arc::new(move |router: &mut Router, args: &[&str]| {
            let [uri, component] = args else {
                livewire_base::bail!(
                    "livewire expects a uri and a component name, got {} arguments",
                    args.len()
                );
            };
            router.get(
                *uri,
                format!("livewire:{}", component),
                ComponentPage {
                    component: component.to_string(),
                    directives: Arc::clone(&directives),
                },
            );
            Ok(())
        });
        vec![("livewire", livewire)]
    }
}

/// Full-page component response.
#[derive(Debug)]
struct ComponentPage {
    component: String,
    directives: Arc<dyn DirectiveHandler>,
}

impl crate::router::RequestHandler for ComponentPage {
    fn handle(&self, _request: &HttpRequest) -> LivewireResult<HttpResponse> {
        let html = format!(
            "{}{}",
            self.directives.livewire(&format!("'{}'", self.component)),
            self.directives.endlivewire("")
        );
        Ok(HttpResponse::html(html))
    }
}

/// Adds `layout(name)` and `section(name)` to routes; both are stored as route attributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComponentRouteMacros;

fn attribute_macro(key: &'static str) -> RouteMacro {
    Arc::new(move |route: &mut Route, args: &[&str]| {
        let [value] = args else {
            livewire_base::bail!("{} expects exactly one argument, got {}", key, args.len());
        };
        route.set_attribute(key, *value);
        Ok(())
    })
}

impl RouteMixin for ComponentRouteMacros {
    fn route_macros(&self) -> Vec<(&'static str, RouteMacro)> {
        vec![
            ("layout", attribute_macro("layout")),
            ("section", attribute_macro("section")),
        ]
    }
}
