/* 📖 # Why an exact-match route table?

The provider only ever registers fixed paths: one per documentation page, the message
endpoint and full-page component routes. A Vec of routes matched on method and exact
path covers that, keeps registration order for listings, and makes the difference
between an unknown path (404) and a known path with the wrong method (405) explicit.

Extension points mirror what a host framework offers: named middleware groups attached
to routes by name, and macros registered through mixins that add new registration
methods to the router or new modifiers to a route.
*/

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use livewire_base::pal::http::{HttpMethod, HttpRequest, HttpResponse, HttpService};
use livewire_base::{LivewireResult, ResultExt};

use crate::middleware::{Middleware, Next};

/// Produces the response for a matched route.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, request: &HttpRequest) -> LivewireResult<HttpResponse>;
}

impl<F> RequestHandler for F
where
    F: Fn(&HttpRequest) -> LivewireResult<HttpResponse> + Send + Sync + 'static,
{
    fn handle(&self, request: &HttpRequest) -> LivewireResult<HttpResponse> {
        self(request)
    }
}

/// A named extension method on the router, e.g. `livewire(uri, component)`.
pub type RouterMacro = Arc<dyn Fn(&mut Router, &[&str]) -> LivewireResult<()> + Send + Sync>;

/// A named modifier on a single route, e.g. `layout(name)`.
pub type RouteMacro = Arc<dyn Fn(&mut Route, &[&str]) -> LivewireResult<()> + Send + Sync>;

/// Supplies router macros, registered with [`Router::mixin`].
pub trait RouterMixin {
    fn router_macros(&self) -> Vec<(&'static str, RouterMacro)>;
}

/// Supplies route macros, registered with [`Router::route_mixin`].
pub trait RouteMixin {
    fn route_macros(&self) -> Vec<(&'static str, RouteMacro)>;
}

/// A registered route.
#[derive(Clone)]
pub struct Route {
    method: HttpMethod,
    path: String,
    action: String,
    handler: Arc<dyn RequestHandler>,
    middleware: Vec<String>,
    attributes: BTreeMap<String, String>,
}

impl Route {
    pub fn new(
        method: HttpMethod,
        path: impl Into<String>,
        action: impl Into<String>,
        handler: impl RequestHandler,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            action: action.into(),
            handler: Arc::new(handler),
            middleware: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Human readable name of the handler, shown in route listings.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Attach a middleware group by name. Groups run in the order they were attached.
    pub fn middleware(&mut self, name: impl Into<String>) -> &mut Self {
        self.middleware.push(name.into());
        self
    }

    pub fn middleware_names(&self) -> &[String] {
        &self.middleware
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            method: self.method.to_string(),
            path: self.path.clone(),
            action: self.action.clone(),
            middleware: self.middleware.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("action", &self.action)
            .field("middleware", &self.middleware)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Serializable description of a route, used by the `routes` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub method: String,
    pub path: String,
    pub action: String,
    pub middleware: Vec<String>,
    pub attributes: BTreeMap<String, String>,
}

impl std::fmt::Display for RouteSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:<6} {}  {}", self.method, self.path, self.action)?;
        if !self.middleware.is_empty() {
            write!(f, "  [{}]", self.middleware.join(", "))?;
        }
        for (key, value) in &self.attributes {
            write!(f, "  {}={}", key, value)?;
        }
        Ok(())
    }
}

/// The route table with its middleware groups and macros.
///
/// Cloning is cheap: handlers, middleware and macros are shared.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
    middleware_groups: BTreeMap<String, Vec<Arc<dyn Middleware>>>,
    macros: BTreeMap<String, RouterMacro>,
    route_macros: BTreeMap<String, RouteMacro>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. A route with the same method and path is replaced in place.
    pub fn add_route(&mut self, route: Route) -> &mut Route {
        let index = match self.position(route.method, &route.path) {
            Some(index) => {
                debug!(method = %route.method, path = %route.path, "replacing route");
                self.routes[index] = route;
                index
            }
            None => {
                debug!(method = %route.method, path = %route.path, action = %route.action, "registering route");
                self.routes.push(route);
                self.routes.len() - 1
            }
        };
        &mut self.routes[index]
    }

    pub fn get(
        &mut self,
        path: impl Into<String>,
        action: impl Into<String>,
        handler: impl RequestHandler,
    ) -> &mut Route {
        self.add_route(Route::new(HttpMethod::Get, path, action, handler))
    }

    pub fn post(
        &mut self,
        path: impl Into<String>,
        action: impl Into<String>,
        handler: impl RequestHandler,
    ) -> &mut Route {
        self.add_route(Route::new(HttpMethod::Post, path, action, handler))
    }

    /// Routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, method: HttpMethod, path: &str) -> Option<&Route> {
        self.position(method, path).map(|index| &self.routes[index])
    }

    pub fn route_mut(&mut self, method: HttpMethod, path: &str) -> Option<&mut Route> {
        self.position(method, path)
            .map(move |index| &mut self.routes[index])
    }

    pub fn summaries(&self) -> Vec<RouteSummary> {
        self.routes.iter().map(Route::summary).collect()
    }

    fn position(&self, method: HttpMethod, path: &str) -> Option<usize> {
        self.routes
            .iter()
            .position(|route| route.method == method && route.path == path)
    }

    /// Define (or redefine) a named middleware group.
    pub fn middleware_group(&mut self, name: impl Into<String>, middleware: Vec<Arc<dyn Middleware>>) {
        self.middleware_groups.insert(name.into(), middleware);
    }

    pub fn has_middleware_group(&self, name: &str) -> bool {
        self.middleware_groups.contains_key(name)
    }

    /// Register every macro a mixin supplies. Existing macros with the same name are replaced.
    pub fn mixin(&mut self, mixin: &dyn RouterMixin) {
        for (name, router_macro) in mixin.router_macros() {
            debug!(name, "registering router macro");
            self.macros.insert(name.to_string(), router_macro);
        }
    }

    pub fn route_mixin(&mut self, mixin: &dyn RouteMixin) {
        for (name, route_macro) in mixin.route_macros() {
            debug!(name, "registering route macro");
            self.route_macros.insert(name.to_string(), route_macro);
        }
    }

    pub fn has_macro(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn has_route_macro(&self, name: &str) -> bool {
        self.route_macros.contains_key(name)
    }

    /// Invoke a router macro by name.
    pub fn call_macro(&mut self, name: &str, args: &[&str]) -> LivewireResult<()> {
        let router_macro = self
            .macros
            .get(name)
            .cloned()
            .ok_or_else(|| livewire_base::err!("Router macro '{}' is not registered", name))?;
        router_macro(self, args).with_context(|| format!("Router macro '{}' failed", name))
    }

    /// Invoke a route macro on the route registered for `method` and `path`.
    pub fn call_route_macro(
        &mut self,
        method: HttpMethod,
        path: &str,
        name: &str,
        args: &[&str],
    ) -> LivewireResult<()> {
        let route_macro = self
            .route_macros
            .get(name)
            .cloned()
            .ok_or_else(|| livewire_base::err!("Route macro '{}' is not registered", name))?;
        let route = self
            .route_mut(method, path)
            .ok_or_else(|| livewire_base::err!("No route registered for {} {}", method, path))?;
        route_macro(route, args).with_context(|| format!("Route macro '{}' failed", name))
    }

    /// Route a request: 404 for an unknown path, 405 for a known path with another method.
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub fn dispatch(&self, request: &HttpRequest) -> LivewireResult<HttpResponse> {
        let path = request.path();
        let Some(route) = self.route(request.method(), path) else {
            let allowed: Vec<&str> = self
                .routes
                .iter()
                .filter(|route| route.path == path)
                .map(|route| route.method.as_str())
                .collect();
            if allowed.is_empty() {
                debug!("no route matched");
                return Ok(HttpResponse::not_found().with_body("Not Found"));
            }
            debug!(?allowed, "method not allowed");
            return Ok(HttpResponse::method_not_allowed()
                .with_header("Allow", allowed.join(", "))
                .with_body("Method Not Allowed"));
        };

        let mut chain: Vec<Arc<dyn Middleware>> = Vec::new();
        for name in &route.middleware {
            let group = self.middleware_groups.get(name).ok_or_else(|| {
                livewire_base::err!("Middleware group '{}' is not defined", name)
            })?;
            chain.extend(group.iter().cloned());
        }
        debug!(action = %route.action, middleware = chain.len(), "dispatching");
        Next::new(&chain, route.handler.as_ref()).run(request)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("middleware_groups", &self.middleware_groups.keys().collect::<Vec<_>>())
            .field("macros", &self.macros.keys().collect::<Vec<_>>())
            .field("route_macros", &self.route_macros.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HttpService for Router {
    fn handle_request(&self, request: HttpRequest) -> LivewireResult<HttpResponse> {
        self.dispatch(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use livewire_base::pal::http::HttpStatusCode;
    use parking_lot::Mutex;

    fn text(body: &'static str) -> impl RequestHandler {
        move |_request: &HttpRequest| -> LivewireResult<HttpResponse> { Ok(HttpResponse::text(body)) }
    }

    #[derive(Debug)]
    struct Tag {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Tag {
        fn handle(&self, request: &HttpRequest, next: Next<'_>) -> LivewireResult<HttpResponse> {
            self.log.lock().push(format!("before {}", self.name));
            let response = next.run(request);
            self.log.lock().push(format!("after {}", self.name));
            response
        }
    }

    #[test]
    fn test_dispatch_exact_match() {
        let mut router = Router::new();
        router.get("/livewire/docs/intro", "docs", text("intro"));

        let response = router
            .dispatch(&HttpRequest::new(HttpMethod::Get, "/livewire/docs/intro?x=1"))
            .unwrap();
        assert_eq!(response.body().to_string_lossy(), "intro");

        let missing = router
            .dispatch(&HttpRequest::new(HttpMethod::Get, "/livewire/docs/intro/"))
            .unwrap();
        assert_eq!(missing.status(), HttpStatusCode::NOT_FOUND);
    }

    #[test]
    fn test_dispatch_wrong_method() {
        let mut router = Router::new();
        router.post("/livewire/message", "message", text("ok"));

        let response = router
            .dispatch(&HttpRequest::new(HttpMethod::Get, "/livewire/message"))
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get("allow"), Some("POST"));
    }

    #[test]
    fn test_middleware_runs_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        router.middleware_group(
            "web",
            vec![
                Arc::new(Tag { name: "session", log: Arc::clone(&log) }),
                Arc::new(Tag { name: "csrf", log: Arc::clone(&log) }),
            ],
        );
        router.middleware_group(
            "api",
            vec![Arc::new(Tag { name: "throttle", log: Arc::clone(&log) })],
        );
        let handler_log = Arc::clone(&log);
        router
            .post(
                "/livewire/message",
                "message",
                move |_request: &HttpRequest| -> LivewireResult<HttpResponse> {
                    handler_log.lock().push("handler".to_string());
                    Ok(HttpResponse::ok())
                },
            )
            .middleware("web")
            .middleware("api");

        router
            .dispatch(&HttpRequest::new(HttpMethod::Post, "/livewire/message"))
            .unwrap();
        expect![[r#"
            before session
            before csrf
            before throttle
            handler
            after throttle
            after csrf
            after session"#]]
        .assert_eq(&log.lock().join("\n"));
    }

    #[test]
    fn test_undefined_middleware_group_is_an_error() {
        let mut router = Router::new();
        router.post("/livewire/message", "message", text("ok")).middleware("web");

        let error = router
            .dispatch(&HttpRequest::new(HttpMethod::Post, "/livewire/message"))
            .unwrap_err();
        assert_eq!(error.to_string(), "Middleware group 'web' is not defined");
    }

    #[test]
    fn test_reregistering_replaces_in_place() {
        let mut router = Router::new();
        router.get("/a", "first", text("1"));
        router.get("/b", "b", text("b"));
        router.get("/a", "second", text("2"));

        let paths: Vec<(&str, &str)> = router
            .routes()
            .iter()
            .map(|route| (route.path(), route.action()))
            .collect();
        assert_eq!(paths, vec![("/a", "second"), ("/b", "b")]);
    }

    struct Greeting;

    impl RouterMixin for Greeting {
        fn router_macros(&self) -> Vec<(&'static str, RouterMacro)> {
            let greet: RouterMacro = Arc::new(|router: &mut Router, args: &[&str]| {
                let [path, name] = args else {
                    livewire_base::bail!("greet expects a path and a name");
                };
                let body = format!("hello {}", name);
                router.get(
                    *path,
                    "greet",
                    move |_request: &HttpRequest| -> LivewireResult<HttpResponse> {
                        Ok(HttpResponse::text(body.clone()))
                    },
                );
                Ok(())
            });
            vec![("greet", greet)]
        }
    }

    impl RouteMixin for Greeting {
        fn route_macros(&self) -> Vec<(&'static str, RouteMacro)> {
            let tag: RouteMacro = Arc::new(|route: &mut Route, args: &[&str]| {
                route.set_attribute("tag", args.join(","));
                Ok(())
            });
            vec![("tag", tag)]
        }
    }

    #[test]
    fn test_router_and_route_macros() {
        let mut router = Router::new();
        router.mixin(&Greeting);
        router.route_mixin(&Greeting);
        assert!(router.has_macro("greet"));
        assert!(router.has_route_macro("tag"));

        router.call_macro("greet", &["/hello", "world"]).unwrap();
        router
            .call_route_macro(HttpMethod::Get, "/hello", "tag", &["a", "b"])
            .unwrap();

        let response = router
            .dispatch(&HttpRequest::new(HttpMethod::Get, "/hello"))
            .unwrap();
        assert_eq!(response.body().to_string_lossy(), "hello world");
        assert_eq!(
            router.route(HttpMethod::Get, "/hello").unwrap().attribute("tag"),
            Some("a,b")
        );
    }

    #[test]
    fn test_macro_errors() {
        let mut router = Router::new();
        router.mixin(&Greeting);

        let error = router.call_macro("greet", &["/hello"]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Router macro 'greet' failed: greet expects a path and a name"
        );
        assert!(router.call_macro("missing", &[]).is_err());
        assert!(
            router
                .call_route_macro(HttpMethod::Get, "/nowhere", "tag", &[])
                .is_err()
        );
    }

    #[test]
    fn test_route_summary_display() {
        let mut router = Router::new();
        router
            .post("/livewire/message", "message", text("ok"))
            .middleware("web")
            .set_attribute("layout", "app");

        expect!["POST   /livewire/message  message  [web]  layout=app"]
            .assert_eq(&router.summaries()[0].to_string());
    }
}
