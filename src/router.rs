//! Ordered route table.
//!
//! Routes are tried in registration order, so registration order is match
//! priority. Nothing is ever unregistered: mounting copies routes in, and
//! prefixes or parameter interceptors rewrite the routes already held.
//!
//! All mutation is setup-time work. [`Router::routes`] freezes a snapshot
//! that is then shared read-only by every request.

use std::sync::Arc;

use tracing::debug;

use crate::compose::Next;
use crate::context::Context;
use crate::dispatch::Routes;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ParamHandler};
use crate::method::Method;
use crate::route::{Pattern, Route, RouteOptions, Target};
use crate::url::{UrlOptions, UrlParams};

/// Router-wide options.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RouterOptions {
    /// Prepended to every route registered or mounted on this router.
    pub prefix: Option<String>,
    /// Inherited by every route registered on this router.
    pub sensitive: bool,
    /// Inherited by every route registered on this router.
    pub strict: bool,
    /// Fixed path to match against instead of the request path.
    pub router_path: Option<String>,
}

/// The routes a path (and method) selects.
#[derive(Clone, Debug, Default)]
pub struct Matched {
    /// Every route whose pattern matches the path, whatever the method.
    pub path: Vec<Arc<Route>>,
    /// The subset that also accepts the method, middleware included.
    pub path_and_method: Vec<Arc<Route>>,
    /// Whether a route with a method set (an endpoint, not middleware) matched.
    pub route: bool,
}

impl Matched {
    /// The last matching endpoint. Later registrations win ties, so
    /// appending a route overrides an earlier one for `matched_route`.
    pub fn most_specific(&self) -> Option<&Arc<Route>> {
        self.path_and_method.iter().rev().find(|r| r.is_terminal())
    }
}

/// Something that can be mounted on a router.
pub enum Mount {
    /// Middleware, registered as a method-less prefix route.
    Handler(BoxedHandler<Context>),
    /// Another router's routes, copied and re-prefixed.
    Router(Vec<Arc<Route>>),
}

impl From<BoxedHandler<Context>> for Mount {
    fn from(handler: BoxedHandler<Context>) -> Self {
        Self::Handler(handler)
    }
}

impl From<&Router> for Mount {
    fn from(router: &Router) -> Self {
        Self::Router(router.stack.clone())
    }
}

impl From<&Routes> for Mount {
    fn from(routes: &Routes) -> Self {
        Self::Router(routes.stack().to_vec())
    }
}

impl From<Routes> for Mount {
    fn from(routes: Routes) -> Self {
        (&routes).into()
    }
}

/// The application route table.
///
/// ```rust
/// use strata::{middleware, Router, RouterOptions};
///
/// let mut users = Router::new();
/// users.get("/:id", [middleware(|ctx, next| Box::pin(async move {
///     let id = ctx.param("id").unwrap_or_default().to_owned();
///     ctx.response.set_text(id);
///     next.run(ctx).await
/// }))]);
///
/// let mut api = Router::with_options(RouterOptions {
///     prefix: Some("/api".into()),
///     ..Default::default()
/// });
/// api.mount_at("/users", &users);
///
/// let matched = api.resolve("/api/users/42", strata::Method::Get);
/// assert!(matched.route);
/// assert_eq!(matched.most_specific().unwrap().path(), "/api/users/:id");
/// ```
#[derive(Clone, Default)]
pub struct Router {
    opts: RouterOptions,
    params: Vec<(String, ParamHandler)>,
    stack: Vec<Arc<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut opts: RouterOptions) -> Self {
        opts.prefix = opts.prefix.map(|p| trim_prefix(&p).to_owned());
        Self { opts, ..Self::default() }
    }

    pub fn router_options(&self) -> &RouterOptions {
        &self.opts
    }

    /// Every route held, in match-priority order.
    pub fn stack(&self) -> &[Arc<Route>] {
        &self.stack
    }

    /// Creates and registers one route per pattern in `target`.
    ///
    /// The router prefix and every parameter interceptor registered so far
    /// are applied to the new routes.
    ///
    /// # Panics
    ///
    /// Panics if a pattern does not compile. Routes are registered once at
    /// startup; a bad pattern is a programming error, not a runtime condition.
    pub fn register(
        &mut self,
        target: impl Into<Target>,
        methods: &[Method],
        handlers: impl IntoIterator<Item = BoxedHandler<Context>>,
        opts: RouteOptions,
    ) -> &mut Self {
        let Target { patterns, name } = target.into();
        let handlers: Vec<_> = handlers.into_iter().collect();
        let opts = RouteOptions {
            name: opts.name.or(name),
            sensitive: opts.sensitive || self.opts.sensitive,
            strict: opts.strict || self.opts.strict,
            ..opts
        };

        for pattern in patterns {
            let mut route = Route::new(pattern, methods, handlers.iter().cloned(), opts.clone())
                .unwrap_or_else(|e| panic!("{e}"));
            if let Some(prefix) = self.opts.prefix.as_deref().filter(|p| !p.is_empty()) {
                prefix_route(&mut route, prefix);
            }
            for (param, handler) in &self.params {
                route.param(param, Arc::clone(handler));
            }
            debug!(path = route.path(), methods = ?route.methods(), name = route.name(), "route registered");
            self.stack.push(Arc::new(route));
        }
        self
    }

    /// Registers `handlers` for every method in [`Method::ALL`].
    pub fn all(
        &mut self,
        target: impl Into<Target>,
        handlers: impl IntoIterator<Item = BoxedHandler<Context>>,
    ) -> &mut Self {
        self.register(target, &Method::ALL, handlers, RouteOptions::default())
    }

    /// Alias for [`Router::delete`].
    pub fn del(
        &mut self,
        target: impl Into<Target>,
        handlers: impl IntoIterator<Item = BoxedHandler<Context>>,
    ) -> &mut Self {
        self.delete(target, handlers)
    }

    /// Mounts middleware or another router at the root.
    ///
    /// Path-less middleware matches every path and binds no parameters of its
    /// own. Like all middleware it only runs when some endpoint matched; on
    /// its own it never makes the router dispatch.
    pub fn mount(&mut self, item: impl Into<Mount>) -> &mut Self {
        match item.into() {
            Mount::Handler(handler) => {
                let opts = RouteOptions {
                    end: false,
                    ignore_captures: true,
                    ..RouteOptions::default()
                };
                self.register("(.*)", &[], [handler], opts)
            }
            Mount::Router(routes) => self.absorb(None, routes),
        }
    }

    /// Mounts middleware or another router under each path of `target`.
    ///
    /// # Panics
    ///
    /// Panics when mounting a router under a regex target: regex patterns
    /// cannot be used as prefixes.
    pub fn mount_at(&mut self, target: impl Into<Target>, item: impl Into<Mount>) -> &mut Self {
        let target = target.into();
        match item.into() {
            Mount::Handler(handler) => {
                let opts = RouteOptions {
                    end: false,
                    ..RouteOptions::default()
                };
                self.register(target, &[], [handler], opts)
            }
            Mount::Router(routes) => {
                for pattern in &target.patterns {
                    let Pattern::Path(path) = pattern else {
                        panic!("cannot mount a router under regex `{}`", pattern.as_str());
                    };
                    self.absorb(Some(path), routes.clone());
                }
                self
            }
        }
    }

    fn absorb(&mut self, path: Option<&str>, routes: Vec<Arc<Route>>) -> &mut Self {
        let prefix = self.opts.prefix.clone().filter(|p| !p.is_empty());
        for mut route in routes {
            let route_mut = Arc::make_mut(&mut route);
            if let Some(path) = path {
                prefix_route(route_mut, path);
            }
            if let Some(prefix) = prefix.as_deref() {
                prefix_route(route_mut, prefix);
            }
            for (param, handler) in &self.params {
                route_mut.param(param, Arc::clone(handler));
            }
            debug!(path = route.path(), mount = path, "route mounted");
            self.stack.push(route);
        }
        self
    }

    /// Sets the router prefix and applies it to every route already held.
    /// A trailing `/` is dropped, so `/things/` and `/things` are the same.
    pub fn prefix(&mut self, prefix: &str) -> &mut Self {
        let prefix = trim_prefix(prefix);
        self.opts.prefix = Some(prefix.to_owned());
        for route in &mut self.stack {
            prefix_route(Arc::make_mut(route), prefix);
        }
        self
    }

    /// Registers a parameter interceptor and splices it into every route,
    /// present and future, whose pattern names `param`.
    ///
    /// ```rust
    /// use strata::{middleware, Router};
    ///
    /// let mut router = Router::new();
    /// router
    ///     .param("user", |id, ctx, next| Box::pin(async move {
    ///         if id.as_deref() == Some("0") {
    ///             ctx.response.set_status(http::StatusCode::NOT_FOUND);
    ///             return Ok(());
    ///         }
    ///         next.run(ctx).await
    ///     }))
    ///     .get("/users/:user", [middleware(|ctx, next| Box::pin(async move {
    ///         next.run(ctx).await
    ///     }))]);
    /// ```
    pub fn param<F>(&mut self, param: &str, f: F) -> &mut Self
    where
        F: for<'a> Fn(Option<String>, &'a mut Context, Next<'a, Context>) -> BoxFuture<'a, Result<(), Error>>
            + Send
            + Sync
            + 'static,
    {
        let handler: ParamHandler = Arc::new(f);
        for route in &mut self.stack {
            Arc::make_mut(route).param(param, Arc::clone(&handler));
        }
        match self.params.iter_mut().find(|(name, _)| name == param) {
            Some((_, slot)) => *slot = handler,
            None => self.params.push((param.to_owned(), handler)),
        }
        self
    }

    /// Looks up a route by name.
    pub fn route(&self, name: &str) -> Option<&Arc<Route>> {
        self.stack.iter().find(|r| r.name() == Some(name))
    }

    /// Generates a URL for the named route.
    ///
    /// ```rust
    /// use strata::{middleware, named, Router, UrlOptions, UrlParams};
    ///
    /// let mut router = Router::new();
    /// router.get(named("user", "/users/:id"), [middleware(|ctx, next| {
    ///     Box::pin(async move { next.run(ctx).await })
    /// })]);
    ///
    /// let href = router.url("user", &UrlParams::positional([3]), &UrlOptions::query("limit=1"));
    /// assert_eq!(href.unwrap(), "/users/3?limit=1");
    /// assert!(router.url("nope", &UrlParams::None, &UrlOptions::default()).is_err());
    /// ```
    pub fn url(&self, name: &str, params: &UrlParams, opts: &UrlOptions) -> Result<String, Error> {
        self.route(name)
            .ok_or_else(|| Error::RouteNotFound(name.to_owned()))?
            .url(params, opts)
    }

    /// Selects the routes that apply to `path` and `method`, in order.
    pub fn resolve(&self, path: &str, method: Method) -> Matched {
        let mut matched = Matched::default();
        for route in self.stack.iter().filter(|r| r.is_match(path)) {
            matched.path.push(Arc::clone(route));
            if route.allows(method) {
                matched.path_and_method.push(Arc::clone(route));
                matched.route |= route.is_terminal();
            }
        }
        matched
    }

    /// Freezes the router into a handler that dispatches requests.
    ///
    /// Later changes to this router are not seen by the returned handler.
    pub fn routes(&self) -> Routes {
        Routes::new(self.clone())
    }
}

// ── Per-verb registration ─────────────────────────────────────────────────────

macro_rules! verbs {
    ($($fn_name:ident => $method:ident),* $(,)?) => {
        impl Router {
            $(
                #[doc = concat!("Registers a `", stringify!($method), "` route.")]
                pub fn $fn_name(
                    &mut self,
                    target: impl Into<Target>,
                    handlers: impl IntoIterator<Item = BoxedHandler<Context>>,
                ) -> &mut Self {
                    self.register(target, &[Method::$method], handlers, RouteOptions::default())
                }
            )*
        }

        #[cfg(test)]
        const VERBS: &[Method] = &[$(Method::$method),*];
    };
}

verbs! {
    connect    => Connect,
    delete     => Delete,
    get        => Get,
    head       => Head,
    options    => Options,
    patch      => Patch,
    post       => Post,
    put        => Put,
    trace      => Trace,
    copy       => Copy,
    lock       => Lock,
    mkcol      => Mkcol,
    r#move     => Move,
    propfind   => Propfind,
    proppatch  => Proppatch,
    unlock     => Unlock,
    mkcalendar => Mkcalendar,
    report     => Report,
    search     => Search,
    purge      => Purge,
    subscribe  => Subscribe,
}

fn trim_prefix(prefix: &str) -> &str {
    prefix.strip_suffix('/').unwrap_or(prefix)
}

fn prefix_route(route: &mut Route, prefix: &str) {
    if let Err(e) = route.set_prefix(prefix) {
        panic!("invalid route: `{prefix}{}`: {e}", route.path());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::middleware;

    fn noop() -> BoxedHandler<Context> {
        middleware(|ctx, next| Box::pin(async move { next.run(ctx).await }))
    }

    fn paths(routes: &[Arc<Route>]) -> Vec<&str> {
        routes.iter().map(|r| r.path()).collect()
    }

    #[test]
    fn every_method_has_a_verb() {
        assert_eq!(VERBS, Method::ALL);
    }

    #[test]
    fn resolve_separates_path_and_method_matches() {
        let mut router = Router::new();
        router
            .mount(noop())
            .get("/users/:id", [noop()])
            .post("/users/:id", [noop()]);

        let matched = router.resolve("/users/1", Method::Get);
        assert_eq!(paths(&matched.path), ["(.*)", "/users/:id", "/users/:id"]);
        assert_eq!(paths(&matched.path_and_method), ["(.*)", "/users/:id"]);
        assert!(matched.route);

        let matched = router.resolve("/elsewhere", Method::Get);
        assert_eq!(paths(&matched.path_and_method), ["(.*)"]);
        assert!(!matched.route);
    }

    #[test]
    fn most_specific_is_the_last_endpoint() {
        let mut router = Router::new();
        router
            .get(crate::route::named("first", "/:anything"), [noop()])
            .get(crate::route::named("second", "/programming"), [noop()])
            .mount(noop());
        let matched = router.resolve("/programming", Method::Get);
        assert_eq!(matched.most_specific().unwrap().name(), Some("second"));
    }

    #[test]
    fn multiple_paths_register_one_route_each() {
        let mut router = Router::new();
        router.get(["/one", "/two"], [noop()]);
        assert_eq!(paths(router.stack()), ["/one", "/two"]);
    }

    #[test]
    fn all_registers_every_method() {
        let mut router = Router::new();
        router.all("/anything", [noop()]);
        assert_eq!(router.stack()[0].methods(), Method::ALL);
        assert!(router.resolve("/anything", Method::Subscribe).route);
    }

    #[test]
    fn prefix_drops_trailing_slash_and_rewrites_routes() {
        let mut router = Router::new();
        router.get("/", [noop()]).get("/:id", [noop()]);
        router.prefix("/things/");
        assert_eq!(paths(router.stack()), ["/things/", "/things/:id"]);
        assert!(router.resolve("/things/", Method::Get).route);
        assert!(!router.resolve("/things", Method::Get).route);
        assert!(router.resolve("/things/1", Method::Get).route);
        assert_eq!(router.router_options().prefix.as_deref(), Some("/things"));
    }

    #[test]
    fn router_options_are_inherited() {
        let mut router = Router::with_options(RouterOptions { strict: true, sensitive: true, ..Default::default() });
        router.get("/info", [noop()]);
        assert!(router.resolve("/info", Method::Get).route);
        assert!(!router.resolve("/info/", Method::Get).route);
        assert!(!router.resolve("/INFO", Method::Get).route);
    }

    #[test]
    fn mounting_copies_routes_and_leaves_the_source_alone() {
        let mut nested = Router::new();
        nested.get("/first-nested-route", [noop()]);

        let mut parent = Router::with_options(RouterOptions { prefix: Some("/api".into()), ..Default::default() });
        parent.mount_at("/parent-route", &nested);

        assert_eq!(paths(parent.stack()), ["/api/parent-route/first-nested-route"]);
        assert_eq!(paths(nested.stack()), ["/first-nested-route"]);
    }

    #[test]
    fn mount_at_several_paths() {
        let mut router = Router::new();
        router.mount_at(["/users", "/admin"], noop());
        assert!(router.resolve("/users/1", Method::Get).path.len() == 1);
        assert!(router.resolve("/admin", Method::Post).path.len() == 1);
        assert!(router.resolve("/other", Method::Get).path.is_empty());
    }

    #[test]
    fn params_reach_existing_and_mounted_routes() {
        let mut nested = Router::new();
        nested.get("/:user/posts", [noop()]);

        let mut router = Router::new();
        router.get("/:user", [noop()]);
        router.param("user", |_, ctx, next| Box::pin(async move { next.run(ctx).await }));
        router.mount_at("/users", &nested);
        router.get("/profile/:user", [noop()]);

        for route in router.stack() {
            assert_eq!(route.handlers().count(), 2, "{}", route.path());
        }
    }

    #[test]
    fn url_for_unknown_name_is_an_error() {
        let router = Router::new();
        let err = router.url("missing", &UrlParams::None, &UrlOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "no route found for name: missing");
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn bad_pattern_panics_at_registration() {
        Router::new().get("/:id([)", [noop()]);
    }
}
