//! Per-request context shared by every handler in a dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{Extensions, HeaderMap};

use crate::dispatch::Routes;
use crate::method::Method;
use crate::response::Response;
use crate::route::Route;

/// The mutable state a request carries through the handler chain.
///
/// Routers write the matching results here (`matched`, `params`, `captures`,
/// the matched route's pattern and name); handlers read the request and write
/// `response`. Anything else an application wants to pass down the chain goes
/// into `extensions`.
#[derive(Debug)]
pub struct Context {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,

    pub(crate) matched: Vec<Arc<Route>>,
    pub(crate) matched_route: Option<String>,
    pub(crate) matched_route_name: Option<String>,
    pub(crate) route_name: Option<String>,
    pub(crate) router: Option<Routes>,

    /// Decoded parameters of the route currently running, merged with those
    /// of any enclosing routes.
    pub params: HashMap<String, String>,
    /// Raw capture groups of the route currently running.
    pub captures: Vec<Option<String>>,
    /// Overrides the path used for matching when set. Mounted routers strip
    /// nothing themselves, so this is how a handler rewrites what downstream
    /// routers see.
    pub router_path: Option<String>,
    pub extensions: Extensions,
    pub response: Response,
}

impl Context {
    /// A context for `method` and a request target. Anything after `?` is
    /// split off as the query string.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        let mut path = target.into();
        let query = path.find('?').map(|at| {
            let query = path[at + 1..].to_owned();
            path.truncate(at);
            query
        });

        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            matched: Vec::new(),
            matched_route: None,
            matched_route_name: None,
            route_name: None,
            router: None,
            params: HashMap::new(),
            captures: Vec::new(),
            router_path: None,
            extensions: Extensions::new(),
            response: Response::default(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `ctx.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Every route matched on the way to the current handler, across nested
    /// routers, in dispatch order.
    pub fn matched(&self) -> &[Arc<Route>] {
        &self.matched
    }

    /// Pattern of the most specific route the innermost router matched.
    pub fn matched_route(&self) -> Option<&str> {
        self.matched_route.as_deref()
    }

    pub fn matched_route_name(&self) -> Option<&str> {
        self.matched_route_name.as_deref()
    }

    /// Name of the route whose handlers are running right now.
    pub fn route_name(&self) -> Option<&str> {
        self.route_name.as_deref()
    }

    /// The router dispatching the current request, for reverse routing from
    /// inside a handler.
    pub fn router(&self) -> Option<&Routes> {
        self.router.as_ref()
    }
}
