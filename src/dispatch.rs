//! The router as a handler.
//!
//! Per request: resolve the path against the frozen route table, and if an
//! endpoint matched, flatten every applying route into one chain of the form
//!
//! ```text
//! [frame(r1), r1 handlers…, frame(r2), r2 handlers…, …]
//! ```
//!
//! where each frame rebinds `ctx.captures`, `ctx.params` and `ctx.route_name`
//! for the route whose handlers follow it. The chain runs with the outer
//! `next` as its tail, so the handler after the router still runs when the
//! last route handler calls `next`.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::compose::{Compose, Next};
use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::method::Method;
use crate::route::Route;
use crate::router::{Matched, Router};
use crate::url::{UrlOptions, UrlParams};

/// A frozen [`Router`] that dispatches requests.
///
/// Cheap to clone; every clone shares the same route table.
#[derive(Clone)]
pub struct Routes {
    inner: Arc<Router>,
}

impl Routes {
    pub(crate) fn new(router: Router) -> Self {
        Self { inner: Arc::new(router) }
    }

    pub fn stack(&self) -> &[Arc<Route>] {
        self.inner.stack()
    }

    pub fn route(&self, name: &str) -> Option<&Arc<Route>> {
        self.inner.route(name)
    }

    pub fn url(&self, name: &str, params: &UrlParams, opts: &UrlOptions) -> Result<String, Error> {
        self.inner.url(name, params, opts)
    }

    pub fn resolve(&self, path: &str, method: Method) -> Matched {
        self.inner.resolve(path, method)
    }

    async fn dispatch(&self, ctx: &mut Context, next: Next<'_, Context>) -> Result<(), Error> {
        let path = self
            .inner
            .router_options()
            .router_path
            .clone()
            .or_else(|| ctx.router_path.clone())
            .unwrap_or_else(|| ctx.path.clone());

        let matched = self.resolve(&path, ctx.method);
        ctx.matched.extend(matched.path.iter().cloned());
        ctx.router = Some(self.clone());

        let Some(endpoint) = matched.most_specific() else {
            trace!(path, method = %ctx.method, "no endpoint matched, passing through");
            return next.run(ctx).await;
        };

        debug!(path, method = %ctx.method, route = endpoint.path(), "route matched");
        ctx.matched_route = Some(endpoint.path().to_owned());
        if let Some(name) = endpoint.name() {
            ctx.matched_route_name = Some(name.to_owned());
        }

        let path: Arc<str> = path.into();
        let chain = matched.path_and_method.iter().flat_map(|route| {
            let frame: BoxedHandler<Context> = Arc::new(Frame {
                route: Arc::clone(route),
                path: Arc::clone(&path),
            });
            std::iter::once(frame).chain(route.handlers())
        });

        Compose::new(chain).run(ctx, Some(&next)).await
    }
}

impl Handler<Context> for Routes {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a, Context>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(self.dispatch(ctx, next))
    }
}

impl fmt::Debug for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routes").field("stack", &self.inner.stack()).finish()
    }
}

/// Rebinds the context to the route whose handlers run next.
struct Frame {
    route: Arc<Route>,
    path: Arc<str>,
}

impl Handler<Context> for Frame {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a, Context>) -> BoxFuture<'a, Result<(), Error>> {
        ctx.captures = self.route.captures(&self.path);
        self.route.params(&ctx.captures, &mut ctx.params);
        ctx.route_name = self.route.name().map(str::to_owned);
        next.run(ctx)
    }
}
