//! # strata
//!
//! Ordered route matching and middleware composition for async HTTP
//! services.
//!
//! ## The model
//!
//! A request walks a single chain of handlers. Each handler gets the shared
//! [`Context`] and a [`Next`] continuation; awaiting `next.run(ctx)` runs the
//! rest of the chain and hands back its result, not awaiting it stops the
//! request right there.
//!
//! - **Patterns**: `:name`, `:name(regex)`, `(regex)`, `*`, with `?`/`*`/`+`
//!   modifiers. See [`pattern`].
//! - **Ordered routing**: routes are tried in registration order; all that
//!   match run, and the last matching endpoint is reported as the matched
//!   route.
//! - **Parameter interceptors**: [`Router::param`] runs code for a path
//!   parameter before any route that uses it, in URL order.
//! - **Nesting**: routers mount inside routers under a prefix; routers and
//!   composed chains are handlers themselves.
//! - **Reverse routing**: [`Router::url`] for named routes, [`url`] for raw
//!   patterns.
//!
//! When no endpoint matches, the router just calls `next`. What the client
//! sees is up to the caller; the bundled [`Server`] answers 404.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strata::{middleware, named, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut router = Router::new();
//!
//!     router
//!         .mount(middleware(|ctx, next| Box::pin(async move {
//!             let started = std::time::Instant::now();
//!             next.run(ctx).await?;
//!             tracing::info!(path = ctx.path(), elapsed = ?started.elapsed(), "handled");
//!             Ok(())
//!         })))
//!         .get(named("user", "/users/:id"), [middleware(|ctx, next| Box::pin(async move {
//!             let id = ctx.param("id").unwrap_or("unknown").to_owned();
//!             ctx.response.set_json(format!(r#"{{"id":"{id}"}}"#));
//!             next.run(ctx).await
//!         }))])
//!         .post("/users", [middleware(|ctx, _next| Box::pin(async move {
//!             if ctx.body().is_empty() {
//!                 ctx.response.set_status(StatusCode::BAD_REQUEST);
//!                 return Ok(());
//!             }
//!             ctx.response.set_status(StatusCode::CREATED).set_header("location", "/users/99");
//!             Ok(())
//!         }))]);
//!
//!     Server::bind("0.0.0.0:3000").serve(router.routes()).await.unwrap();
//! }
//! ```

mod compose;
mod context;
mod dispatch;
mod error;
mod handler;
mod method;
mod response;
mod route;
mod router;
mod server;
mod url;

pub mod pattern;

pub use compose::{Compose, Next};
pub use context::Context;
pub use dispatch::Routes;
pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, Handler, ParamHandler, handler, middleware};
pub use method::Method;
pub use response::{ContentType, Response};
pub use route::{Pattern, Route, RouteOptions, Target, named};
pub use router::{Matched, Mount, Router, RouterOptions};
pub use server::Server;
pub use url::{Query, UrlOptions, UrlParams, decode_component, url};

pub use http::StatusCode;
