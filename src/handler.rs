//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! A route owns an ordered chain of handlers of *different* concrete types,
//! and the composer walks that chain by index. Rust collections can only hold
//! one concrete type, so every handler is stored as a trait object behind an
//! `Arc`:
//!
//! ```text
//! |ctx, next| Box::pin(async move { … })      ← user writes this
//!        ↓ strata::middleware(closure)
//! Arc::new(FnHandler(closure))                 ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn Handler>
//! handler.call(ctx, next) at request time      ← one vtable dispatch
//! ```
//!
//! Handlers borrow the request context mutably for the lifetime of their
//! future and receive a [`Next`] continuation that runs the rest of the chain.
//! Synchronous work is just an `async` block that never suspends, so plain
//! and asynchronous handlers look the same to the composer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::compose::Next;
use crate::context::Context;
use crate::error::Error;

/// A heap-allocated, type-erased future borrowed for `'a`.
///
/// `Send` lets tokio move a dispatch across worker threads between polls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One link of a handler chain.
///
/// `C` is the shared per-request context and `R` the value threaded back up
/// through `next()` calls. Closures get this trait through [`handler`];
/// [`Compose`](crate::Compose) and [`Routes`](crate::Routes) implement it
/// directly, which is what lets chains and routers nest inside one another.
pub trait Handler<C, R = ()>: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut C, next: Next<'a, C, R>) -> BoxFuture<'a, Result<R, Error>>;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
pub type BoxedHandler<C, R = ()> = Arc<dyn Handler<C, R>>;

/// A parameter interceptor: receives the current value of its parameter
/// (`None` when an optional segment was absent) ahead of the route handlers.
pub type ParamHandler = Arc<
    dyn for<'a> Fn(Option<String>, &'a mut Context, Next<'a, Context>) -> BoxFuture<'a, Result<(), Error>>
        + Send
        + Sync,
>;

/// Boxes a closure into a [`BoxedHandler`] for any context and return type.
///
/// ```rust
/// use strata::{handler, BoxedHandler};
///
/// let double: BoxedHandler<Vec<u32>, u32> = handler::<Vec<u32>, u32, _>(|ctx, next| {
///     Box::pin(async move {
///         ctx.push(1);
///         Ok(next.run(ctx).await? * 2)
///     })
/// });
/// ```
pub fn handler<C, R, F>(f: F) -> BoxedHandler<C, R>
where
    F: for<'a> Fn(&'a mut C, Next<'a, C, R>) -> BoxFuture<'a, Result<R, Error>> + Send + Sync + 'static,
    C: 'static,
    R: 'static,
{
    Arc::new(FnHandler(f))
}

/// [`handler`] fixed to the router's [`Context`], so closures need no
/// annotations at the registration site.
///
/// ```rust
/// use strata::{middleware, Router};
///
/// let mut router = Router::new();
/// router.get("/users/:id", [middleware(|ctx, next| {
///     Box::pin(async move {
///         let id = ctx.param("id").unwrap_or("unknown").to_owned();
///         ctx.response.set_text(format!("user {id}"));
///         next.run(ctx).await
///     })
/// })]);
/// ```
pub fn middleware<F>(f: F) -> BoxedHandler<Context>
where
    F: for<'a> Fn(&'a mut Context, Next<'a, Context>) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Newtype wrapper that holds a concrete closure `F` and implements
/// [`Handler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<C, R, F> Handler<C, R> for FnHandler<F>
where
    F: for<'a> Fn(&'a mut C, Next<'a, C, R>) -> BoxFuture<'a, Result<R, Error>> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut C, next: Next<'a, C, R>) -> BoxFuture<'a, Result<R, Error>> {
        (self.0)(ctx, next)
    }
}

/// A parameter interceptor spliced into a route's chain, tagged with the
/// parameter it serves so later insertions can keep URL order.
pub(crate) struct ParamInterceptor {
    pub(crate) name: String,
    pub(crate) inner: ParamHandler,
}

impl Handler<Context> for ParamInterceptor {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a, Context>) -> BoxFuture<'a, Result<(), Error>> {
        let value = ctx.params.get(&self.name).cloned();
        (self.inner)(value, ctx, next)
    }
}
