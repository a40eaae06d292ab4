//! Continuation-chaining executor.
//!
//! [`Compose`] turns an ordered list of handlers into one callable. Handler
//! *i* runs first; handler *i + 1* runs only when (and if) handler *i* awaits
//! [`Next::run`]. Whatever the inner handlers return flows back out of
//! `next.run(ctx).await`, so return values thread up the stack like nested
//! function calls.
//!
//! ```text
//! compose([a, b, c]).call(ctx)
//!   a ─ next.run ─▶ b ─ next.run ─▶ c ─ next.run ─▶ fallback / R::default()
//!   a ◀── value ─── b ◀── value ─── c ◀── value ───┘
//! ```
//!
//! Each call gets its own call-tracking counter, so concurrent or repeated
//! invocations of the same `Compose` never share "has next run?" state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler};

/// The continuation handed to every handler in a composed chain.
///
/// `Next` is `Copy`: calling [`run`](Next::run) a second time on the same
/// continuation does not fail to compile, it resolves to
/// [`Error::NextCalledMultipleTimes`].
pub struct Next<'a, C, R = ()> {
    chain: &'a [BoxedHandler<C, R>],
    index: usize,
    calls: &'a AtomicUsize,
    tail: Option<&'a Next<'a, C, R>>,
}

impl<C, R> Clone for Next<'_, C, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, R> Copy for Next<'_, C, R> {}

impl<'a, C, R> Next<'a, C, R>
where
    C: Send + 'static,
    R: Default + Send + 'static,
{
    /// Runs the remainder of the chain and resolves to its result.
    ///
    /// Past the last handler this runs the composed call's fallback, or
    /// resolves to `R::default()` when there is none.
    pub fn run<'b>(&self, ctx: &'b mut C) -> BoxFuture<'b, Result<R, Error>>
    where
        'a: 'b,
    {
        let next = *self;
        Box::pin(next.dispatch(ctx))
    }

    async fn dispatch(self, ctx: &mut C) -> Result<R, Error> {
        // `calls` holds one past the highest position already dispatched in
        // this run; reaching a position twice means a handler re-ran `next`.
        if self.calls.fetch_max(self.index + 1, Ordering::AcqRel) > self.index {
            return Err(Error::NextCalledMultipleTimes);
        }

        match self.chain.get(self.index) {
            Some(handler) => {
                let next = Next { index: self.index + 1, ..self };
                handler.call(ctx, next).await
            }
            None => match self.tail {
                Some(tail) => tail.run(ctx).await,
                None => Ok(R::default()),
            },
        }
    }
}

/// An ordered handler chain frozen into a single callable.
///
/// Composing never touches the input handlers, and the result can be invoked
/// any number of times, with different contexts, concurrently.
///
/// ```rust
/// use strata::{handler, Compose};
///
/// # #[tokio::main]
/// # async fn main() {
/// let chain: Compose<Vec<u32>> = Compose::new([
///     handler(|log: &mut Vec<u32>, next| Box::pin(async move {
///         log.push(1);
///         next.run(log).await?;
///         log.push(3);
///         Ok(())
///     })),
///     handler(|log: &mut Vec<u32>, next| Box::pin(async move {
///         log.push(2);
///         next.run(log).await
///     })),
/// ]);
///
/// let mut log = Vec::new();
/// chain.call(&mut log).await.unwrap();
/// assert_eq!(log, [1, 2, 3]);
/// # }
/// ```
pub struct Compose<C, R = ()> {
    chain: Arc<[BoxedHandler<C, R>]>,
}

impl<C, R> Clone for Compose<C, R> {
    fn clone(&self) -> Self {
        Self { chain: Arc::clone(&self.chain) }
    }
}

impl<C, R> Compose<C, R>
where
    C: Send + 'static,
    R: Default + Send + 'static,
{
    pub fn new(handlers: impl IntoIterator<Item = BoxedHandler<C, R>>) -> Self {
        Self { chain: handlers.into_iter().collect() }
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Runs the chain against `ctx`. The end of the chain is a no-op that
    /// resolves to `R::default()`.
    pub async fn call(&self, ctx: &mut C) -> Result<R, Error> {
        self.run(ctx, None).await
    }

    /// Runs the chain against `ctx`; when the last handler calls `next`, the
    /// `fallback` handler runs (with a no-op `next` of its own).
    pub async fn call_with(&self, ctx: &mut C, fallback: &BoxedHandler<C, R>) -> Result<R, Error> {
        let calls = AtomicUsize::new(0);
        let tail = Next {
            chain: std::slice::from_ref(fallback),
            index: 0,
            calls: &calls,
            tail: None,
        };
        self.run(ctx, Some(&tail)).await
    }

    /// Runs the chain with an outer continuation as its tail. Used when a
    /// composed chain itself sits inside another chain.
    pub(crate) async fn run(&self, ctx: &mut C, tail: Option<&Next<'_, C, R>>) -> Result<R, Error> {
        let calls = AtomicUsize::new(0);
        let entry = Next {
            chain: &self.chain[..],
            index: 0,
            calls: &calls,
            tail,
        };
        entry.run(ctx).await
    }
}

impl<C, R> Handler<C, R> for Compose<C, R>
where
    C: Send + 'static,
    R: Default + Send + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut C, next: Next<'a, C, R>) -> BoxFuture<'a, Result<R, Error>> {
        Box::pin(async move { self.run(ctx, Some(&next)).await })
    }
}
