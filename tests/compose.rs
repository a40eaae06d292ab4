use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use strata::{BoxedHandler, Compose, Error, handler};

type Log = Vec<u32>;

fn push_around(before: u32, after: u32) -> BoxedHandler<Log> {
    handler(move |log: &mut Log, next| {
        Box::pin(async move {
            log.push(before);
            tokio::time::sleep(Duration::from_millis(1)).await;
            next.run(log).await?;
            tokio::time::sleep(Duration::from_millis(1)).await;
            log.push(after);
            Ok(())
        })
    })
}

#[tokio::test]
async fn runs_handlers_in_onion_order() {
    let chain = Compose::new([push_around(1, 6), push_around(2, 5), push_around(3, 4)]);
    let mut log = Log::new();
    chain.call(&mut log).await.unwrap();
    assert_eq!(log, [1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn can_be_called_repeatedly_and_concurrently() {
    let chain = Compose::new([push_around(1, 4), push_around(2, 3)]);

    let (mut a, mut b) = (Log::new(), Log::new());
    let (ra, rb) = tokio::join!(chain.call(&mut a), chain.call(&mut b));
    ra.unwrap();
    rb.unwrap();
    assert_eq!(a, [1, 2, 3, 4]);
    assert_eq!(b, [1, 2, 3, 4]);

    let mut c = Log::new();
    chain.call(&mut c).await.unwrap();
    assert_eq!(c, [1, 2, 3, 4]);
}

#[tokio::test]
async fn zero_handlers_run_the_fallback_exactly_once() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let fallback = handler(move |_: &mut Log, _next| {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    });

    let chain: Compose<Log> = Compose::new([]);
    assert!(chain.is_empty());
    chain.call_with(&mut Log::new(), &fallback).await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // Without a fallback it just resolves.
    chain.call(&mut Log::new()).await.unwrap();
}

#[tokio::test]
async fn fallback_runs_after_the_last_handler() {
    let chain = Compose::new([push_around(1, 3)]);
    let fallback = handler(|log: &mut Log, _next| {
        Box::pin(async move {
            log.push(2);
            Ok(())
        })
    });
    let mut log = Log::new();
    chain.call_with(&mut log, &fallback).await.unwrap();
    assert_eq!(log, [1, 2, 3]);
}

#[tokio::test]
async fn calling_next_twice_is_rejected() {
    let chain: Compose<Log> = Compose::new([handler(|log: &mut Log, next| {
        Box::pin(async move {
            next.run(log).await?;
            next.run(log).await
        })
    })]);

    let err = chain.call(&mut Log::new()).await.unwrap_err();
    assert!(matches!(err, Error::NextCalledMultipleTimes));
    assert!(err.to_string().contains("multiple times"));
}

#[tokio::test]
async fn the_guard_is_per_run() {
    let chain = Compose::new([push_around(1, 2)]);
    for _ in 0..3 {
        chain.call(&mut Log::new()).await.unwrap();
    }
}

#[tokio::test]
async fn errors_propagate_through_every_next() {
    let chain = Compose::new([
        push_around(1, 9),
        handler(|_: &mut Log, _next| Box::pin(async { Err(Error::handler("boom")) })),
    ]);
    let mut log = Log::new();
    let err = chain.call(&mut log).await.unwrap_err();
    assert_eq!(err.to_string(), "handler: boom");
    assert_eq!(log, [1], "post-processing must not run after a failure");
}

#[tokio::test]
async fn errors_can_be_caught_and_recovered() {
    let chain = Compose::new([
        handler(|log: &mut Log, next| {
            Box::pin(async move {
                if next.run(log).await.is_err() {
                    log.push(0);
                }
                Ok(())
            })
        }),
        handler(|log: &mut Log, _next| {
            Box::pin(async move {
                log.push(1);
                Err(Error::handler("boom"))
            })
        }),
    ]);
    let mut log = Log::new();
    chain.call(&mut log).await.unwrap();
    assert_eq!(log, [1, 0]);
}

#[tokio::test]
async fn return_values_thread_back_up() {
    let chain: Compose<(), u32> = Compose::new([
        handler::<(), u32, _>(|ctx, next| Box::pin(async move { Ok(next.run(ctx).await? + 1) })),
        handler::<(), u32, _>(|ctx, next| Box::pin(async move { Ok(next.run(ctx).await? * 10) })),
        handler::<(), u32, _>(|_, _next| Box::pin(async { Ok(4) })),
    ]);
    assert_eq!(chain.call(&mut ()).await.unwrap(), 41);
}

#[tokio::test]
async fn past_the_end_next_yields_the_default() {
    let chain: Compose<(), u32> = Compose::new([handler::<(), u32, _>(|ctx, next| {
        Box::pin(async move { Ok(next.run(ctx).await? + 7) })
    })]);
    assert_eq!(chain.call(&mut ()).await.unwrap(), 7);
}

#[tokio::test]
async fn composed_chains_nest() {
    let inner: BoxedHandler<Log> = Arc::new(Compose::new([push_around(2, 5), push_around(3, 4)]));
    let outer = Compose::new([push_around(1, 8), inner, push_around(6, 7)]);
    let mut log = Log::new();
    outer.call(&mut log).await.unwrap();
    // The inner chain's `next` at its end continues the outer chain.
    assert_eq!(log, [1, 2, 3, 6, 7, 4, 5, 8]);
}

#[tokio::test]
async fn a_handler_that_skips_next_short_circuits() {
    let chain = Compose::new([
        handler(|log: &mut Log, _next| {
            Box::pin(async move {
                log.push(1);
                Ok(())
            })
        }),
        push_around(2, 3),
    ]);
    let mut log = Log::new();
    chain.call(&mut log).await.unwrap();
    assert_eq!(log, [1]);
}

#[test]
fn composing_leaves_the_input_untouched() {
    let handlers = vec![push_around(1, 2), push_around(3, 4)];
    let chain = Compose::new(handlers.iter().cloned());
    assert_eq!(chain.len(), 2);
    assert_eq!(handlers.len(), 2);
    assert!(handlers.iter().all(|h| Arc::strong_count(h) == 2));
}
