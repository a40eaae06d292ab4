//! Minimal strata example: a nested users API with a parameter interceptor,
//! a timing middleware and reverse routing.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/api/users/42
//!   curl -i http://localhost:3000/api/users/0
//!   curl -i -X POST http://localhost:3000/api/users -d '{"name":"alice"}'
//!   curl -i -X DELETE http://localhost:3000/api/users/42
//!   curl -i http://localhost:3000/api/nowhere

use std::time::Instant;

use strata::{
    BoxedHandler, Context, Router, RouterOptions, Server, StatusCode, UrlOptions, UrlParams,
    middleware, named,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut users = Router::new();
    users
        .param("id", |id, ctx, next| {
            Box::pin(async move {
                if id.as_deref() == Some("0") {
                    ctx.response.set_status(StatusCode::NOT_FOUND);
                    return Ok(());
                }
                next.run(ctx).await
            })
        })
        .get(named("user", "/:id"), [get_user()])
        // "" rather than "/": prefixes are prepended verbatim, and the mount
        // below turns this into `/api/users`.
        .post("", [create_user()])
        .del("/:id", [delete_user()]);

    let mut api = Router::with_options(RouterOptions {
        prefix: Some("/api".into()),
        ..Default::default()
    });
    api.mount(timing()).mount_at("/users", &users);

    Server::bind("0.0.0.0:3000")
        .serve(api.routes())
        .await
        .expect("server error");
}

// Logs how long the rest of the chain took.
fn timing() -> BoxedHandler<Context> {
    middleware(|ctx, next| {
        Box::pin(async move {
            let started = Instant::now();
            let result = next.run(ctx).await;
            tracing::info!(
                method = %ctx.method(),
                path = ctx.path(),
                route = ctx.matched_route(),
                elapsed = ?started.elapsed(),
                "request"
            );
            result
        })
    })
}

// GET /api/users/:id
fn get_user() -> BoxedHandler<Context> {
    middleware(|ctx, _next| {
        Box::pin(async move {
            let id = ctx.param("id").unwrap_or("unknown").to_owned();
            ctx.response.set_json(format!(r#"{{"id":"{id}","name":"alice"}}"#));
            Ok(())
        })
    })
}

// POST /api/users → 201 with a location built from the named route.
fn create_user() -> BoxedHandler<Context> {
    middleware(|ctx, _next| {
        Box::pin(async move {
            if ctx.body().is_empty() {
                ctx.response.set_status(StatusCode::BAD_REQUEST);
                return Ok(());
            }
            let location = match ctx.router() {
                Some(router) => router.url("user", &UrlParams::positional([99]), &UrlOptions::default())?,
                None => "/api/users/99".to_owned(),
            };
            ctx.response
                .set_status(StatusCode::CREATED)
                .set_header("location", &location)
                .set_json(r#"{"id":"99","name":"new_user"}"#);
            Ok(())
        })
    })
}

// DELETE /api/users/:id → 204 No Content
fn delete_user() -> BoxedHandler<Context> {
    middleware(|ctx, _next| {
        Box::pin(async move {
            ctx.response.set_status(StatusCode::NO_CONTENT);
            Ok(())
        })
    })
}
