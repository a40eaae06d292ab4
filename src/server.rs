//! Reference HTTP transport and graceful shutdown.
//!
//! The router itself never decides what the client sees when nothing matched
//! or a handler failed; this server does:
//!
//! | Outcome of the handler chain              | Response                 |
//! |-------------------------------------------|--------------------------|
//! | `Err(_)`                                  | `500 Internal Server Error` |
//! | `Ok`, no status and no body written       | `404 Not Found`          |
//! | `Ok`, body written but no status          | `200 OK`                 |
//! | `Ok`, status written                      | that status              |
//! | request method unknown to [`Method`]      | `405 Method Not Allowed` |
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server stops accepting connections, lets
//! every in-flight connection finish, and then returns from
//! [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::compose::Compose;
use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// ```rust,no_run
    /// use strata::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and runs every request through `app`,
    /// typically the result of [`Router::routes`](crate::Router::routes).
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, app: impl Handler<Context>) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let app = Compose::new([Arc::new(app) as BoxedHandler<Context>]);
        info!(addr = %self.addr, "strata listening");

        let mut connections = JoinSet::new();
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(app.clone(), stream, peer));
                    }
                    Err(e) => warn!("accept failed: {e}"),
                },

                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!(open = connections.len(), "draining connections");
        while connections.join_next().await.is_some() {}
        info!("strata stopped");
        Ok(())
    }
}

/// Serves every request on one connection, HTTP/1 or HTTP/2.
async fn serve_connection(app: Compose<Context>, stream: TcpStream, peer: SocketAddr) {
    let svc = service_fn(move |req| {
        let app = app.clone();
        async move { dispatch(&app, req).await }
    });
    let builder = ConnBuilder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(stream), svc);
    if let Err(e) = conn.await {
        debug!(%peer, "connection closed with error: {e}");
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response. Every failure is turned
/// into a status here, so hyper never sees an error.
async fn dispatch(
    app: &Compose<Context>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let Ok(method) = req.method().as_str().parse::<Method>() else {
        return Ok(status_only(StatusCode::METHOD_NOT_ALLOWED));
    };
    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_owned(), |pq| pq.as_str().to_owned());

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {e}");
            return Ok(status_only(StatusCode::BAD_REQUEST));
        }
    };

    let mut ctx = Context::new(method, target)
        .with_headers(parts.headers)
        .with_body(body);

    if let Err(e) = app.call(&mut ctx).await {
        error!(method = %method, path = ctx.path(), "request failed: {e}");
        ctx.response.clear();
        ctx.response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(ctx.response.into_http())
}

fn status_only(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut res = Response::default();
    res.set_status(status);
    res.into_http()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// SIGTERM or Ctrl-C, whichever comes first.
async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!("Ctrl-C handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
        () = terminate => {}
    }
    info!("shutdown requested");
}
