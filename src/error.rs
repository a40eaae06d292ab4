//! Unified error type.

use std::fmt;

/// The error type returned by strata's fallible operations.
///
/// "No route matched" is deliberately absent: a router that finds no terminal
/// route hands control to the next handler and lets the caller decide what
/// the user sees.
#[derive(Debug)]
pub enum Error {
    /// A route could not be built at registration time.
    InvalidRoute {
        methods: String,
        route: String,
        reason: String,
    },
    /// A path pattern did not compile into a matcher.
    InvalidPattern(String),
    /// A handler invoked its `next` continuation a second time.
    NextCalledMultipleTimes,
    /// Reverse routing was asked for a name no route carries.
    RouteNotFound(String),
    /// A pattern could not be rendered with the given parameters.
    Render(String),
    /// An error raised by application code inside a handler.
    Handler(Box<dyn std::error::Error + Send + Sync>),
    /// Binding or accepting a connection failed.
    Io(std::io::Error),
}

impl Error {
    /// Wraps an application error so it can travel up a handler chain.
    ///
    /// ```rust
    /// let err = strata::Error::handler("user not found");
    /// assert_eq!(err.to_string(), "handler: user not found");
    /// ```
    pub fn handler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Handler(err.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRoute { methods, route, reason } => {
                write!(f, "invalid route: {methods} `{route}`: {reason}")
            }
            Self::InvalidPattern(msg) => write!(f, "invalid pattern {msg}"),
            Self::NextCalledMultipleTimes => f.write_str("next() called multiple times"),
            Self::RouteNotFound(name) => write!(f, "no route found for name: {name}"),
            Self::Render(msg) => write!(f, "cannot render url: {msg}"),
            Self::Handler(e) => write!(f, "handler: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Handler(e) => Some(e.as_ref()),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
