//! Outgoing response state carried on the request context.
//!
//! Handlers do not return responses; they write into `ctx.response` and the
//! server turns whatever is there once the chain settles into an HTTP reply.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Response::set_body`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// The response being built for the current request.
///
/// The status stays unset until a handler picks one. When the chain finishes
/// an unset status becomes `200 OK` if a body was written and `404 Not Found`
/// otherwise.
///
/// ```rust
/// use strata::{ContentType, Response};
/// use http::StatusCode;
///
/// let mut res = Response::default();
/// assert_eq!(res.status(), StatusCode::NOT_FOUND);
///
/// res.set_body(ContentType::Xml, "<ok/>");
/// assert_eq!(res.status(), StatusCode::OK);
///
/// res.set_status(StatusCode::CREATED).set_header("location", "/users/42");
/// assert_eq!(res.header("location"), Some("/users/42"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Response {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// The effective status: explicit if set, else derived from the body.
    pub fn status(&self) -> StatusCode {
        match self.status {
            Some(status) => status,
            None if self.body.is_empty() => StatusCode::NOT_FOUND,
            None => StatusCode::OK,
        }
    }

    /// Whether a handler has set a status explicitly.
    pub fn is_status_set(&self) -> bool {
        self.status.is_some()
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = Some(status);
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Sets a `text/plain; charset=utf-8` body.
    pub fn set_text(&mut self, body: impl Into<String>) -> &mut Self {
        self.set_body(ContentType::Text, body.into())
    }

    /// Sets an `application/json` body from bytes your serialiser produced.
    pub fn set_json(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.set_body(ContentType::Json, body)
    }

    /// Sets a typed body. Use this for XML, HTML, binary, SSE, etc.
    pub fn set_body(&mut self, content_type: ContentType, body: impl Into<Bytes>) -> &mut Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        self.body = body.into();
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Sets a header. Names or values that are not valid HTTP are dropped
    /// with a warning rather than failing the request.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "dropping invalid response header"),
        }
        self
    }

    /// Drops status, headers and body; used when an error replaces whatever
    /// a handler had written so far.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let status = self.status();
        let mut res = http::Response::new(Full::new(self.body.clone()));
        *res.status_mut() = status;
        *res.headers_mut() = self.headers;
        res.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        res
    }
}
