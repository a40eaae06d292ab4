//! Reverse routing: rendering patterns back into URLs.

use std::collections::HashMap;

use crate::error::Error;
use crate::pattern::{self, Token};

/// Parameter values for reverse routing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum UrlParams {
    /// No parameters; for patterns without keys.
    #[default]
    None,
    /// Values looked up by parameter name.
    Named(HashMap<String, String>),
    /// Values bound to parameters in the order they appear in the pattern.
    Positional(Vec<String>),
}

impl UrlParams {
    pub fn named<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        Self::Named(pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())).collect())
    }

    pub fn positional<V: ToString>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Positional(values.into_iter().map(|v| v.to_string()).collect())
    }
}

impl From<HashMap<String, String>> for UrlParams {
    fn from(map: HashMap<String, String>) -> Self {
        Self::Named(map)
    }
}

/// A query string appended to a generated URL.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Query {
    /// Key/value pairs, percent-encoded and joined in the given order.
    Pairs(Vec<(String, String)>),
    /// A pre-built query string, with or without the leading `?`.
    Raw(String),
}

impl Query {
    pub fn pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        Self::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())).collect())
    }

    fn render(&self) -> String {
        match self {
            Self::Pairs(pairs) => pairs
                .iter()
                .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
                .collect::<Vec<_>>()
                .join("&"),
            Self::Raw(raw) => raw.trim_start_matches('?').to_owned(),
        }
    }
}

impl From<&str> for Query {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_owned())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UrlOptions {
    pub query: Option<Query>,
}

impl UrlOptions {
    pub fn query(query: impl Into<Query>) -> Self {
        Self { query: Some(query.into()) }
    }
}

/// Generates a URL from a raw pattern. Needs no router.
///
/// `(.*)` wildcard markers are stripped before rendering, so a mount pattern
/// such as `/static(.*)` renders as `/static`.
///
/// ```rust
/// use strata::{url, Query, UrlOptions, UrlParams};
///
/// let href = url(
///     "/books/:category/:id",
///     &UrlParams::positional(["programming", "4"]),
///     &UrlOptions::query(Query::pairs([("page", 3), ("limit", 10)])),
/// ).unwrap();
/// assert_eq!(href, "/books/programming/4?page=3&limit=10");
/// ```
pub fn url(pattern: &str, params: &UrlParams, opts: &UrlOptions) -> Result<String, Error> {
    let pattern = pattern.replace("(.*)", "");

    let values = match params {
        UrlParams::None => HashMap::new(),
        UrlParams::Named(map) => map.clone(),
        UrlParams::Positional(values) => pattern::parse(&pattern)
            .into_iter()
            .filter_map(|token| match token {
                Token::Key(key) => Some(key.name),
                Token::Text(_) => None,
            })
            .zip(values.iter().cloned())
            .collect(),
    };

    let mut out = pattern::render(&pattern, &values)?;

    if let Some(query) = &opts.query {
        let query = query.render();
        if !query.is_empty() {
            out.push('?');
            out.push_str(&query);
        }
    }

    Ok(out)
}

/// Percent-decodes one captured path segment.
///
/// Never fails: when any escape is malformed or the bytes are not UTF-8 the
/// raw text is returned unchanged, so `100%` and `50%zz%20off` stay as is.
pub fn decode_component(raw: &str) -> String {
    if !escapes_are_well_formed(raw) {
        return raw.to_owned();
    }
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_owned(),
    }
}

/// Every `%` must start a two-digit hex escape; one bad escape spoils the
/// whole segment.
fn escapes_are_well_formed(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b == b'%')
        .all(|(i, _)| bytes.get(i + 1..i + 3).is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)))
}

/// Characters a URI component may carry unescaped besides the ones
/// `urlencoding` already keeps (`-_.~` and alphanumerics).
const COMPONENT_SAFE: &str = "!'()*";

/// Percent-encodes one URI component, leaving the unreserved marks
/// `!'()*` as they are.
pub(crate) fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for piece in value.split_inclusive(|c: char| COMPONENT_SAFE.contains(c)) {
        let body = piece.strip_suffix(|c: char| COMPONENT_SAFE.contains(c)).unwrap_or(piece);
        out.push_str(&urlencoding::encode(body));
        out.push_str(&piece[body.len()..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_and_positional_params_render_the_same() {
        let named = UrlParams::named([("category", "programming"), ("title", "how-to-node")]);
        let positional = UrlParams::positional(["programming", "how-to-node"]);
        let opts = UrlOptions::default();
        assert_eq!(url("/:category/:title", &named, &opts).unwrap(), "/programming/how-to-node");
        assert_eq!(url("/:category/:title", &positional, &opts).unwrap(), "/programming/how-to-node");
    }

    #[test]
    fn values_are_percent_encoded() {
        let params = UrlParams::named([("category", "programming"), ("title", "how to node")]);
        assert_eq!(
            url("/:category/:title", &params, &UrlOptions::default()).unwrap(),
            "/programming/how%20to%20node"
        );
    }

    #[test]
    fn query_as_pairs_or_raw_string() {
        let params = UrlParams::named([("category", "programming"), ("id", "4")]);
        let pairs = UrlOptions::query(Query::pairs([("page", 3), ("limit", 10)]));
        let raw = UrlOptions::query("page=3&limit=10");
        assert_eq!(
            url("/books/:category/:id", &params, &pairs).unwrap(),
            "/books/programming/4?page=3&limit=10"
        );
        assert_eq!(
            url("/books/:category/:id", &params, &raw).unwrap(),
            "/books/programming/4?page=3&limit=10"
        );
    }

    #[test]
    fn query_without_params() {
        let opts = UrlOptions::query(Query::pairs([("page", 3), ("limit", 10)]));
        assert_eq!(url("/category", &UrlParams::None, &opts).unwrap(), "/category?page=3&limit=10");
    }

    #[test]
    fn wildcard_markers_are_stripped() {
        assert_eq!(url("/static(.*)", &UrlParams::None, &UrlOptions::default()).unwrap(), "/static");
    }

    #[test]
    fn missing_parameter_is_an_error() {
        assert!(matches!(
            url("/users/:id", &UrlParams::None, &UrlOptions::default()),
            Err(Error::Render(_))
        ));
    }

    #[test]
    fn decoding_never_fails() {
        assert_eq!(decode_component("how%20to%20node"), "how to node");
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("%E0%A4%A"), "%E0%A4%A");
    }

    #[test]
    fn one_bad_escape_keeps_the_whole_segment_raw() {
        assert_eq!(decode_component("50%zz%20off"), "50%zz%20off");
        assert_eq!(decode_component("%%20"), "%%20");
        assert_eq!(decode_component("50%25%20off"), "50% off");
    }

    #[test]
    fn component_marks_stay_unescaped() {
        assert_eq!(encode_component("it's (ok)!*"), "it's%20(ok)!*");
        assert_eq!(encode_component("a/b?c"), "a%2Fb%3Fc");
        let params = UrlParams::named([("t", "it's (ok)!")]);
        assert_eq!(url("/:t", &params, &UrlOptions::default()).unwrap(), "/it's%20(ok)!");
    }
}
