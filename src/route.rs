//! A single registered route: pattern, methods, handler chain.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, ParamHandler, ParamInterceptor};
use crate::method::Method;
use crate::pattern::{self, Key, PatternOptions};
use crate::url::{self, UrlOptions, UrlParams};

/// What a route matches against.
#[derive(Clone, Debug)]
pub enum Pattern {
    /// A path pattern, compiled by [`pattern::compile`] and re-compiled
    /// whenever a prefix is applied.
    Path(String),
    /// A ready-made regex. Its capture groups land in `ctx.captures` but
    /// bind no named parameters, and prefixes leave it untouched.
    Regex(Regex),
}

impl Pattern {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Path(path) => path,
            Self::Regex(re) => re.as_str(),
        }
    }
}

impl From<&str> for Pattern {
    fn from(path: &str) -> Self {
        Self::Path(path.to_owned())
    }
}

impl From<String> for Pattern {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Self::Regex(re)
    }
}

/// Per-route options.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouteOptions {
    /// Name for reverse lookup via `Router::route` and `Router::url`.
    pub name: Option<String>,
    pub sensitive: bool,
    pub strict: bool,
    /// `false` makes the route a prefix match (used for mounts).
    pub end: bool,
    /// Leave `ctx.captures` empty and bind no parameters on match.
    pub ignore_captures: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            name: None,
            sensitive: false,
            strict: false,
            end: true,
            ignore_captures: false,
        }
    }
}

impl RouteOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    fn pattern_options(&self) -> PatternOptions {
        PatternOptions {
            sensitive: self.sensitive,
            strict: self.strict,
            end: self.end,
        }
    }
}

/// The pattern(s) a registration call targets, plus an optional name.
///
/// A name is never guessed from a string: it is only set through [`named`].
#[derive(Clone, Debug)]
pub struct Target {
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) name: Option<String>,
}

/// Names a registration target.
///
/// ```rust
/// use strata::{middleware, named, Router};
///
/// let mut router = Router::new();
/// router.get(named("user", "/users/:id"), [middleware(|ctx, next| {
///     Box::pin(async move { next.run(ctx).await })
/// })]);
/// assert!(router.route("user").is_some());
/// ```
pub fn named(name: impl Into<String>, target: impl Into<Target>) -> Target {
    Target { name: Some(name.into()), ..target.into() }
}

impl From<&str> for Target {
    fn from(path: &str) -> Self {
        Self { patterns: vec![path.into()], name: None }
    }
}

impl From<String> for Target {
    fn from(path: String) -> Self {
        Self { patterns: vec![path.into()], name: None }
    }
}

impl From<Regex> for Target {
    fn from(re: Regex) -> Self {
        Self { patterns: vec![re.into()], name: None }
    }
}

impl From<&[&str]> for Target {
    fn from(paths: &[&str]) -> Self {
        Self { patterns: paths.iter().map(|&p| p.into()).collect(), name: None }
    }
}

impl<const N: usize> From<[&str; N]> for Target {
    fn from(paths: [&str; N]) -> Self {
        Self { patterns: paths.into_iter().map(Pattern::from).collect(), name: None }
    }
}

impl From<Vec<&str>> for Target {
    fn from(paths: Vec<&str>) -> Self {
        paths.as_slice().into()
    }
}

/// One link of a route's handler chain. `param` tags parameter interceptors.
#[derive(Clone)]
struct Link {
    handler: BoxedHandler<Context>,
    param: Option<String>,
}

/// One registered route.
///
/// Cloning is cheap-ish (handlers are shared `Arc`s, the regex shares its
/// compiled program) and is how mounting copies routes between routers.
#[derive(Clone)]
pub struct Route {
    pattern: Pattern,
    methods: Vec<Method>,
    regex: Regex,
    keys: Vec<Key>,
    stack: Vec<Link>,
    opts: RouteOptions,
}

impl Route {
    /// Compiles `pattern` and builds the route.
    ///
    /// An empty method list makes the route match every method without ever
    /// counting as a terminal match: that is how middleware is mounted.
    pub fn new(
        pattern: impl Into<Pattern>,
        methods: &[Method],
        handlers: impl IntoIterator<Item = BoxedHandler<Context>>,
        opts: RouteOptions,
    ) -> Result<Self, Error> {
        let pattern = pattern.into();
        let (regex, keys) = match &pattern {
            Pattern::Path(path) => pattern::compile(path, opts.pattern_options()).map_err(|e| {
                Error::InvalidRoute {
                    methods: method_list(methods),
                    route: opts.name.clone().unwrap_or_else(|| path.clone()),
                    reason: e.to_string(),
                }
            })?,
            Pattern::Regex(re) => (re.clone(), Vec::new()),
        };
        let stack = handlers
            .into_iter()
            .map(|handler| Link { handler, param: None })
            .collect();

        Ok(Self {
            pattern,
            methods: methods.to_vec(),
            regex,
            keys,
            stack,
            opts,
        })
    }

    /// The pattern as registered, prefixes included.
    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn name(&self) -> Option<&str> {
        self.opts.name.as_deref()
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Parameter keys in capture-group order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn options(&self) -> &RouteOptions {
        &self.opts
    }

    /// A route with methods can end a dispatch; one without is middleware.
    pub fn is_terminal(&self) -> bool {
        !self.methods.is_empty()
    }

    /// Whether the route applies to `method` (method-less routes apply to all).
    pub fn allows(&self, method: Method) -> bool {
        self.methods.is_empty() || self.methods.contains(&method)
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Raw capture groups for `path`, `None` where an optional group did not
    /// participate. Empty when the route ignores captures or does not match.
    pub fn captures(&self, path: &str) -> Vec<Option<String>> {
        if self.opts.ignore_captures {
            return Vec::new();
        }
        self.regex
            .captures(path)
            .map(|caps| {
                caps.iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Binds `captures` to parameter names and merges them into `params`,
    /// which nested routers use to accumulate outer parameters.
    ///
    /// Every key with a capture is rebound: an empty capture binds `""` and
    /// an absent optional removes the key, so no stale outer value survives.
    pub fn params(&self, captures: &[Option<String>], params: &mut HashMap<String, String>) {
        for (key, capture) in self.keys.iter().zip(captures) {
            match capture.as_deref() {
                Some(raw) => {
                    params.insert(key.name.clone(), url::decode_component(raw));
                }
                None => {
                    params.remove(&key.name);
                }
            }
        }
    }

    /// The route's handler chain, parameter interceptors included.
    pub fn handlers(&self) -> impl Iterator<Item = BoxedHandler<Context>> + '_ {
        self.stack.iter().map(|link| Arc::clone(&link.handler))
    }

    /// Renders this route's pattern into a URL.
    pub fn url(&self, params: &UrlParams, opts: &UrlOptions) -> Result<String, Error> {
        match &self.pattern {
            Pattern::Path(path) => url::url(path, params, opts),
            Pattern::Regex(re) => Err(Error::Render(format!("regex route `{}` has no template", re.as_str()))),
        }
    }

    /// Splices a parameter interceptor into the chain.
    ///
    /// Interceptors run before the route's own handlers, and among themselves
    /// in the order their parameters appear in the pattern, whatever order
    /// they were registered in. Does nothing if the pattern lacks `name`.
    pub fn param(&mut self, name: &str, handler: ParamHandler) -> &mut Self {
        let position = |param: &str| self.keys.iter().position(|k| k.name == param);
        let Some(own) = position(name) else {
            return self;
        };

        let at = self
            .stack
            .iter()
            .position(|link| match &link.param {
                None => true,
                Some(param) => position(param).is_some_and(|p| p > own),
            })
            .unwrap_or(self.stack.len());

        let interceptor = ParamInterceptor { name: name.to_owned(), inner: handler };
        self.stack.insert(at, Link {
            handler: Arc::new(interceptor),
            param: Some(name.to_owned()),
        });
        self
    }

    /// Prepends `prefix` to the pattern and recompiles it. The parameter
    /// keys are rebuilt from scratch. Regex routes are left as they are.
    pub fn set_prefix(&mut self, prefix: &str) -> Result<&mut Self, Error> {
        let Pattern::Path(path) = &self.pattern else {
            return Ok(self);
        };
        let path = format!("{prefix}{path}");
        let (regex, keys) = pattern::compile(&path, self.opts.pattern_options())?;
        self.pattern = Pattern::Path(path);
        self.regex = regex;
        self.keys = keys;
        Ok(self)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path())
            .field("methods", &self.methods)
            .field("name", &self.opts.name)
            .field("handlers", &self.stack.len())
            .finish()
    }
}

fn method_list(methods: &[Method]) -> String {
    if methods.is_empty() {
        return "*".to_owned();
    }
    methods.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(",")
}
