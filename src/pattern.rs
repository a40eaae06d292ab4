//! Path pattern compiler.
//!
//! Turns an Express-style path pattern into an anchored [`Regex`] plus the
//! ordered list of parameter [`Key`]s its capture groups bind to, and renders
//! a pattern back into a concrete path.
//!
//! | Syntax            | Meaning                                              |
//! |-------------------|------------------------------------------------------|
//! | `:name`           | one segment, `[^/]+?`                                |
//! | `:name(\d+)`      | named segment with a custom pattern                  |
//! | `(.*)`            | unnamed capture, keys named `"0"`, `"1"`, …          |
//! | `*`               | unnamed wildcard, same as `(.*)`                     |
//! | `?` / `*` / `+`   | optional / zero-or-more / one-or-more modifier       |
//! | `\:`              | literal character                                    |
//!
//! A `/` or `.` directly before a parameter becomes its prefix, so
//! `/users/:id?` matches both `/users` and `/users/42`.
//!
//! The output never uses lookaround, which the `regex` crate does not
//! support: boundary checks that would be lookaheads are written as
//! consuming groups instead, and no capture group ever spans them.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;
use crate::url;

/// Splits a pattern into escapes, parameters, and groups. Literal text is
/// whatever lies between matches.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\\.)|(?::(\w+)(?:\(((?:\\.|[^\\()])+)\))?|\(((?:\\.|[^\\()])+)\))([+*?])?|(\*)")
        .unwrap_or_else(|e| panic!("path token regex: {e}"))
});

const DELIMITER: char = '/';
const PREFIX_CHARS: &str = "./";

/// One named (or positional) parameter of a compiled pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Key {
    pub name: String,
    pub optional: bool,
    pub repeat: bool,
    pub(crate) prefix: String,
    pub(crate) delimiter: String,
    pub(crate) partial: bool,
    pub(crate) pattern: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Token {
    Text(String),
    Key(Key),
}

/// Matching flags.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PatternOptions {
    /// Case-sensitive matching. Default `false`.
    pub sensitive: bool,
    /// Require the trailing slash to match exactly. Default `false`.
    pub strict: bool,
    /// Match to the end of the input. `false` turns the pattern into a
    /// prefix match that stops on a `/` boundary. Default `true`.
    pub end: bool,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self { sensitive: false, strict: false, end: true }
    }
}

/// Tokenises `path` into literal text and parameter keys.
pub(crate) fn parse(path: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut positional = 0usize;
    let mut index = 0;
    let mut text = String::new();
    let mut text_escaped = false;

    for caps in TOKEN.captures_iter(path) {
        let Some(whole) = caps.get(0) else { continue };
        text.push_str(&path[index..whole.start()]);
        index = whole.end();

        if let Some(escaped) = caps.get(1) {
            text.push_str(&escaped.as_str()[1..]);
            text_escaped = true;
            continue;
        }

        let mut prefix = String::new();
        if !text_escaped {
            if let Some(last) = text.chars().last().filter(|c| PREFIX_CHARS.contains(*c)) {
                prefix.push(last);
                text.pop();
            }
        }
        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(&mut text)));
            text_escaped = false;
        }

        let next = path[index..].chars().next();
        let modifier = caps.get(5).map(|m| m.as_str());
        let delimiter = if prefix.is_empty() { DELIMITER.to_string() } else { prefix.clone() };
        let name = match caps.get(2) {
            Some(name) => name.as_str().to_owned(),
            None => {
                positional += 1;
                (positional - 1).to_string()
            }
        };
        let pattern = match (caps.get(3).or(caps.get(4)), caps.get(6)) {
            (Some(group), _) => escape_group(group.as_str()),
            (None, Some(_)) => ".*".to_owned(),
            (None, None) => format!("[^{}]+?", regex::escape(&delimiter)),
        };

        tokens.push(Token::Key(Key {
            name,
            optional: matches!(modifier, Some("?" | "*")),
            repeat: matches!(modifier, Some("+" | "*")),
            partial: !prefix.is_empty() && next.is_some() && next != prefix.chars().next(),
            prefix,
            delimiter,
            pattern,
        }));
    }

    text.push_str(&path[index..]);
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    tokens
}

/// Compiles `path` into an anchored matcher and its ordered parameter keys.
///
/// ```rust
/// use strata::pattern::{compile, PatternOptions};
///
/// let (re, keys) = compile("/users/:id", PatternOptions::default()).unwrap();
/// assert!(re.is_match("/users/42"));
/// assert!(re.is_match("/USERS/42/"));
/// assert_eq!(keys[0].name, "id");
/// ```
pub fn compile(path: &str, opts: PatternOptions) -> Result<(Regex, Vec<Key>), Error> {
    let tokens = parse(path);
    let delimiter = regex::escape(&DELIMITER.to_string());
    let mut keys = Vec::new();
    let mut route = String::new();

    if !opts.sensitive {
        route.push_str("(?i)");
    }
    route.push('^');

    for token in &tokens {
        match token {
            Token::Text(text) => route.push_str(&regex::escape(text)),
            Token::Key(key) => {
                let capture = if key.repeat {
                    format!(
                        "(?:{p})(?:{d}(?:{p}))*",
                        p = key.pattern,
                        d = regex::escape(&key.delimiter)
                    )
                } else {
                    key.pattern.clone()
                };
                let prefix = regex::escape(&key.prefix);
                if key.optional {
                    if key.prefix.is_empty() {
                        route.push_str(&format!("({capture})?"));
                    } else {
                        route.push_str(&format!("(?:{prefix}({capture}))?"));
                    }
                } else {
                    route.push_str(&format!("{prefix}({capture})"));
                }
                keys.push(key.clone());
            }
        }
    }

    if opts.end {
        if !opts.strict {
            route.push_str(&format!("(?:{delimiter})?"));
        }
        route.push('$');
    } else {
        let end_delimited = match tokens.last() {
            Some(Token::Text(text)) => text.ends_with(DELIMITER),
            Some(Token::Key(_)) => false,
            None => true,
        };
        if !opts.strict {
            route.push_str(&format!("(?:{delimiter}$)?"));
        }
        if !end_delimited {
            route.push_str(&format!("(?:{delimiter}|$)"));
        }
    }

    let regex = Regex::new(&route).map_err(|e| Error::InvalidPattern(format!("`{path}`: {e}")))?;
    Ok((regex, keys))
}

/// Renders `path` with the given parameter values.
///
/// Values are percent-encoded and must match their parameter's pattern once
/// encoded. Optional parameters without a value are dropped together with
/// their prefix.
pub fn render(path: &str, params: &HashMap<String, String>) -> Result<String, Error> {
    let mut out = String::new();

    for token in parse(path) {
        let key = match token {
            Token::Text(text) => {
                out.push_str(&text);
                continue;
            }
            Token::Key(key) => key,
        };

        match params.get(&key.name) {
            Some(value) => {
                let segment = url::encode_component(value);
                let check = Regex::new(&format!("^(?:{})$", key.pattern))
                    .map_err(|e| Error::Render(format!("parameter `{}`: {e}", key.name)))?;
                if !check.is_match(&segment) {
                    return Err(Error::Render(format!(
                        "expected `{}` to match `{}`, but got `{segment}`",
                        key.name, key.pattern
                    )));
                }
                out.push_str(&key.prefix);
                out.push_str(&segment);
            }
            None if key.optional => {
                if key.partial {
                    out.push_str(&key.prefix);
                }
            }
            None => return Err(Error::Render(format!("missing value for `{}`", key.name))),
        }
    }

    Ok(out)
}

/// Mirrors the escaping applied to user-written groups: characters that would
/// change the group's meaning (`=!:$/()`) are taken literally.
fn escape_group(group: &str) -> String {
    let mut out = String::with_capacity(group.len());
    for c in group.chars() {
        if "=!:$/()".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
