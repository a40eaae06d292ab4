//! HTTP method as a typed enum.
//!
//! Covers RFC 9110 standard methods, WebDAV extensions (RFC 4918 / 4791 / 3253 / 5323),
//! `PURGE` used by nginx and Varnish for cache invalidation, and `SUBSCRIBE`
//! for long-lived subscription endpoints.
//!
//! [`Method::ALL`] is the fixed verb table: the router generates one
//! registration method per entry and `Router::all` registers against every one.

use std::fmt;
use std::str::FromStr;

/// A known HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    // RFC 9110 ─────────────────────────────────────────────────────────────────
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
    // WebDAV RFC 4918 ──────────────────────────────────────────────────────────
    Copy,
    Lock,
    Mkcol,
    Move,
    Propfind,
    Proppatch,
    Unlock,
    // WebDAV extensions ────────────────────────────────────────────────────────
    Mkcalendar, // RFC 4791 (CalDAV)
    Report,     // RFC 3253
    Search,     // RFC 5323
    // Cache invalidation ───────────────────────────────────────────────────────
    Purge, // nginx / Varnish
    // Subscriptions ────────────────────────────────────────────────────────────
    Subscribe,
}

impl Method {
    /// Every method the router can register against, in declaration order.
    pub const ALL: [Method; 21] = [
        Self::Connect,
        Self::Delete,
        Self::Get,
        Self::Head,
        Self::Options,
        Self::Patch,
        Self::Post,
        Self::Put,
        Self::Trace,
        Self::Copy,
        Self::Lock,
        Self::Mkcol,
        Self::Move,
        Self::Propfind,
        Self::Proppatch,
        Self::Unlock,
        Self::Mkcalendar,
        Self::Report,
        Self::Search,
        Self::Purge,
        Self::Subscribe,
    ];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect    => "CONNECT",
            Self::Copy       => "COPY",
            Self::Delete     => "DELETE",
            Self::Get        => "GET",
            Self::Head       => "HEAD",
            Self::Lock       => "LOCK",
            Self::Mkcalendar => "MKCALENDAR",
            Self::Mkcol      => "MKCOL",
            Self::Move       => "MOVE",
            Self::Options    => "OPTIONS",
            Self::Patch      => "PATCH",
            Self::Post       => "POST",
            Self::Propfind   => "PROPFIND",
            Self::Proppatch  => "PROPPATCH",
            Self::Purge      => "PURGE",
            Self::Put        => "PUT",
            Self::Report     => "REPORT",
            Self::Search     => "SEARCH",
            Self::Subscribe  => "SUBSCRIBE",
            Self::Trace      => "TRACE",
            Self::Unlock     => "UNLOCK",
        }
    }
}

/// Parses a method token. Case-insensitive, so registration helpers and
/// transports may hand over `"get"` as readily as `"GET"`.
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_case() {
        assert_eq!("get".parse::<Method>(), Ok(Method::Get));
        assert_eq!("SUBSCRIBE".parse::<Method>(), Ok(Method::Subscribe));
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn table_round_trips_through_wire_names() {
        for m in Method::ALL {
            assert_eq!(m.as_str().parse::<Method>(), Ok(m));
        }
    }
}
