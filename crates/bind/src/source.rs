//! Uniform key lookup over the different facets of a request.
//!
//! A [`SourceGetter`] answers two questions for a key: the first value, and all values in
//! the order the source holds them. Every binding tag reads through one of these:
//!
//! | tag       | getter           | backing data                                  |
//! |-----------|------------------|-----------------------------------------------|
//! | `path`    | [`PathParams`]   | route parameters captured by the router      |
//! | `query`   | [`QuerySource`]  | the url-encoded query string                  |
//! | `header`  | [`HeaderMap`]    | request headers                               |
//! | `cookie`  | [`CookieSource`] | all `Cookie` headers                          |
//! | `request` | [`RequestMeta`]  | method, host, url parts, remote address       |
//! | `default` | [`DefaultSource`]| the key itself, used for literal defaults     |

use cookie::Cookie;
use http::request::Parts;
use http::uri::Authority;
use http::{HeaderMap, Uri};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::net::SocketAddr;

/// Read-only key/value(s) lookup over one request facet.
pub trait SourceGetter {
    /// The first value stored under `key`, if any.
    fn get<'a>(&'a self, key: &'a str) -> Option<&'a str>;

    /// Every value stored under `key`, in source order.
    fn values<'a>(&'a self, key: &'a str) -> Vec<&'a str>;
}

fn first<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
}

fn all<'a>(pairs: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    pairs.iter().filter(|(name, _)| name == key).map(|(_, value)| value.as_str()).collect()
}

/// Path parameters captured while routing, stored in the request extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        first(&self.params, key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { params: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect() }
    }
}

impl SourceGetter for PathParams {
    fn get<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        PathParams::get(self, key)
    }

    fn values<'a>(&'a self, key: &'a str) -> Vec<&'a str> {
        PathParams::get(self, key).into_iter().collect()
    }
}

/// The decoded pairs of a url query string.
#[derive(Debug, Clone, Default)]
pub struct QuerySource {
    pairs: Vec<(String, String)>,
}

impl QuerySource {
    pub fn parse(query: &str) -> Self {
        // form decoding into string pairs is lossy, never failing
        Self { pairs: serde_urlencoded::from_str(query).unwrap_or_default() }
    }

    pub fn from_uri(uri: &Uri) -> Self {
        uri.query().map(Self::parse).unwrap_or_default()
    }
}

impl SourceGetter for QuerySource {
    fn get<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        first(&self.pairs, key)
    }

    fn values<'a>(&'a self, key: &'a str) -> Vec<&'a str> {
        all(&self.pairs, key)
    }
}

impl SourceGetter for HeaderMap {
    fn get<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        HeaderMap::get(self, key).and_then(|value| value.to_str().ok())
    }

    fn values<'a>(&'a self, key: &'a str) -> Vec<&'a str> {
        self.get_all(key).iter().filter_map(|value| value.to_str().ok()).collect()
    }
}

/// Cookies sent with the request, across every `Cookie` header.
#[derive(Debug, Clone, Default)]
pub struct CookieSource {
    pairs: Vec<(String, String)>,
}

impl CookieSource {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let pairs = headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .map(|cookie| (cookie.name().to_owned(), cookie.value().to_owned()))
            .collect();

        Self { pairs }
    }
}

impl SourceGetter for CookieSource {
    fn get<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        first(&self.pairs, key)
    }

    fn values<'a>(&'a self, key: &'a str) -> Vec<&'a str> {
        all(&self.pairs, key)
    }
}

/// Peer address of the connection, inserted into the request extensions by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// Request metadata addressed by the `request` tag.
#[derive(Debug)]
pub struct RequestMeta<'r> {
    parts: &'r Parts,
    url: String,
    path: Cow<'r, str>,
    remote_addr: Option<String>,
}

impl<'r> RequestMeta<'r> {
    /// Every key the `request` tag understands.
    pub const KEYS: [&'static str; 8] =
        ["remote-addr", "host", "method", "url", "url:host", "url:query", "url:path", "url:scheme"];

    pub fn new(parts: &'r Parts) -> Self {
        Self {
            parts,
            url: parts.uri.to_string(),
            path: percent_decode_str(parts.uri.path()).decode_utf8_lossy(),
            remote_addr: parts.extensions.get::<RemoteAddr>().map(|addr| addr.0.to_string()),
        }
    }

    pub fn is_known_key(key: &str) -> bool {
        Self::KEYS.contains(&key)
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        let uri = &self.parts.uri;
        let value = match key {
            "remote-addr" => self.remote_addr.as_deref(),
            "host" => self
                .parts
                .headers
                .get(http::header::HOST)
                .and_then(|value| value.to_str().ok())
                .or_else(|| uri.authority().map(Authority::as_str)),
            "method" => Some(self.parts.method.as_str()),
            "url" => Some(self.url.as_str()),
            "url:host" => uri.host(),
            "url:query" => uri.query(),
            "url:path" => Some(self.path.as_ref()),
            "url:scheme" => uri.scheme_str(),
            _ => None,
        };
        value.filter(|value| !value.is_empty())
    }
}

impl SourceGetter for RequestMeta<'_> {
    fn get<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        self.lookup(key)
    }

    fn values<'a>(&'a self, key: &'a str) -> Vec<&'a str> {
        self.lookup(key).into_iter().collect()
    }
}

/// Echoes the key back, so literal defaults travel the same conversion path as real values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSource;

impl SourceGetter for DefaultSource {
    fn get<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        Some(key)
    }

    fn values<'a>(&'a self, key: &'a str) -> Vec<&'a str> {
        vec![key]
    }
}
