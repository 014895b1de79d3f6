//! Cookie header parsing and the relayed cookie set.
//!
//! # Responsibilities
//! - Look up a cookie by name in the inbound `Cookie` header(s)
//! - Extract the cookie name from a `Set-Cookie` value
//! - Collect the `Set-Cookie` values to relay, last occurrence wins
//!
//! # Design Decisions
//! - `Set-Cookie` values are relayed verbatim; attributes are never re-serialized
//! - Entries without a name are dropped, never an error

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

/// Extract the cookie name from a `Set-Cookie` header value.
///
/// The name is the text before the first `=` of the first `;`-delimited
/// segment, trimmed. Returns `""` when that segment has no `=`.
pub fn cookie_name(set_cookie: &str) -> &str {
    std::str::from_utf8(cookie_name_bytes(set_cookie.as_bytes())).unwrap_or_default()
}

/// Byte-level [`cookie_name`]; header values may carry non-ASCII bytes.
pub fn cookie_name_bytes(set_cookie: &[u8]) -> &[u8] {
    let first = set_cookie
        .split(|&b| b == b';')
        .next()
        .unwrap_or_default();
    match first.iter().position(|&b| b == b'=') {
        Some(eq) => trim(&first[..eq]),
        None => &[],
    }
}

fn trim(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if first.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = bytes {
        if last.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}

/// Iterate the `name=value` pairs of every `Cookie` header on a request.
///
/// Pairs that are not valid UTF-8 are skipped.
pub fn request_cookies(headers: &HeaderMap) -> impl Iterator<Item = (&str, &str)> {
    headers
        .get_all(COOKIE)
        .iter()
        .flat_map(|value| value.as_bytes().split(|&b| b == b';'))
        .filter_map(|pair| {
            let pair = trim(pair);
            let eq = pair.iter().position(|&b| b == b'=')?;
            let name = std::str::from_utf8(trim(&pair[..eq])).ok()?;
            let value = std::str::from_utf8(trim(&pair[eq + 1..])).ok()?;
            if name.is_empty() {
                None
            } else {
                Some((name, value))
            }
        })
}

/// Value of the first request cookie called `name`.
pub fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    request_cookies(headers).find_map(|(n, v)| (n == name).then_some(v))
}

/// `Set-Cookie` values chosen for relay, keyed by cookie name.
///
/// A later value for a name replaces the earlier one in place, so the set
/// keeps the order in which names were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayedCookieSet {
    entries: Vec<(String, HeaderValue)>,
}

impl RelayedCookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the `Set-Cookie` entries of a side response whose names are wanted.
    pub fn from_headers(headers: &HeaderMap, wanted: &[String]) -> Self {
        let mut set = Self::new();
        for value in headers.get_all(SET_COOKIE) {
            let name = std::str::from_utf8(cookie_name_bytes(value.as_bytes())).unwrap_or_default();
            if name.is_empty() {
                tracing::debug!(entry = ?value, "Dropping Set-Cookie entry without a name");
                continue;
            }
            if wanted.iter().any(|w| w == name) {
                set.insert(name, value.clone());
            }
        }
        set
    }

    /// Store `value` under `name`, replacing any earlier value.
    pub fn insert(&mut self, name: &str, value: HeaderValue) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append one `Set-Cookie` header per relayed cookie.
    pub fn apply(self, headers: &mut HeaderMap) {
        for (_, value) in self.entries {
            headers.append(SET_COOKIE, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wanted(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_cookie_name() {
        assert_eq!(cookie_name("jsessionid=abc123; Path=/"), "jsessionid");
        assert_eq!(cookie_name(""), "");
        assert_eq!(cookie_name("noEquals"), "");
        assert_eq!(cookie_name("  sid = xyz ; HttpOnly"), "sid");
        assert_eq!(cookie_name("flag; sid=xyz"), "");
        assert_eq!(cookie_name("empty="), "empty");
    }

    #[test]
    fn test_find_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1; sid=first"));
        headers.append(COOKIE, HeaderValue::from_static("sid=second; b=2"));

        assert_eq!(find_cookie(&headers, "sid"), Some("first"));
        assert_eq!(find_cookie(&headers, "b"), Some("2"));
        assert_eq!(find_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_request_cookies_skips_malformed_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("junk; =nameless; ok=1"));

        let pairs: Vec<_> = request_cookies(&headers).collect();
        assert_eq!(pairs, vec![("ok", "1")]);
    }

    #[test]
    fn test_relayed_set_filters_and_last_wins() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("sid=old; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("other=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("noEquals"));
        headers.append(SET_COOKIE, HeaderValue::from_static("sid=new; Secure; HttpOnly"));

        let set = RelayedCookieSet::from_headers(&headers, &wanted(&["sid"]));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("sid").unwrap(), "sid=new; Secure; HttpOnly");
        assert!(set.get("other").is_none());
    }

    #[test]
    fn test_non_ascii_values_are_relayed_verbatim() {
        let raw = "sid=café; Path=/".as_bytes();
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_bytes(raw).unwrap());

        let set = RelayedCookieSet::from_headers(&headers, &wanted(&["sid"]));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("sid").unwrap().as_bytes(), raw);
        assert_eq!(cookie_name_bytes(raw), b"sid");
    }

    #[test]
    fn test_find_cookie_with_non_ascii_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_bytes("lang=français; sid=abc".as_bytes()).unwrap(),
        );

        assert_eq!(find_cookie(&headers, "lang"), Some("français"));
        assert_eq!(find_cookie(&headers, "sid"), Some("abc"));
    }

    #[test]
    fn test_apply_appends_one_header_per_cookie() {
        let mut set = RelayedCookieSet::new();
        set.insert("a", HeaderValue::from_static("a=1; Path=/"));
        set.insert("b", HeaderValue::from_static("b=2"));
        set.insert("a", HeaderValue::from_static("a=3"));

        let mut response_headers = HeaderMap::new();
        response_headers.insert(SET_COOKIE, HeaderValue::from_static("downstream=1"));
        set.apply(&mut response_headers);

        let values: Vec<_> = response_headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["downstream=1", "a=3", "b=2"]);
    }
}
