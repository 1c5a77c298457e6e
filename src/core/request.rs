//! HTTP request seen by handlers.

use std::borrow::Cow;

use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, Method, Uri};

/// Header name constants for fast lookup.
mod header_names {
    use super::*;

    pub static CONTENT_TYPE: HeaderName = header::CONTENT_TYPE;
    pub static COOKIE: HeaderName = header::COOKIE;
}

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Key-value pair list (faster than HashMap for small collections).
pub type ParamList = Vec<(String, String)>;

/// HTTP request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    version: http::Version,
    params: ParamList,
}

impl Default for Request {
    fn default() -> Self {
        Self::new(Method::GET, Uri::from_static("/"), HeaderMap::new(), Bytes::new())
    }
}

impl Request {
    /// Create a new request. Query and url-encoded form parameters are parsed once here.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let mut params = uri.query().map(parse_query_string).unwrap_or_default();

        let is_form = headers
            .get(&header_names::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with(FORM_URLENCODED));
        if is_form {
            if let Ok(form) = std::str::from_utf8(&body) {
                params.extend(parse_query_string(form));
            }
        }

        Self {
            method,
            uri,
            headers,
            body,
            version: http::Version::HTTP_11,
            params,
        }
    }

    /// Get the HTTP method.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the request path.
    #[inline]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Get the query string.
    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Get the full URI.
    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Get the headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the request body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get the HTTP version.
    #[inline]
    pub fn version(&self) -> http::Version {
        self.version
    }

    /// Set the HTTP version.
    #[inline]
    pub fn set_version(&mut self, version: http::Version) {
        self.version = version;
    }

    /// Protocol string used as the default response version.
    #[inline]
    pub fn protocol(&self) -> &'static str {
        match self.version {
            http::Version::HTTP_09 => "HTTP/0.9",
            http::Version::HTTP_10 => "HTTP/1.0",
            http::Version::HTTP_2 => "HTTP/2.0",
            http::Version::HTTP_3 => "HTTP/3.0",
            _ => "HTTP/1.1",
        }
    }

    /// Get a header value by string name (case-insensitive).
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get a query or form parameter. Form values win over query values.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All query and form parameters in arrival order.
    #[inline]
    pub fn params(&self) -> &ParamList {
        &self.params
    }

    /// Get a request cookie by name.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(&header_names::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(parse_cookies)
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

impl<B> From<http::Request<B>> for Request
where
    B: Into<Bytes>,
{
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        let mut request = Request::new(parts.method, parts.uri, parts.headers, body.into());
        request.set_version(parts.version);
        request
    }
}

/// Percent-decode, treating `+` as a space.
#[inline]
fn form_decode(s: &str) -> String {
    let s: Cow<'_, str> = if s.contains('+') {
        Cow::Owned(s.replace('+', " "))
    } else {
        Cow::Borrowed(s)
    };

    if s.contains('%') {
        percent_encoding::percent_decode_str(&s)
            .decode_utf8_lossy()
            .into_owned()
    } else {
        s.into_owned()
    }
}

/// Parse a query string into key-value pairs.
pub fn parse_query_string(query: &str) -> ParamList {
    let pair_count = query.matches('&').count() + 1;
    let mut params = Vec::with_capacity(pair_count.min(16));

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = match pair.find('=') {
            Some(pos) => (&pair[..pos], &pair[pos + 1..]),
            None => (pair, ""),
        };

        if !key.is_empty() {
            params.push((form_decode(key), form_decode(value)));
        }
    }

    params
}

/// Parse a Cookie header into name-value pairs.
pub fn parse_cookies(cookie_header: &str) -> ParamList {
    let mut cookies = Vec::new();

    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        let Some((name, value)) = cookie.split_once('=') else {
            continue;
        };

        let name = name.trim();
        if !name.is_empty() {
            let value = percent_encoding::percent_decode_str(value.trim())
                .decode_utf8_lossy()
                .into_owned();
            cookies.push((name.to_string(), value));
        }
    }

    cookies
}
