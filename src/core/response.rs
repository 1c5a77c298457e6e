//! Response builder: accumulates status, headers and body until emission.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{
    HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, SET_COOKIE,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::body::{Body, Encoding};
use super::headers::{header_pair, HeaderBag};
use super::status::message_for_code;
use crate::capability::Capabilities;
use crate::config::{normalize_http_version, parse_duration, ResponseConfig};

/// Pre-allocated header values for each body kind.
mod content_types {
    use super::HeaderValue;

    pub static TEXT_PLAIN: HeaderValue = HeaderValue::from_static("text/plain");
    pub static TEXT_HTML: HeaderValue = HeaderValue::from_static("text/html");
    pub static APPLICATION_XML: HeaderValue = HeaderValue::from_static("application/xml");
    pub static APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");
    pub static OCTET_STREAM: HeaderValue = HeaderValue::from_static("application/octet-stream");
}

const DEFAULT_STATUS: u16 = 200;
const DEFAULT_HTTP_VERSION: &str = "HTTP/1.1";

/// Terminal result of a handler that stopped the request early.
///
/// Produced by [`ResponseBuilder::terminate`]. The request loop emits the
/// response once and runs nothing else for the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Halt {
    status: u16,
}

impl Halt {
    /// Halt without touching the response, e.g. after sending it directly.
    #[inline]
    pub fn new(status: u16) -> Self {
        Self { status }
    }

    /// Status code the response was halted with.
    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "response halted with status {}", self.status)
    }
}

impl std::error::Error for Halt {}

/// Handler result: `Err(Halt)` stops the request.
pub type Outcome<T = ()> = std::result::Result<T, Halt>;

/// Non-fatal problem recorded while building a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// An optional capability is not installed.
    MissingDependency(&'static str),
    /// A download source does not exist.
    MissingFile(PathBuf),
    /// A value could not be serialized.
    Encode(String),
    /// A page could not be rendered.
    Render { path: PathBuf, message: String },
    /// A cookie expiry string could not be parsed.
    InvalidExpiry(String),
    /// A header name or value was not valid and was not set.
    InvalidHeader { name: String, message: String },
    /// A mutation was attempted after `terminate`.
    Halted,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingDependency(name) => write!(f, "{} support is not installed", name),
            Warning::MissingFile(path) => {
                write!(f, "{} not found. Confirm your file path.", path.display())
            }
            Warning::Encode(msg) => write!(f, "failed to encode body: {}", msg),
            Warning::Render { path, message } => {
                write!(f, "failed to render {}: {}", path.display(), message)
            }
            Warning::InvalidExpiry(expiry) => write!(f, "invalid cookie expiry '{}'", expiry),
            Warning::InvalidHeader { name, message } => {
                write!(f, "invalid header '{}' rejected: {}", name, message)
            }
            Warning::Halted => write!(f, "response already terminated"),
        }
    }
}

/// Mutable accumulator of one HTTP response.
///
/// Setters only record intent; nothing reaches the client until the
/// response is handed to an [`Emitter`](crate::emit::Emitter).
///
/// # Example
///
/// ```rust,ignore
/// let mut res = ResponseBuilder::new();
/// res.header("X-Request-Id", "abc")
///     .json(&serde_json::json!({"ok": true}), 201);
/// ```
#[derive(Debug)]
pub struct ResponseBuilder {
    status: u16,
    headers: HeaderBag,
    body: Body,
    version: Option<String>,
    server_protocol: Option<String>,
    cookie_expiry: Option<Duration>,
    capabilities: Capabilities,
    warnings: Vec<Warning>,
    halted: bool,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    /// Create an empty 200 response without optional capabilities.
    pub fn new() -> Self {
        Self {
            status: DEFAULT_STATUS,
            headers: HeaderBag::new(),
            body: Body::Empty,
            version: None,
            server_protocol: None,
            cookie_expiry: Some(Duration::from_secs(7 * 86400)),
            capabilities: Capabilities::none(),
            warnings: Vec::new(),
            halted: false,
        }
    }

    /// Create a response for a request served with `protocol`.
    ///
    /// A configured HTTP version overrides the request's protocol.
    pub fn for_request(
        config: &ResponseConfig,
        capabilities: Capabilities,
        protocol: Option<&str>,
    ) -> Self {
        let server_protocol = config
            .http_version
            .clone()
            .or_else(|| protocol.map(str::to_string));

        Self {
            server_protocol,
            cookie_expiry: config.cookie_expiry,
            capabilities,
            ..Self::new()
        }
    }

    /// Replace the optional capabilities.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    // Getters

    #[inline]
    pub fn status_code(&self) -> u16 {
        self.status
    }

    #[inline]
    pub fn header_bag(&self) -> &HeaderBag {
        &self.headers
    }

    /// Get a header value by name (case-insensitive).
    #[inline]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    #[inline]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Non-fatal problems recorded so far.
    #[inline]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Whether [`terminate`](Self::terminate) was called.
    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Whether the headers mark this response as a file attachment.
    #[inline]
    pub fn is_attachment(&self) -> bool {
        self.headers
            .get(CONTENT_DISPOSITION)
            .is_some_and(|v| v.contains("attachment"))
    }

    /// HTTP version used in the status line.
    ///
    /// Explicit version, then the request's protocol, then `HTTP/1.1`.
    #[inline]
    pub fn http_version(&self) -> &str {
        self.version
            .as_deref()
            .or(self.server_protocol.as_deref())
            .unwrap_or(DEFAULT_HTTP_VERSION)
    }

    /// Status line without the trailing CRLF, e.g. `HTTP/1.1 404 Not Found`.
    pub fn status_line(&self) -> String {
        format!(
            "{} {} {}",
            self.http_version(),
            self.status,
            message_for_code(self.status)
        )
    }

    // Setters

    /// Set the HTTP version ("1.0" and "HTTP/1.0" are equivalent).
    pub fn set_http_version(&mut self, version: &str) -> &mut Self {
        if self.ensure_open() && !version.trim().is_empty() {
            self.version = Some(normalize_http_version(version));
        }
        self
    }

    /// Set the status code.
    pub fn status(&mut self, code: u16) -> &mut Self {
        if self.ensure_open() {
            self.status = code;
        }
        self
    }

    /// Output plain text.
    pub fn plain(&mut self, data: impl Into<String>, code: u16) -> &mut Self {
        if self.ensure_open() {
            self.status = code;
            self.replace_body(Body::Text(data.into()), Some(content_types::TEXT_PLAIN.clone()));
        }
        self
    }

    /// Output XML text.
    pub fn xml(&mut self, data: impl Into<String>, code: u16) -> &mut Self {
        if self.ensure_open() {
            self.status = code;
            self.replace_body(Body::Text(data.into()), Some(content_types::APPLICATION_XML.clone()));
        }
        self
    }

    /// Output JSON-encoded data.
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T, code: u16) -> &mut Self {
        self.json_inner(data, code, false)
    }

    /// Output JSON wrapped as `{"data": …, "status": {"code": …, "message": …}}`.
    pub fn json_with_status<T: Serialize + ?Sized>(&mut self, data: &T, code: u16) -> &mut Self {
        self.json_inner(data, code, true)
    }

    fn json_inner<T: Serialize + ?Sized>(
        &mut self,
        data: &T,
        code: u16,
        show_status: bool,
    ) -> &mut Self {
        if !self.ensure_open() {
            return self;
        }

        self.status = code;
        let body = match serde_json::to_value(data) {
            Ok(value) if show_status => Body::Encoded(
                json!({
                    "data": value,
                    "status": {
                        "code": code,
                        "message": message_for_code(code),
                    },
                }),
                Encoding::Json,
            ),
            Ok(value) => Body::Encoded(value, Encoding::Json),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode JSON response body");
                self.warnings.push(Warning::Encode(e.to_string()));
                Body::Empty
            }
        };

        self.replace_body(body, Some(content_types::APPLICATION_JSON.clone()));
        self
    }

    /// Output a page rendered by the installed page renderer.
    pub fn page(&mut self, path: impl AsRef<Path>, code: u16) -> &mut Self {
        if !self.ensure_open() {
            return self;
        }

        let path = path.as_ref();
        let rendered = match self.capabilities.pages() {
            Some(pages) => pages.render(path),
            None => {
                self.missing("page");
                return self;
            }
        };

        self.status = code;
        match rendered {
            Ok(html) => self.replace_body(Body::Text(html), Some(content_types::TEXT_HTML.clone())),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to render page");
                self.warnings.push(Warning::Render {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
                self.replace_body(Body::Empty, Some(content_types::TEXT_HTML.clone()));
            }
        }
        self
    }

    /// Output markup verbatim as HTML.
    pub fn markup(&mut self, markup: impl Into<String>, code: u16) -> &mut Self {
        if self.ensure_open() {
            self.status = code;
            self.replace_body(Body::Text(markup.into()), Some(content_types::TEXT_HTML.clone()));
        }
        self
    }

    /// Send a file as an attachment.
    ///
    /// `name` is the filename shown to the user (default: the file's basename).
    /// A missing file is reported as a warning; the attachment headers are
    /// still installed as `text/html`, without `Content-Length`.
    pub fn download(
        &mut self,
        path: impl AsRef<Path>,
        name: Option<&str>,
        code: u16,
    ) -> &mut Self {
        if !self.ensure_open() {
            return self;
        }

        let path = path.as_ref();
        let name = match name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let meta = std::fs::metadata(path).ok().filter(|meta| meta.is_file());
        let content_type = match meta {
            Some(_) => {
                let mime = mime_guess::from_path(path).first_or_octet_stream();
                HeaderValue::from_str(mime.as_ref())
                    .unwrap_or_else(|_| content_types::OCTET_STREAM.clone())
            }
            None => content_types::TEXT_HTML.clone(),
        };

        self.status = code;
        self.replace_body(
            Body::File {
                path: path.to_path_buf(),
                name: name.clone(),
            },
            Some(content_type),
        );

        match meta {
            Some(meta) => self.headers.insert(CONTENT_LENGTH, HeaderValue::from(meta.len())),
            None => {
                tracing::warn!(path = %path.display(), "Download file not found");
                self.warnings.push(Warning::MissingFile(path.to_path_buf()));
            }
        }

        let disposition = format!("attachment; filename={}", name);
        match HeaderValue::from_str(&disposition) {
            Ok(value) => self.headers.insert(CONTENT_DISPOSITION, value),
            Err(e) => self.invalid_header(CONTENT_DISPOSITION.as_str(), &e),
        }
        self
    }

    /// Respond with 204 No Content.
    pub fn no_content(&mut self) -> &mut Self {
        if self.ensure_open() {
            self.status = 204;
            self.replace_body(Body::Empty, None);
        }
        self
    }

    /// Set a header, replacing any previous value.
    pub fn header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> &mut Self {
        self.header_with(name, value, true, DEFAULT_STATUS)
    }

    /// Set a header.
    ///
    /// Without `replace`, another line with the same name is added. The status
    /// changes only when `code` is not 200. An invalid name or value (e.g. one
    /// containing CR/LF) is rejected with a warning.
    pub fn header_with(
        &mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
        replace: bool,
        code: u16,
    ) -> &mut Self {
        if self.ensure_open() {
            if code != DEFAULT_STATUS {
                self.status = code;
            }
            self.set_header_text(name.as_ref(), value.as_ref(), replace);
        }
        self
    }

    /// Merge a header map; later entries win on duplicate names.
    pub fn headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.headers_with(headers, DEFAULT_STATUS)
    }

    /// Merge a header map and change the status when `code` is not 200.
    pub fn headers_with<I, K, V>(&mut self, headers: I, code: u16) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if self.ensure_open() {
            if code != DEFAULT_STATUS {
                self.status = code;
            }
            for (name, value) in headers {
                self.set_header_text(name.as_ref(), value.as_ref(), true);
            }
        }
        self
    }

    /// Set a cookie with the configured lifetime.
    pub fn cookie(&mut self, name: &str, value: &str) -> &mut Self {
        let expiry = self.cookie_expiry;
        self.cookie_with_max_age(name, value, expiry)
    }

    /// Set a cookie expiring after `expiry` ("7 days", "1 hour", "30m").
    pub fn cookie_for(&mut self, name: &str, value: &str, expiry: &str) -> &mut Self {
        let max_age = match parse_duration(expiry) {
            Ok(max_age) => max_age,
            Err(e) => {
                tracing::warn!(expiry, error = %e, "Invalid cookie expiry, using default");
                self.warnings.push(Warning::InvalidExpiry(expiry.to_string()));
                self.cookie_expiry
            }
        };
        self.cookie_with_max_age(name, value, max_age)
    }

    fn cookie_with_max_age(
        &mut self,
        name: &str,
        value: &str,
        max_age: Option<Duration>,
    ) -> &mut Self {
        if !self.ensure_open() {
            return self;
        }

        match self.capabilities.cookies() {
            Some(jar) => {
                let line = jar.set_cookie(name, value, max_age);
                self.append_cookie_line(&line);
            }
            None => self.missing("cookie"),
        }
        self
    }

    /// Delete a cookie on the client.
    pub fn clear_cookie(&mut self, name: &str) -> &mut Self {
        if !self.ensure_open() {
            return self;
        }

        match self.capabilities.cookies() {
            Some(jar) => {
                let line = jar.unset_cookie(name);
                self.append_cookie_line(&line);
            }
            None => self.missing("cookie"),
        }
        self
    }

    /// Flash a value to the session.
    pub fn flash(&mut self, key: &str, value: &str) -> &mut Self {
        if !self.ensure_open() {
            return self;
        }

        match self.capabilities.flash() {
            Some(store) => store.set(key, value),
            None => self.missing("flash"),
        }
        self
    }

    /// Flash every pair of a map.
    pub fn flash_all<I, K, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in values {
            self.flash(key.as_ref(), value.as_ref());
        }
        self
    }

    /// Redirect to `url`. Redirects never carry a body.
    ///
    /// A URL that is not a valid header value is rejected with a warning and
    /// no `Location` is sent.
    pub fn redirect(&mut self, url: impl AsRef<str>, code: u16) -> &mut Self {
        if self.ensure_open() {
            self.status = code;
            self.replace_body(Body::Empty, None);
            match HeaderValue::from_str(url.as_ref()) {
                Ok(value) => self.headers.insert(LOCATION, value),
                Err(e) => self.invalid_header(LOCATION.as_str(), &e),
            }
        }
        self
    }

    /// Set a final body and stop the request.
    ///
    /// Arrays and objects are sent as JSON, strings verbatim, other scalars as
    /// their text. Always returns `Err(Halt)` so `?` unwinds the handler:
    ///
    /// ```rust,ignore
    /// res.terminate(json!({"error": "forbidden"}), 403)?;
    /// ```
    pub fn terminate(&mut self, data: impl Into<Value>, code: u16) -> Outcome {
        if !self.ensure_open() {
            return Err(Halt {
                status: self.status,
            });
        }

        self.status = code;
        match data.into() {
            value @ (Value::Array(_) | Value::Object(_)) => {
                self.replace_body(
                    Body::Encoded(value, Encoding::Json),
                    Some(content_types::APPLICATION_JSON.clone()),
                );
            }
            Value::Null => {
                let content_type = self.literal_content_type();
                self.replace_body(Body::Empty, content_type);
            }
            Value::String(text) => {
                let content_type = self.literal_content_type();
                self.replace_body(Body::Text(text), content_type);
            }
            scalar => {
                let content_type = self.literal_content_type();
                self.replace_body(Body::Text(scalar.to_string()), content_type);
            }
        }

        self.halted = true;
        Err(Halt { status: code })
    }

    /// Render as HTTP text: status line, header lines, blank line, inline body.
    ///
    /// File attachments are not read; their body is left out.
    pub fn to_wire(&self) -> Bytes {
        let body = self.body.inline_bytes().unwrap_or_default();
        let mut buf = BytesMut::with_capacity(128 + body.len());

        buf.put_slice(self.status_line().as_bytes());
        buf.put_slice(b"\r\n");
        for (name, value) in self.headers.iter() {
            buf.put_slice(name.as_str().as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"\r\n");
        buf.put_slice(&body);

        buf.freeze()
    }

    /// Append a `Set-Cookie` line, even after `terminate`.
    pub(crate) fn push_cookie_line(&mut self, line: &str) {
        self.append_cookie_line(line);
    }

    fn append_cookie_line(&mut self, line: &str) {
        match HeaderValue::from_str(line) {
            Ok(value) => self.headers.append(SET_COOKIE, value),
            Err(e) => self.invalid_header(SET_COOKIE.as_str(), &e),
        }
    }

    fn set_header_text(&mut self, name: &str, value: &str, replace: bool) {
        match header_pair(name, value) {
            Ok((name, value)) => self.headers.set(name, value, replace),
            Err(e) => self.invalid_header(name, &e),
        }
    }

    fn invalid_header(&mut self, name: &str, error: &dyn fmt::Display) {
        tracing::warn!(header = name, error = %error, "Invalid header rejected");
        self.warnings.push(Warning::InvalidHeader {
            name: name.to_string(),
            message: error.to_string(),
        });
    }

    /// Swap the body and its content headers.
    fn replace_body(&mut self, body: Body, content_type: Option<HeaderValue>) {
        if self.is_attachment() {
            self.headers.remove(CONTENT_DISPOSITION);
        }
        self.headers.remove(CONTENT_LENGTH);
        self.headers.remove(CONTENT_TYPE);

        if let Some(content_type) = content_type {
            self.headers.insert(CONTENT_TYPE, content_type);
        }
        self.body = body;
    }

    /// Content type for a literal body: keep the current one unless it
    /// described a file attachment.
    fn literal_content_type(&self) -> Option<HeaderValue> {
        if self.is_attachment() {
            return Some(content_types::TEXT_PLAIN.clone());
        }
        self.headers.get_value(CONTENT_TYPE).cloned()
    }

    fn missing(&mut self, capability: &'static str) {
        tracing::warn!(
            capability,
            "{} support is not installed, call skipped",
            capability
        );
        self.warnings.push(Warning::MissingDependency(capability));
    }

    /// Check that the response still accepts changes.
    fn ensure_open(&mut self) -> bool {
        if self.halted {
            tracing::warn!("Response already terminated, change ignored");
            self.warnings.push(Warning::Halted);
            return false;
        }
        true
    }
}
