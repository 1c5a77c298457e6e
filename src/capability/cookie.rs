//! Cookie support.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::ResponseConfig;

/// Characters that may not appear raw in a cookie value.
const COOKIE_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b',')
    .add(b';')
    .add(b'\\')
    .add(b'%');

/// Builds `Set-Cookie` header values.
pub trait CookieJar: Send + Sync {
    /// Header value that sets `name=value`.
    ///
    /// `max_age` of `None` produces a session cookie.
    fn set_cookie(&self, name: &str, value: &str, max_age: Option<Duration>) -> String;

    /// Header value that deletes `name` on the client.
    fn unset_cookie(&self, name: &str) -> String;
}

/// SameSite cookie attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Cookie jar producing RFC 6265 `Set-Cookie` values.
#[derive(Clone, Debug)]
pub struct StandardCookies {
    path: String,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl Default for StandardCookies {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            secure: false,
            http_only: true,
            same_site: Some(SameSite::Lax),
        }
    }
}

impl StandardCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jar with the configured path and `Secure` flag.
    pub fn from_config(config: &ResponseConfig) -> Self {
        Self::new()
            .with_path(config.cookie_path.clone())
            .with_secure(config.cookie_secure)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: Option<SameSite>) -> Self {
        self.same_site = same_site;
        self
    }

    fn attributes(&self, out: &mut String) {
        out.push_str("; Path=");
        out.push_str(&self.path);
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if let Some(same_site) = self.same_site {
            out.push_str("; SameSite=");
            out.push_str(same_site.as_str());
        }
    }
}

impl CookieJar for StandardCookies {
    fn set_cookie(&self, name: &str, value: &str, max_age: Option<Duration>) -> String {
        let mut out = format!("{}={}", name, utf8_percent_encode(value, COOKIE_VALUE));
        if let Some(age) = max_age {
            out.push_str("; Max-Age=");
            out.push_str(&age.as_secs().to_string());
        }
        self.attributes(&mut out);
        out
    }

    fn unset_cookie(&self, name: &str) -> String {
        let mut out = format!("{}=; Max-Age=0", name);
        self.attributes(&mut out);
        out
    }
}
