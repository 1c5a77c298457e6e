//! Response and emitter configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::parse::{env_bool, env_duration, env_opt, env_or, env_parse};
use super::ConfigError;

/// Default cookie lifetime.
pub const DEFAULT_COOKIE_EXPIRY: &str = "7 days";

/// Default chunk size for streaming file downloads.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Kind of host process the responses are emitted from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HostKind {
    /// Long-running server; output buffers are closed on completion.
    #[default]
    Server,
    /// Command-line run; output buffers are left to the caller.
    Cli,
}

impl FromStr for HostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "server" => Ok(HostKind::Server),
            "cli" => Ok(HostKind::Cli),
            other => Err(format!("expected server or cli, got '{}'", other)),
        }
    }
}

/// Settings shared by every response of the process.
#[derive(Clone, Debug)]
pub struct ResponseConfig {
    /// Explicit HTTP version for status lines (None = use the request's).
    pub http_version: Option<String>,
    /// Host process kind.
    pub host: HostKind,
    /// Use the transport's finish-request hook when it has one.
    pub finish_request: bool,
    /// Install the cookie jar.
    pub cookies: bool,
    /// Cookie lifetime when the caller gives none (None = session cookie).
    pub cookie_expiry: Option<Duration>,
    /// Cookie Path attribute.
    pub cookie_path: String,
    /// Mark cookies Secure.
    pub cookie_secure: bool,
    /// Install the in-memory flash store.
    pub flash: bool,
    /// Root directory for page templates (None = disable page rendering).
    pub template_root: Option<PathBuf>,
    /// Read size for file downloads.
    pub chunk_size: usize,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            http_version: None,
            host: HostKind::Server,
            finish_request: true,
            cookies: true,
            cookie_expiry: Some(Duration::from_secs(7 * 86400)),
            cookie_path: "/".to_string(),
            cookie_secure: false,
            flash: true,
            template_root: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ResponseConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let chunk_size: usize = env_parse("DOWNLOAD_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        if chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DOWNLOAD_CHUNK_SIZE".into(),
                message: "must be greater than 0".into(),
            });
        }

        let host = env_or("HOST_MODE", "server")
            .parse()
            .map_err(|message| ConfigError::Invalid {
                key: "HOST_MODE".into(),
                message,
            })?;

        Ok(Self {
            http_version: env_opt("HTTP_VERSION").map(|v| normalize_http_version(&v)),
            host,
            finish_request: env_bool("FINISH_REQUEST", true),
            cookies: env_bool("COOKIES", true),
            cookie_expiry: env_duration("COOKIE_EXPIRY", DEFAULT_COOKIE_EXPIRY)?,
            cookie_path: env_or("COOKIE_PATH", "/"),
            cookie_secure: env_bool("COOKIE_SECURE", false),
            flash: env_bool("FLASH", true),
            template_root: env_opt("TEMPLATE_ROOT").map(PathBuf::from),
            chunk_size,
        })
    }
}

/// Normalize "1.0", "HTTP/1.0" and "http/1.0" to "HTTP/1.0".
pub fn normalize_http_version(version: &str) -> String {
    let version = version.trim();
    let bare = version
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("HTTP/"))
        .map(|_| &version[5..])
        .unwrap_or(version);
    format!("HTTP/{}", bare)
}
