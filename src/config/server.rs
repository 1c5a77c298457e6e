//! Server configuration.

use std::net::SocketAddr;

use super::parse::env_or;
use super::ConfigError;

/// Value of the `Server` response header.
pub const DEFAULT_SERVER_SOFTWARE: &str = concat!("leaf_http/", env!("CARGO_PKG_VERSION"));

/// HTTP listener configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address (LISTEN_ADDR).
    pub listen_addr: SocketAddr,
    /// `Server` header value (SERVER_SOFTWARE, empty disables the header).
    pub server_software: String,
}

impl ServerConfig {
    /// Create a config for an address with default settings.
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            server_software: DEFAULT_SERVER_SOFTWARE.to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env_or("LISTEN_ADDR", "0.0.0.0:8080");
        let listen_addr = addr.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Parse {
                key: "LISTEN_ADDR".into(),
                value: addr.clone(),
                error: e.to_string(),
            }
        })?;

        Ok(Self {
            listen_addr,
            server_software: env_or("SERVER_SOFTWARE", DEFAULT_SERVER_SOFTWARE),
        })
    }

    /// Set the `Server` header value.
    pub fn with_server_software(mut self, value: impl Into<String>) -> Self {
        self.server_software = value.into();
        self
    }
}
