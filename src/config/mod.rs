//! Configuration module for leaf_http.
//!
//! This module provides centralized configuration loading from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use leaf_http::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Listen address: {}", config.server.listen_addr);
//! println!("Cookie expiry: {:?}", config.response.cookie_expiry);
//! ```

mod error;
mod logging;
mod parse;
mod response;
mod server;

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use parse::parse_duration;
pub use response::{
    normalize_http_version, HostKind, ResponseConfig, DEFAULT_CHUNK_SIZE, DEFAULT_COOKIE_EXPIRY,
};
pub use server::{ServerConfig, DEFAULT_SERVER_SOFTWARE};

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Listener configuration.
    pub server: ServerConfig,
    /// Response and emitter configuration.
    pub response: ResponseConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            response: ResponseConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Listen: {}", self.server.listen_addr);
        info!("  Host mode: {:?}", self.response.host);

        if let Some(ref version) = self.response.http_version {
            info!("  HTTP version: {}", version);
        }

        match self.response.cookie_expiry {
            Some(expiry) if self.response.cookies => {
                info!("  Cookies: enabled ({}s)", expiry.as_secs());
            }
            None if self.response.cookies => info!("  Cookies: enabled (session)"),
            _ => info!("  Cookies: disabled"),
        }

        if self.response.flash {
            info!("  Flash: enabled");
        }

        if let Some(ref root) = self.response.template_root {
            info!("  Template root: {:?}", root);
        }

        if !self.response.finish_request {
            info!("  Finish request: disabled");
        }
    }
}
