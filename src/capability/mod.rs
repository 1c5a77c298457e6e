//! Optional collaborators of the response builder.
//!
//! Cookies, flash messages and page rendering are not needed by every
//! application. Each one is an optional capability injected when the
//! application is configured; the builder degrades with a warning when a
//! capability it needs was not installed.
//!
//! Cookie jars and page renderers are shared by all requests. Flash stores
//! hold per-client data: when flash is enabled in the configuration and no
//! store is injected, every context creates its own.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use leaf_http::capability::{Capabilities, MemoryFlash, StandardCookies};
//!
//! let flash = Arc::new(MemoryFlash::new());
//! let caps = Capabilities::none()
//!     .with_cookies(Arc::new(StandardCookies::new()))
//!     .with_flash(flash.clone());
//! ```

mod cookie;
mod flash;
mod page;

use std::fmt;
use std::sync::Arc;

pub use cookie::{CookieJar, SameSite, StandardCookies};
pub use flash::{decode_flash, encode_flash, FlashStore, MemoryFlash, FLASH_COOKIE};
pub use page::{FilePages, PageRenderer};

use crate::config::ResponseConfig;

/// Set of optional collaborators available to a response.
#[derive(Clone, Default)]
pub struct Capabilities {
    cookies: Option<Arc<dyn CookieJar>>,
    flash: Option<Arc<dyn FlashStore>>,
    pages: Option<Arc<dyn PageRenderer>>,
}

impl Capabilities {
    /// No optional collaborators.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build the shared collaborators enabled by the configuration.
    ///
    /// The flash store is left out; contexts create one per request.
    pub fn from_config(config: &ResponseConfig) -> Self {
        let mut caps = Self::none();

        if config.cookies {
            caps.cookies = Some(Arc::new(StandardCookies::from_config(config)));
        }

        if let Some(ref root) = config.template_root {
            caps.pages = Some(Arc::new(FilePages::new(Some(root.clone()))));
        }

        caps
    }

    pub fn with_cookies(mut self, jar: Arc<dyn CookieJar>) -> Self {
        self.cookies = Some(jar);
        self
    }

    pub fn with_flash(mut self, store: Arc<dyn FlashStore>) -> Self {
        self.flash = Some(store);
        self
    }

    pub fn with_pages(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.pages = Some(renderer);
        self
    }

    #[inline]
    pub fn cookies(&self) -> Option<&dyn CookieJar> {
        self.cookies.as_deref()
    }

    #[inline]
    pub fn flash(&self) -> Option<&dyn FlashStore> {
        self.flash.as_deref()
    }

    #[inline]
    pub fn pages(&self) -> Option<&dyn PageRenderer> {
        self.pages.as_deref()
    }

    /// Names of the capabilities that are not installed.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.cookies.is_none() {
            missing.push("cookie");
        }
        if self.flash.is_none() {
            missing.push("flash");
        }
        if self.pages.is_none() {
            missing.push("page");
        }
        missing
    }

    /// Warn once about every capability that is not installed.
    ///
    /// Flash is not reported when the configuration creates it per request.
    pub fn log_missing(&self, config: &ResponseConfig) {
        for name in self.missing() {
            if name == "flash" && config.flash {
                continue;
            }
            tracing::warn!(
                capability = name,
                "{} support is not installed, calls that need it will be skipped",
                name
            );
        }
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("cookies", &self.cookies.is_some())
            .field("flash", &self.flash.is_some())
            .field("pages", &self.pages.is_some())
            .finish()
    }
}
