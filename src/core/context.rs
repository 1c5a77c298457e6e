//! Per-request context.

use std::any::Any;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use super::error::Result;
use super::request::Request;
use super::response::ResponseBuilder;
use crate::capability::{
    decode_flash, encode_flash, Capabilities, CookieJar, MemoryFlash, StandardCookies,
    FLASH_COOKIE,
};
use crate::config::ResponseConfig;
use crate::emit::{Emission, Emitter, Transport};

/// State of one in-flight request.
///
/// The context owns the request and its response builder; handlers receive
/// it by `&mut` and nothing else holds either. Both are created on first
/// access, so a handler that never touches the response still gets a
/// default 200 when the context is sent.
///
/// A context built with flash enabled owns a flash store of its own. Values
/// flashed during the request are sent back in a cookie and show up in
/// [`flashed`](Self::flashed) on the client's next request.
pub struct Context {
    /// Request ID for logging (UUID v4).
    pub request_id: String,

    /// Client IP address, when served from a socket.
    pub client_ip: Option<IpAddr>,

    request: Option<Request>,
    response: Option<ResponseBuilder>,
    config: Arc<ResponseConfig>,
    capabilities: Capabilities,
    flash: Option<Arc<MemoryFlash>>,
    flashed: Vec<(String, String)>,
    sent: bool,

    /// Custom key-value storage for handlers.
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Context {
    /// Create a context without a request.
    #[inline]
    pub fn new(config: Arc<ResponseConfig>, capabilities: Capabilities) -> Self {
        Self {
            request_id: generate_request_id(),
            client_ip: None,
            request: None,
            response: None,
            config,
            capabilities,
            flash: None,
            flashed: Vec::new(),
            sent: false,
            values: HashMap::new(),
        }
    }

    /// Create a context builder for more control.
    #[inline]
    pub fn builder(config: Arc<ResponseConfig>) -> ContextBuilder {
        ContextBuilder::new(config)
    }

    /// The current request, created empty on first use.
    pub fn request(&mut self) -> &Request {
        self.request.get_or_insert_with(Request::default)
    }

    /// Mutable access to the current request.
    pub fn request_mut(&mut self) -> &mut Request {
        self.request.get_or_insert_with(Request::default)
    }

    /// The response builder, created on first use.
    ///
    /// Its HTTP version defaults to the configured one, then the request's
    /// protocol.
    pub fn response(&mut self) -> &mut ResponseBuilder {
        let config = &self.config;
        let capabilities = &self.capabilities;
        let request = &self.request;

        self.response.get_or_insert_with(|| {
            let protocol = request.as_ref().map(Request::protocol);
            ResponseBuilder::for_request(config, capabilities.clone(), protocol)
        })
    }

    /// The response builder, if a handler created one.
    #[inline]
    pub fn peek_response(&self) -> Option<&ResponseBuilder> {
        self.response.as_ref()
    }

    #[inline]
    pub fn config(&self) -> &ResponseConfig {
        &self.config
    }

    #[inline]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// A value flashed by the client's previous request.
    pub fn flashed(&self, key: &str) -> Option<&str> {
        self.flashed
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value flashed by the client's previous request.
    #[inline]
    pub fn flashed_all(&self) -> &[(String, String)] {
        &self.flashed
    }

    /// Whether the response has been emitted.
    #[inline]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Emit the response once.
    ///
    /// Returns `None` when the response was already emitted.
    pub fn send(
        &mut self,
        emitter: &Emitter,
        transport: &mut dyn Transport,
    ) -> Result<Option<Emission>> {
        if self.sent {
            tracing::debug!(request_id = %self.request_id, "Response already sent");
            return Ok(None);
        }
        self.sent = true;

        self.carry_flash();
        let response = self.response();
        emitter.send(response, transport).map(Some)
    }

    /// Move this request's flash values into the flash cookie.
    ///
    /// Values read from the previous request are consumed: without new
    /// ones the cookie is cleared.
    fn carry_flash(&mut self) {
        let Some(store) = self.flash.as_ref() else {
            return;
        };

        let pending = store.take_all();
        let jar = StandardCookies::from_config(&self.config);
        let line = if !pending.is_empty() {
            match encode_flash(&pending) {
                Some(encoded) => jar.set_cookie(FLASH_COOKIE, &encoded, None),
                None => return,
            }
        } else if !self.flashed.is_empty() {
            jar.unset_cookie(FLASH_COOKIE)
        } else {
            return;
        };

        self.response().push_cookie_line(&line);
    }

    /// Set a custom value.
    #[inline]
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.values.insert(key.to_string(), Box::new(value));
    }

    /// Get a custom value.
    #[inline]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref())
    }

    /// Get a mutable reference to a custom value.
    #[inline]
    pub fn get_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut())
    }

    /// Remove a custom value.
    #[inline]
    pub fn remove<T: 'static>(&mut self, key: &str) -> Option<T> {
        self.values
            .remove(key)
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("client_ip", &self.client_ip)
            .field("request", &self.request)
            .field("response", &self.response)
            .field("flashed", &self.flashed)
            .field("sent", &self.sent)
            .field("values", &self.values.len())
            .finish()
    }
}

/// Builder for creating Context with more control.
pub struct ContextBuilder {
    config: Arc<ResponseConfig>,
    capabilities: Option<Capabilities>,
    request: Option<Request>,
    request_id: Option<String>,
    client_ip: Option<IpAddr>,
}

impl ContextBuilder {
    #[inline]
    pub fn new(config: Arc<ResponseConfig>) -> Self {
        Self {
            config,
            capabilities: None,
            request: None,
            request_id: None,
            client_ip: None,
        }
    }

    /// Set the request being served.
    #[inline]
    pub fn request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Set the capabilities (default: built from the config).
    ///
    /// An injected flash store is used as is and nothing is carried between
    /// requests through the flash cookie.
    #[inline]
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Set the request ID (default: random UUID).
    #[inline]
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    #[inline]
    pub fn client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }

    /// Build the context.
    pub fn build(self) -> Context {
        let mut capabilities = self
            .capabilities
            .unwrap_or_else(|| Capabilities::from_config(&self.config));

        let mut flash = None;
        let mut flashed = Vec::new();
        if self.config.flash && capabilities.flash().is_none() {
            let store = Arc::new(MemoryFlash::new());
            capabilities = capabilities.with_flash(store.clone());
            flash = Some(store);

            if let Some(raw) = self.request.as_ref().and_then(|r| r.cookie(FLASH_COOKIE)) {
                flashed = decode_flash(&raw);
            }
        }

        let mut ctx = Context::new(self.config, capabilities);
        ctx.request = self.request;
        ctx.client_ip = self.client_ip;
        ctx.flash = flash;
        ctx.flashed = flashed;
        if let Some(id) = self.request_id {
            ctx.request_id = id;
        }
        ctx
    }
}

/// Generate a request ID.
#[inline]
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
