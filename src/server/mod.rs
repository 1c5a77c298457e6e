//! HTTP/1 server running a [`Handler`] per request.
//!
//! Each accepted connection is served by hyper on its own task. Handlers are
//! synchronous and run on tokio's blocking pool with a [`Context`] of their
//! own; the emitted response is captured and handed back to hyper.
//!
//! # Graceful Shutdown
//!
//! ```rust,ignore
//! let server = Arc::new(Server::new(&config, handler));
//! let listener = server.bind().await?;
//! tokio::spawn({
//!     let server = Arc::clone(&server);
//!     async move { server.serve(listener).await }
//! });
//! server.trigger_shutdown();
//! ```
//!
//! [`Context`]: crate::core::Context

mod connection;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use http::HeaderValue;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use connection::ConnectionContext;

use crate::capability::Capabilities;
use crate::config::{Config, ServerConfig};
use crate::emit::Emitter;
use crate::handler::Handler;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP server for a single handler.
pub struct Server {
    config: ServerConfig,
    ctx: Arc<ConnectionContext>,
    active_connections: Arc<AtomicUsize>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_initiated: AtomicBool,
}

impl Server {
    /// Create a server with capabilities built from the configuration.
    pub fn new(config: &Config, handler: impl Handler) -> Self {
        let capabilities = Capabilities::from_config(&config.response);
        Self::with_capabilities(config, handler, capabilities)
    }

    /// Create a server with explicit capabilities.
    pub fn with_capabilities(
        config: &Config,
        handler: impl Handler,
        capabilities: Capabilities,
    ) -> Self {
        capabilities.log_missing(&config.response);

        let server_software = if config.server.server_software.is_empty() {
            None
        } else {
            match HeaderValue::from_str(&config.server.server_software) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(
                        value = %config.server.server_software,
                        "Invalid SERVER_SOFTWARE, Server header disabled"
                    );
                    None
                }
            }
        };

        let active_connections = Arc::new(AtomicUsize::new(0));
        let ctx = Arc::new(ConnectionContext {
            handler: Arc::new(handler),
            response_config: Arc::new(config.response.clone()),
            capabilities,
            emitter: Emitter::new(&config.response),
            server_software,
            active_connections: Arc::clone(&active_connections),
        });

        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config: config.server.clone(),
            ctx,
            active_connections,
            shutdown_tx,
            shutdown_initiated: AtomicBool::new(false),
        }
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.config.listen_addr).await
    }

    /// Bind and serve until Ctrl+C or [`trigger_shutdown`](Self::trigger_shutdown).
    pub async fn run(&self) -> Result<(), BoxError> {
        let listener = self.bind().await?;

        tokio::select! {
            result = self.serve(listener) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                self.trigger_shutdown();
                Ok(())
            }
        }
    }

    /// Accept connections on `listener` until shutdown is triggered.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), BoxError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            return Ok(());
        }

        info!("Listening on http://{}", listener.local_addr()?);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Accept error: {}", e);
                            continue;
                        }
                    };

                    let _ = stream.set_nodelay(true);
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        ctx.handle_connection(stream, remote_addr).await;
                    });
                }
                _ = shutdown_rx.changed() => {
                    debug!("Received shutdown signal, stopping accept loop");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Stop accepting new connections. In-flight connections complete.
    pub fn trigger_shutdown(&self) {
        if self.shutdown_initiated.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown_tx.send_replace(true);
    }

    /// Get current active connections count.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }
}
