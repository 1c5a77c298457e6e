//! leaf_http - HTTP response building and emission.
//!
//! Handlers describe a response with a fluent [`ResponseBuilder`]; nothing is
//! written until the response is handed to an [`Emitter`], which writes the
//! head, the body and then ends the request on a [`Transport`].
//!
//! # Features
//!
//! - **Deferred builder**: setters only record status, headers and body
//! - **Attachments**: files are streamed in chunks at emission time
//! - **Early termination**: `terminate` returns a [`Halt`] that `?` propagates
//! - **Output buffers**: nested buffer layers flushed on completion
//! - **Optional capabilities**: cookies, flash messages, page rendering
//! - **HTTP server**: hyper-based server running one handler per request
//!
//! # Example
//!
//! ```rust,ignore
//! use leaf_http::{Config, Context, Outcome, Server};
//!
//! fn hello(ctx: &mut Context) -> Outcome {
//!     ctx.response().json(&serde_json::json!({"hello": "world"}), 200);
//!     Ok(())
//! }
//!
//! let config = Config::from_env()?;
//! Server::new(&config, hello).run().await?;
//! ```
//!
//! [`ResponseBuilder`]: core::ResponseBuilder
//! [`Emitter`]: emit::Emitter
//! [`Transport`]: emit::Transport
//! [`Halt`]: core::Halt

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git commit hash, empty when built outside a checkout
pub const BUILD_VERSION: &str = env!("BUILD_VERSION");

/// Full version string: "0.1.0 (abc12345)"
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_VERSION"), ")");

pub mod capability;
pub mod config;
pub mod core;
pub mod emit;
pub mod handler;
pub mod helpers;
pub mod logging;
pub mod server;

// Re-exports for convenience
pub use crate::config::Config;
pub use crate::core::{Context, Halt, Outcome, Request, ResponseBuilder};
pub use crate::handler::{dispatch, Handler};
pub use crate::server::Server;
