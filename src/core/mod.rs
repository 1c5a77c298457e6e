//! Core types for building HTTP responses.
//!
//! - [`ResponseBuilder`] - accumulates status, headers and body
//! - [`Request`] - the request being answered
//! - [`Context`] - owns both for one in-flight request
//! - [`Error`] - core error types
//!
//! # Example
//!
//! ```rust,ignore
//! use leaf_http::core::{Context, Outcome};
//!
//! fn handle(ctx: &mut Context) -> Outcome {
//!     if ctx.request().get("token").is_none() {
//!         ctx.response().terminate("unauthorized", 401)?;
//!     }
//!     ctx.response().json(&serde_json::json!({"ok": true}), 200);
//!     Ok(())
//! }
//! ```

mod body;
mod context;
mod error;
mod headers;
mod request;
mod response;
mod status;

pub use body::{Body, Encoding};
pub use context::{generate_request_id, Context, ContextBuilder};
pub use error::{Error, Result};
pub use headers::{header_pair, HeaderBag};
pub use request::{parse_cookies, parse_query_string, ParamList, Request};
pub use response::{Halt, Outcome, ResponseBuilder, Warning};
pub use status::{message_for_code, status_text_for, UNKNOWN_STATUS};
