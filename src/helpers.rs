//! Shortcut accessors for handlers.
//!
//! ```rust,ignore
//! use leaf_http::helpers::{request_param, respond};
//!
//! fn greet(ctx: &mut Context) -> Outcome {
//!     let name = request_param(ctx, "name").unwrap_or("world").to_string();
//!     respond(ctx, &serde_json::json!({ "hello": name }));
//!     Ok(())
//! }
//! ```

use serde::Serialize;

use crate::core::{Context, Request, ResponseBuilder};

/// The request of this context.
#[inline]
pub fn request(ctx: &mut Context) -> &Request {
    ctx.request()
}

/// A query or form parameter of the request.
#[inline]
pub fn request_param<'a>(ctx: &'a mut Context, key: &str) -> Option<&'a str> {
    ctx.request().get(key)
}

/// The response builder of this context.
#[inline]
pub fn response(ctx: &mut Context) -> &mut ResponseBuilder {
    ctx.response()
}

/// Respond with `data` as JSON and status 200.
#[inline]
pub fn respond<'a, T: Serialize + ?Sized>(ctx: &'a mut Context, data: &T) -> &'a mut ResponseBuilder {
    ctx.response().json(data, 200)
}
