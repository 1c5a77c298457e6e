//! Integration tests for leaf_http
//!
//! Server tests start an in-process server on an ephemeral port and talk to
//! it with reqwest; emission tests drive the emitter directly.
//!
//! Run with: cargo test --test integration

mod helpers;

mod capabilities;
mod emission;
mod http_basic;
