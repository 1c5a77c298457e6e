//! Emission without a network: wire output, buffers, header phase.

use std::io::Write;
use std::sync::Arc;

use leaf_http::config::{HostKind, ResponseConfig};
use leaf_http::core::{Body, ResponseBuilder};
use leaf_http::emit::{BufferFlags, CaptureTransport, Completion, Emitter, Transport, WireTransport};
use leaf_http::{dispatch, Context, Outcome};
use serde_json::json;

#[test]
fn test_wire_output_matches_rendering() {
    let mut res = ResponseBuilder::new();
    res.headers([("X-Frame-Options", "DENY"), ("Cache-Control", "no-store")])
        .json(&json!({"id": 7}), 201);

    let mut transport = WireTransport::new(Vec::new());
    Emitter::default().send(&res, &mut transport).unwrap();
    let out = transport.into_inner().unwrap();

    assert_eq!(out, res.to_wire().to_vec());
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "HTTP/1.1 201 Created\r\n\
         x-frame-options: DENY\r\n\
         cache-control: no-store\r\n\
         content-type: application/json\r\n\
         \r\n\
         {\"id\":7}"
    );
}

#[test]
fn test_header_map_emits_exactly_its_entries() {
    let mut res = ResponseBuilder::new();
    res.headers([("A", "1"), ("B", "2"), ("a", "3")]);

    let mut transport = CaptureTransport::new();
    Emitter::default().send_headers(&res, &mut transport).unwrap();

    let emitted: Vec<_> = transport
        .head()
        .headers
        .iter()
        .map(|(n, v)| (n.as_str(), v.to_str().unwrap()))
        .collect();
    assert_eq!(emitted, vec![("a", "3"), ("b", "2")]);
}

#[test]
fn test_header_phase_skipped_after_direct_output() {
    let mut res = ResponseBuilder::new();
    res.header("X-Late", "1").plain("body", 500);

    let mut transport = CaptureTransport::new();
    transport.write(b"already streaming ").unwrap();

    let emission = Emitter::default().send(&res, &mut transport).unwrap();

    assert!(!emission.headers_written);
    assert_eq!(transport.head().status, 200);
    assert!(!transport.head().headers.contains("x-late"));
    assert_eq!(transport.body(), b"already streaming body");
}

#[test]
fn test_completion_closes_removable_buffers_only() {
    let mut transport = CaptureTransport::new();
    transport.start_buffer("outer", BufferFlags::STDFLAGS);
    transport.start_buffer("locked", BufferFlags::FLUSHABLE | BufferFlags::CLEANABLE);
    transport.start_buffer("inner", BufferFlags::STDFLAGS);

    let mut res = ResponseBuilder::new();
    res.plain("held", 200);
    let emission = Emitter::default().send(&res, &mut transport).unwrap();

    assert_eq!(emission.completion, Completion::BuffersClosed { level: 2 });
    assert!(transport.body().is_empty());
    assert_eq!(transport.output().layers()[1].data(), b"held");
}

#[test]
fn test_large_attachment_is_streamed_exactly() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let contents: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    file.write_all(&contents).unwrap();
    file.flush().unwrap();

    let mut res = ResponseBuilder::new();
    res.plain("ignored", 200)
        .download(file.path(), Some("data.bin"), 200);
    assert!(matches!(res.body(), Body::File { .. }));

    let emitter = Emitter::new(&ResponseConfig {
        chunk_size: 1000,
        ..ResponseConfig::default()
    });
    let mut transport = CaptureTransport::new();
    let emission = emitter.send(&res, &mut transport).unwrap();

    assert_eq!(emission.body_bytes, contents.len() as u64);
    assert_eq!(transport.body(), contents.as_slice());
    assert_eq!(
        transport.head().headers.get("content-length"),
        Some(contents.len().to_string().as_str())
    );
}

#[test]
fn test_dispatch_through_wire_on_cli_host() {
    let config = Arc::new(ResponseConfig {
        host: HostKind::Cli,
        http_version: Some("HTTP/1.0".into()),
        ..ResponseConfig::default()
    });
    let handler = |ctx: &mut Context| -> Outcome {
        ctx.response().terminate("bye", 200)?;
        ctx.response().plain("unreachable", 500);
        Ok(())
    };

    let mut ctx = Context::builder(Arc::clone(&config)).build();
    let emitter = Emitter::new(&config);
    let mut transport = WireTransport::new(Vec::new());

    let dispatched = dispatch(&handler, &mut ctx, &emitter, &mut transport).unwrap();
    assert!(dispatched.halted);
    assert_eq!(
        dispatched.emission.map(|e| e.completion),
        Some(Completion::Skipped)
    );

    let out = String::from_utf8(transport.into_inner().unwrap()).unwrap();
    assert_eq!(out, "HTTP/1.0 200 OK\r\n\r\nbye");
}

#[test]
fn test_mutations_after_terminate_are_ignored() {
    let mut res = ResponseBuilder::new();
    let halt = res.terminate(json!([1, 2]), 409).unwrap_err();
    res.status(200).header("X-After", "1");

    assert_eq!(halt.status(), 409);
    assert!(res.is_halted());
    assert_eq!(res.status_code(), 409);
    assert!(res.get_header("x-after").is_none());

    let mut transport = CaptureTransport::with_finish_hook();
    let emission = Emitter::default().send(&res, &mut transport).unwrap();
    assert_eq!(emission.completion, Completion::Finished);
    assert_eq!(transport.body(), b"[1,2]");
}
