//! Per-connection request handling.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body as _, Incoming as IncomingBody};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::{debug, error, warn};

use crate::capability::Capabilities;
use crate::config::ResponseConfig;
use crate::core::{generate_request_id, Context, Request, Result};
use crate::emit::{CaptureTransport, Emitter};
use crate::handler::{dispatch, Handler};
use crate::logging::{log_access, AccessRecord};

const X_REQUEST_ID: &str = "x-request-id";

/// Shared state for every connection of a server.
pub(crate) struct ConnectionContext {
    pub handler: Arc<dyn Handler>,
    pub response_config: Arc<ResponseConfig>,
    pub capabilities: Capabilities,
    pub emitter: Emitter,
    pub server_software: Option<HeaderValue>,
    pub active_connections: Arc<AtomicUsize>,
}

/// Response produced on the blocking pool.
struct Handled {
    response: http::Response<Full<Bytes>>,
    halted: bool,
}

impl ConnectionContext {
    /// Serve HTTP/1 requests on one connection until the client closes it.
    pub async fn handle_connection(self: Arc<Self>, stream: TcpStream, remote_addr: SocketAddr) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);

        let ctx = Arc::clone(&self);
        let service = service_fn(move |req| {
            let ctx = Arc::clone(&ctx);
            async move { Ok::<_, Infallible>(ctx.handle_request(req, remote_addr).await) }
        });

        let io = TokioIo::new(stream);
        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
            debug!(peer = %remote_addr, error = %e, "Connection error");
        }

        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Handle one request: collect the body, dispatch on the blocking pool,
    /// log access.
    pub async fn handle_request(
        self: Arc<Self>,
        req: http::Request<IncomingBody>,
        remote_addr: SocketAddr,
    ) -> http::Response<Full<Bytes>> {
        let started = Instant::now();
        let request_id = generate_request_id();
        let (parts, body) = req.into_parts();

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(peer = %remote_addr, request_id = %request_id, error = %e, "Failed to read request body");
                return self.finish(plain_response(StatusCode::BAD_REQUEST), &request_id);
            }
        };

        let request: Request = http::Request::from_parts(parts, body).into();
        let method = request.method().to_string();
        let path = request.path().to_string();
        let query = request.query().map(str::to_string);
        let protocol = request.protocol();

        let ctx = Arc::clone(&self);
        let id = request_id.clone();
        let outcome =
            tokio::task::spawn_blocking(move || ctx.run_handler(request, remote_addr, id)).await;

        let (response, halted) = match outcome {
            Ok(Ok(handled)) => (handled.response, handled.halted),
            Ok(Err(e)) => {
                error!(path = %path, request_id = %request_id, error = %e, "Failed to emit response");
                (plain_response(StatusCode::INTERNAL_SERVER_ERROR), false)
            }
            Err(e) => {
                error!(path = %path, request_id = %request_id, error = %e, "Handler panicked");
                (plain_response(StatusCode::INTERNAL_SERVER_ERROR), false)
            }
        };

        let response = self.finish(response, &request_id);
        let ip = remote_addr.ip().to_string();
        log_access(&AccessRecord {
            request_id: &request_id,
            ip: Some(&ip),
            method: &method,
            path: &path,
            query: query.as_deref(),
            http: protocol,
            status: response.status().as_u16(),
            bytes: response.body().size_hint().exact().unwrap_or(0),
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            halted,
        });

        response
    }

    /// Build a context, dispatch the handler and capture the response.
    fn run_handler(
        &self,
        request: Request,
        remote_addr: SocketAddr,
        request_id: String,
    ) -> Result<Handled> {
        let mut ctx = Context::builder(Arc::clone(&self.response_config))
            .capabilities(self.capabilities.clone())
            .request(request)
            .client_ip(remote_addr.ip())
            .request_id(request_id)
            .build();

        let mut transport = CaptureTransport::with_finish_hook();
        let dispatched = dispatch(&*self.handler, &mut ctx, &self.emitter, &mut transport)?;
        let response = transport.into_http_response()?;

        Ok(Handled {
            response,
            halted: dispatched.halted,
        })
    }

    /// Add the request id and server-wide headers.
    fn finish(
        &self,
        mut response: http::Response<Full<Bytes>>,
        request_id: &str,
    ) -> http::Response<Full<Bytes>> {
        if let Ok(value) = HeaderValue::from_str(request_id) {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }

        if let Some(ref software) = self.server_software {
            let headers = response.headers_mut();
            if !headers.contains_key(header::SERVER) {
                headers.insert(header::SERVER, software.clone());
            }
        }
        response
    }
}

/// Plain-text response with the status reason as body.
fn plain_response(status: StatusCode) -> http::Response<Full<Bytes>> {
    let body = status.canonical_reason().unwrap_or("Error");
    let mut response = http::Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_response() {
        let res = plain_response(StatusCode::BAD_REQUEST);
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(res.body().size_hint().exact(), Some(11));
    }

    fn connection(handler: impl Handler + 'static) -> ConnectionContext {
        ConnectionContext {
            handler: Arc::new(handler),
            response_config: Arc::new(ResponseConfig::default()),
            capabilities: Capabilities::none(),
            emitter: Emitter::default(),
            server_software: Some(HeaderValue::from_static("test")),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[test]
    fn test_run_handler_captures_response() {
        let ctx = connection(|ctx: &mut Context| -> crate::core::Outcome {
            assert_eq!(ctx.request_id, "req-42");
            let name = ctx.request().get("name").unwrap_or("world").to_string();
            ctx.response().plain(format!("hello {}", name), 200);
            Ok(())
        });

        let request: Request = http::Request::builder()
            .uri("/greet?name=leaf")
            .body(Bytes::new())
            .unwrap()
            .into();
        let handled = ctx
            .run_handler(request, "127.0.0.1:1234".parse().unwrap(), "req-42".into())
            .unwrap();
        let response = ctx.finish(handled.response, "req-42");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::SERVER], "test");
        assert_eq!(response.headers()["x-request-id"], "req-42");
        assert_eq!(response.body().size_hint().exact(), Some(10));
        assert!(!handled.halted);
    }

    #[tokio::test]
    async fn test_panicking_handler_keeps_request_id() {
        let ctx = Arc::new(connection(|_: &mut Context| -> crate::core::Outcome {
            panic!("handler failed");
        }));

        let request: Request = http::Request::builder()
            .uri("/boom")
            .body(Bytes::new())
            .unwrap()
            .into();
        let worker = Arc::clone(&ctx);
        let outcome = tokio::task::spawn_blocking(move || {
            worker.run_handler(request, "127.0.0.1:1234".parse().unwrap(), "req-7".into())
        })
        .await;
        assert!(outcome.is_err());

        let response = ctx.finish(plain_response(StatusCode::INTERNAL_SERVER_ERROR), "req-7");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-request-id"], "req-7");
        assert_eq!(response.headers()[header::SERVER], "test");
    }
}
