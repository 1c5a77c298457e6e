use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method};
use tracing::info;

use leaf_http::config::HostKind;
use leaf_http::emit::{Emitter, WireTransport};
use leaf_http::helpers::{request_param, respond, response};
use leaf_http::{dispatch, Config, Context, Outcome, Request, Server};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Demo handler exercising the common response shapes.
fn demo(ctx: &mut Context) -> Outcome {
    let path = ctx.request().path().to_string();

    match path.as_str() {
        "/" => {
            let name = request_param(ctx, "name").unwrap_or("world").to_string();
            respond(ctx, &serde_json::json!({ "hello": name }));
        }
        "/status" => {
            response(ctx).json_with_status(&serde_json::json!({ "version": leaf_http::VERSION }), 200);
        }
        "/text" => {
            response(ctx).plain("plain text", 200);
        }
        "/old" => {
            response(ctx).redirect("/", 302);
        }
        "/empty" => {
            response(ctx).no_content();
        }
        "/private" => {
            if request_param(ctx, "token").is_none() {
                response(ctx).terminate(serde_json::json!({ "error": "token required" }), 401)?;
            }
            response(ctx).plain("secret", 200);
        }
        _ => {
            response(ctx).json_with_status(&serde_json::Value::Null, 404);
        }
    }

    Ok(())
}

/// Answer a single GET request on stdout as raw HTTP.
fn run_once(config: &Config, target: &str) -> Result<(), BoxError> {
    let request = Request::new(Method::GET, target.parse()?, HeaderMap::new(), Bytes::new());
    let mut ctx = Context::builder(Arc::new(config.response.clone()))
        .request(request)
        .build();

    let emitter = Emitter::new(&config.response);
    let mut transport = WireTransport::new(std::io::stdout().lock());
    dispatch(&demo, &mut ctx, &emitter, &mut transport)?;
    transport.into_inner()?.flush()?;
    Ok(())
}

fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    leaf_http::logging::init(&config.logging)?;

    if config.response.host == HostKind::Cli {
        let target = std::env::args().nth(1).unwrap_or_else(|| "/".to_string());
        return run_once(&config, &target);
    }

    info!("Starting leaf_http {}", leaf_http::VERSION);
    config.log_summary();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let server = Server::new(&config, demo);
        server.run().await
    })
}
