//! Basic HTTP tests: JSON, text, redirects, early termination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use leaf_http::helpers::{request_param, respond, response};
use leaf_http::{Context, Outcome};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::*;

fn app(ctx: &mut Context) -> Outcome {
    let path = ctx.request().path().to_string();

    match path.as_str() {
        "/hello" => {
            let name = request_param(ctx, "name").unwrap_or("world").to_string();
            respond(ctx, &json!({ "hello": name }));
        }
        "/text" => {
            response(ctx).plain("plain text", 200);
        }
        "/xml" => {
            response(ctx).xml("<ok/>", 200);
        }
        "/old" => {
            response(ctx).redirect("/hello", 302);
        }
        "/empty" => {
            response(ctx).no_content();
        }
        "/gone" => {
            response(ctx).json_with_status(&"gone", 404);
        }
        "/tags" => {
            response(ctx)
                .header_with("X-Tag", "a", false, 200)
                .header_with("X-Tag", "b", false, 200)
                .headers([("X-Single", "1"), ("X-Single", "2")])
                .plain("tagged", 200);
        }
        "/teapot" => {
            response(ctx).header_with("X-Brew", "no", true, 418).plain("short and stout", 418);
        }
        _ => {
            response(ctx).json_with_status(&Value::Null, 404);
        }
    }

    Ok(())
}

#[tokio::test]
async fn test_json_response() {
    let server = TestServer::start(app).await;
    let resp = server.get("/hello?name=leaf").await;

    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "content-type", "application/json");
    assert_header(&resp, "server", "leaf_http-test");
    assert_has_header(&resp, "x-request-id");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "hello": "leaf" }));
}

#[tokio::test]
async fn test_form_parameters() {
    let server = TestServer::start(app).await;
    let resp = server.post_form("/hello", &[("name", "form user")]).await;

    assert_status(&resp, StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["hello"], "form user");
}

#[tokio::test]
async fn test_plain_and_xml() {
    let server = TestServer::start(app).await;

    let resp = server.get("/text").await;
    assert_header(&resp, "content-type", "text/plain");
    assert_eq!(resp.text().await.unwrap(), "plain text");

    let resp = server.get("/xml").await;
    assert_header(&resp, "content-type", "application/xml");
    assert_eq!(resp.text().await.unwrap(), "<ok/>");
}

#[tokio::test]
async fn test_redirect() {
    let server = TestServer::start(app).await;
    let resp = server.get("/old").await;

    assert_status(&resp, StatusCode::FOUND);
    assert_header(&resp, "location", "/hello");
    assert!(resp.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_no_content() {
    let server = TestServer::start(app).await;
    let resp = server.get("/empty").await;

    assert_status(&resp, StatusCode::NO_CONTENT);
    assert!(resp.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_json_status_envelope() {
    let server = TestServer::start(app).await;
    let resp = server.get("/gone").await;

    assert_status(&resp, StatusCode::NOT_FOUND);
    assert_eq!(
        resp.text().await.unwrap(),
        r#"{"data":"gone","status":{"code":404,"message":"Not Found"}}"#
    );
}

#[tokio::test]
async fn test_repeated_headers() {
    let server = TestServer::start(app).await;
    let resp = server.get("/tags").await;

    assert_eq!(header_values(&resp, "x-tag"), vec!["a", "b"]);
    assert_eq!(header_values(&resp, "x-single"), vec!["2"]);
}

#[tokio::test]
async fn test_header_with_status() {
    let server = TestServer::start(app).await;
    let resp = server.get("/teapot").await;

    assert_eq!(resp.status().as_u16(), 418);
    assert_header(&resp, "x-brew", "no");
}

#[tokio::test]
async fn test_terminate_stops_handler() {
    let reached = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&reached);

    let handler = move |ctx: &mut Context| -> Outcome {
        if request_param(ctx, "token").is_none() {
            response(ctx).terminate(json!({ "error": "token required" }), 401)?;
        }
        flag.store(true, Ordering::SeqCst);
        response(ctx).plain("secret", 200);
        Ok(())
    };

    let server = TestServer::start(handler).await;

    let resp = server.get("/private").await;
    assert_status(&resp, StatusCode::UNAUTHORIZED);
    assert_header(&resp, "content-type", "application/json");
    assert_eq!(resp.text().await.unwrap(), r#"{"error":"token required"}"#);
    assert!(!reached.load(Ordering::SeqCst));

    let resp = server.get("/private?token=t").await;
    assert_status(&resp, StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "secret");
    assert!(reached.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_terminate_with_text() {
    let handler = |ctx: &mut Context| -> Outcome {
        response(ctx).terminate("maintenance", 503)?;
        Ok(())
    };

    let server = TestServer::start(handler).await;
    let resp = server.get("/").await;

    assert_status(&resp, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.text().await.unwrap(), "maintenance");
}
