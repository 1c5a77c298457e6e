//! Cookies, flash messages, pages and downloads served over HTTP.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use leaf_http::capability::{Capabilities, FilePages, MemoryFlash, StandardCookies};
use leaf_http::helpers::response;
use leaf_http::{Context, Outcome};
use reqwest::StatusCode;

use crate::helpers::*;

#[tokio::test]
async fn test_cookies_are_set_and_cleared() {
    let handler = |ctx: &mut Context| -> Outcome {
        response(ctx)
            .cookie("theme", "dark")
            .cookie_for("session", "a b", "1 hour")
            .clear_cookie("legacy")
            .plain("ok", 200);
        Ok(())
    };

    let caps = Capabilities::none().with_cookies(Arc::new(StandardCookies::new()));
    let server = TestServer::start_with(test_config(), handler, caps).await;
    let resp = server.get("/").await;

    assert_status(&resp, StatusCode::OK);
    let cookies = header_values(&resp, "set-cookie");
    assert_eq!(cookies.len(), 3);
    assert!(cookies[0].starts_with("theme=dark; Max-Age=604800"));
    assert!(cookies[1].starts_with("session=a%20b; Max-Age=3600"));
    assert!(cookies[2].starts_with("legacy=; Max-Age=0"));
}

#[tokio::test]
async fn test_missing_cookie_support_degrades() {
    let handler = |ctx: &mut Context| -> Outcome {
        response(ctx).cookie("theme", "dark").plain("still here", 200);
        Ok(())
    };

    let server = TestServer::start(handler).await;
    let resp = server.get("/").await;

    assert_status(&resp, StatusCode::OK);
    assert!(header_values(&resp, "set-cookie").is_empty());
    assert_eq!(resp.text().await.unwrap(), "still here");
}

#[tokio::test]
async fn test_flash_reaches_store() {
    let flash = Arc::new(MemoryFlash::new());
    let handler = |ctx: &mut Context| -> Outcome {
        response(ctx)
            .flash_all([("notice", "saved"), ("level", "info")])
            .redirect("/done", 303);
        Ok(())
    };

    let caps = Capabilities::none().with_flash(flash.clone());
    let server = TestServer::start_with(test_config(), handler, caps).await;
    let resp = server.get("/save").await;

    assert_status(&resp, StatusCode::SEE_OTHER);
    assert_eq!(flash.get("notice").as_deref(), Some("saved"));
    assert_eq!(flash.get("level").as_deref(), Some("info"));
}

#[tokio::test]
async fn test_flash_carries_to_next_request() {
    let handler = |ctx: &mut Context| -> Outcome {
        if ctx.request().path() == "/save" {
            response(ctx).flash("notice", "saved; thanks").redirect("/done", 303);
        } else {
            let notice = ctx.flashed("notice").unwrap_or("none").to_string();
            response(ctx).plain(notice, 200);
        }
        Ok(())
    };

    let server = TestServer::start(handler).await;
    let saved = server.get("/save").await;
    assert_status(&saved, StatusCode::SEE_OTHER);

    let cookies = header_values(&saved, "set-cookie");
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("leaf_flash="));
    let pair = cookies[0].split(';').next().unwrap().to_string();

    let done = server
        .client
        .get(format!("{}/done", server.base_url))
        .header("cookie", pair)
        .send()
        .await
        .unwrap();
    assert_status(&done, StatusCode::OK);
    let cleared = header_values(&done, "set-cookie");
    assert!(cleared[0].starts_with("leaf_flash=; Max-Age=0"));
    assert_eq!(done.text().await.unwrap(), "saved; thanks");

    let other = server.get("/done").await;
    assert!(header_values(&other, "set-cookie").is_empty());
    assert_eq!(other.text().await.unwrap(), "none");
}

#[tokio::test]
async fn test_page_rendering() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("home.html"), "<h1>Home</h1>").unwrap();

    let handler = |ctx: &mut Context| -> Outcome {
        response(ctx).page("home.html", 200);
        Ok(())
    };

    let caps = Capabilities::none().with_pages(Arc::new(FilePages::new(Some(
        dir.path().to_path_buf(),
    ))));
    let server = TestServer::start_with(test_config(), handler, caps).await;
    let resp = server.get("/").await;

    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "content-type", "text/html");
    assert_eq!(resp.text().await.unwrap(), "<h1>Home</h1>");
}

#[tokio::test]
async fn test_download_streams_file() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    let contents: Vec<u8> = (0..20_000u32).flat_map(|i| i.to_le_bytes()).collect();
    file.write_all(&contents).unwrap();
    file.flush().unwrap();

    let path: PathBuf = file.path().to_path_buf();
    let handler = move |ctx: &mut Context| -> Outcome {
        response(ctx).download(&path, Some("export.csv"), 200);
        Ok(())
    };

    let server = TestServer::start(handler).await;
    let resp = server.get("/export").await;

    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "content-type", "text/csv");
    assert_header(&resp, "content-disposition", "attachment; filename=export.csv");
    assert_header(&resp, "content-length", &contents.len().to_string());
    assert_eq!(resp.bytes().await.unwrap().as_ref(), contents.as_slice());
}

#[tokio::test]
async fn test_download_of_missing_file_sends_empty_body() {
    let handler = |ctx: &mut Context| -> Outcome {
        response(ctx).download("/no/such/file.txt", None, 200);
        Ok(())
    };

    let server = TestServer::start(handler).await;
    let resp = server.get("/").await;

    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "content-type", "text/html");
    assert_header(&resp, "content-disposition", "attachment; filename=file.txt");
    assert!(resp.bytes().await.unwrap().is_empty());
}
