//! Test helpers and utilities

use std::sync::Arc;
use std::time::Duration;

use leaf_http::capability::Capabilities;
use leaf_http::config::{LoggingConfig, ResponseConfig, ServerConfig};
use leaf_http::{Config, Handler, Server};
use reqwest::{Client, Response, StatusCode};
use tokio::net::TcpListener;

/// In-process server bound to an ephemeral port.
///
/// Shutdown is triggered when the value is dropped.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    server: Arc<Server>,
}

#[allow(dead_code)]
impl TestServer {
    /// Start a server with default configuration and no capabilities.
    pub async fn start(handler: impl Handler) -> Self {
        Self::start_with(test_config(), handler, Capabilities::none()).await
    }

    /// Start a server with explicit configuration and capabilities.
    pub async fn start_with(
        config: Config,
        handler: impl Handler,
        capabilities: Capabilities,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let server = Arc::new(Server::with_capabilities(&config, handler, capabilities));
        let background = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = background.serve(listener).await;
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{}", addr),
            client,
            server,
        }
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// Make a POST request with form data
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.trigger_shutdown();
    }
}

/// Configuration used by server tests.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig::new("127.0.0.1:0".parse().expect("valid address"))
            .with_server_software("leaf_http-test"),
        response: ResponseConfig::default(),
        logging: LoggingConfig::default(),
    }
}

/// Assert that response has expected status
pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Assert that response contains header
pub fn assert_header(response: &Response, name: &str, expected: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap();
    assert_eq!(value, expected, "Header '{}' mismatch", name);
}

/// Assert that response has header present
pub fn assert_has_header(response: &Response, name: &str) {
    assert!(
        response.headers().contains_key(name),
        "Header '{}' not found",
        name
    );
}

/// All values of a header, in order.
pub fn header_values(response: &Response, name: &str) -> Vec<String> {
    response
        .headers()
        .get_all(name)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}
