//! HTTP adapters for the supported provider API families
//!
//! Each adapter owns a shared [`reqwest::Client`] and turns one wrapped
//! prompt into one request. Retries and fan-out are the router's concern;
//! adapters report a single attempt.

pub mod anthropic;
pub mod google;
pub mod openai_compat;

pub use anthropic::AnthropicAdapter;
pub use google::GoogleAdapter;
pub use openai_compat::OpenAiCompatibleAdapter;

use delib_application::{ProviderError, ProviderRegistry};
use delib_domain::ModelConfig;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Per-request timeout used when none is configured
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the HTTP client shared by every adapter
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// A registry with an adapter for every provider family
pub fn default_registry(client: reqwest::Client) -> ProviderRegistry {
    ProviderRegistry::new()
        .with(Arc::new(AnthropicAdapter::new(client.clone())))
        .with(Arc::new(OpenAiCompatibleAdapter::openai(client.clone())))
        .with(Arc::new(GoogleAdapter::new(client.clone())))
        .with(Arc::new(OpenAiCompatibleAdapter::deepseek(client)))
}

/// The participant's credential, or the error that stops the call
pub(crate) fn require_credential(config: &ModelConfig) -> Result<&str, ProviderError> {
    config
        .credential()
        .ok_or(ProviderError::MissingCredential(config.provider))
}

/// Base URL from the participant config, falling back to the provider default
pub(crate) fn base_url<'a>(config: &'a ModelConfig, default: &'a str) -> &'a str {
    config
        .base_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
}

/// Send a request and decode a successful JSON body.
///
/// Non-2xx statuses become [`ProviderError::Status`] carrying the body text.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(transport_error)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Connection(e.to_string())
    }
}

/// One-shot HTTP server for exercising adapters without a network
#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve a single response; the handle yields the raw request text
    pub(crate) async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if is_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{addr}"), handle)
    }

    fn is_complete(request: &[u8]) -> bool {
        let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&request[..end]).to_lowercase();
        let length = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= end + 4 + length
    }
}
