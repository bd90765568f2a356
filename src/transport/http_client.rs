//! HTTP transport: thin wrapper over reqwest with ACME-shaped responses.
use crate::error::{AcmeError, Result};
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!("acme-core/", env!("CARGO_PKG_VERSION"));

/// Decoded response body, by `Content-Type`.
#[derive(Debug, Clone)]
pub enum Body {
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl Body {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// An HTTP response, never raised as an error on non-2xx status — only
/// network/TLS failures fail the call.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lower-cased for case-insensitive lookup.
    pub headers: HashMap<String, String>,
    pub body: Body,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            follow_redirects: true,
            max_redirects: 10,
        }
    }
}

/// ACME-facing HTTP transport (spec's "HTTP transport" component).
pub struct HttpClient {
    client: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(config.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| AcmeError::connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.execute(self.client.get(url)).await
    }

    pub async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.execute(self.client.head(url)).await
    }

    pub async fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpResponse> {
        self.execute(
            self.client
                .post(url)
                .header("Content-Type", content_type)
                .body(body),
        )
        .await
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse> {
        let request = request.header(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_str(&self.config.user_agent)
                .unwrap_or_else(|_| reqwest::header::HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );

        let response = request
            .send()
            .await
            .map_err(|e| AcmeError::connection(format!("request failed: {e}")))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_ascii_lowercase(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let raw = response
            .bytes()
            .await
            .map_err(|e| AcmeError::connection(format!("failed to read response body: {e}")))?;

        let body = decode_body(&content_type, raw.to_vec());

        Ok(HttpResponse { status, headers, body })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

fn decode_body(content_type: &str, raw: Vec<u8>) -> Body {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("application/json") || content_type.contains("application/problem+json") {
        if let Ok(value) = serde_json::from_slice(&raw) {
            return Body::Json(value);
        }
    }
    if content_type.starts_with("text/") || content_type.contains("application/pem-certificate-chain") {
        if let Ok(text) = String::from_utf8(raw.clone()) {
            return Body::Text(text);
        }
    }
    Body::Bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_body_prefers_json_for_problem_content_type() {
        let body = decode_body("application/problem+json", br#"{"type":"x"}"#.to_vec());
        assert!(body.as_json().is_some());
    }

    #[test]
    fn decode_body_prefers_text_for_pem_chain() {
        let body = decode_body(
            "application/pem-certificate-chain",
            b"-----BEGIN CERTIFICATE-----".to_vec(),
        );
        assert!(body.as_text().is_some());
    }

    #[test]
    fn decode_body_falls_back_to_bytes() {
        let body = decode_body("application/octet-stream", vec![1, 2, 3]);
        assert!(matches!(body, Body::Bytes(_)));
    }

    #[tokio::test]
    async fn http_client_with_defaults_builds() {
        assert!(HttpClient::with_defaults().is_ok());
    }
}
