//! Signed ACME transport: composes the HTTP client, JWS signer, nonce
//! pool, and rate limiter into the `post`/`postAsGet` primitives every
//! higher-level operation builds on (spec §4.6).
use crate::config::RateLimitSettings;
use crate::error::{AcmeError, Result};
use crate::protocol::jws::JwsSigner;
use crate::protocol::nonce::NonceManager;
use crate::transport::http_client::{HttpClient, HttpClientConfig, HttpResponse};
use crate::transport::rate_limit::RateLimiter;
use serde_json::Value;
use std::sync::Arc;

/// A parsed ACME response: status, headers, and decoded body, plus the
/// convenience JSON accessor most callers want.
pub struct AcmeResponse {
    pub http: HttpResponse,
}

impl AcmeResponse {
    pub fn json(&self) -> Result<Value> {
        self.http
            .body
            .as_json()
            .cloned()
            .ok_or_else(|| AcmeError::Protocol {
                error_type: "malformed".to_string(),
                detail: "expected a JSON response body".to_string(),
                status: Some(self.http.status),
            })
    }

    pub fn location(&self) -> Option<&str> {
        self.http.header("location")
    }

    pub fn is_success(&self) -> bool {
        self.http.is_success()
    }
}

pub struct AcmeTransport {
    http: HttpClient,
    signer: Arc<JwsSigner>,
    nonces: Arc<NonceManager>,
    rate_limiter: RateLimiter,
}

impl AcmeTransport {
    pub fn new(
        signer: Arc<JwsSigner>,
        nonces: Arc<NonceManager>,
        rate_limit: &RateLimitSettings,
    ) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(HttpClientConfig::default())?,
            signer,
            nonces,
            rate_limiter: RateLimiter::new(rate_limit),
        })
    }

    pub fn signer(&self) -> &Arc<JwsSigner> {
        &self.signer
    }

    pub fn nonces(&self) -> &Arc<NonceManager> {
        &self.nonces
    }

    fn namespace(&self) -> String {
        self.signer.kid().unwrap_or(NonceManager::DEFAULT_NAMESPACE).to_string()
    }

    /// POST-as-GET: a signed request with an empty payload, per RFC 8555 §6.3.
    pub async fn post_as_get(&self, url: &str) -> Result<AcmeResponse> {
        self.post_impl(url, None).await
    }

    /// Signed POST with a JSON payload.
    pub async fn post(&self, url: &str, payload: &Value) -> Result<AcmeResponse> {
        self.post_impl(url, Some(payload)).await
    }

    async fn post_impl(&self, url: &str, payload: Option<&Value>) -> Result<AcmeResponse> {
        let endpoint = url.to_string();
        let namespace = self.namespace();
        self.rate_limiter
            .run(&endpoint, || self.attempt(url, &namespace, payload))
            .await
    }

    /// One signed round trip, with a single transparent retry on
    /// `badNonce` (the offending nonce is never reused; the pool is
    /// cleared before the retry fetches a fresh one).
    async fn attempt(&self, url: &str, namespace: &str, payload: Option<&Value>) -> Result<AcmeResponse> {
        match self.attempt_once(url, namespace, payload).await {
            Err(err) if matches!(err, AcmeError::BadNonce { .. }) => {
                self.nonces.clear(namespace).await;
                self.attempt_once(url, namespace, payload).await
            }
            other => other,
        }
    }

    async fn attempt_once(&self, url: &str, namespace: &str, payload: Option<&Value>) -> Result<AcmeResponse> {
        let nonce = self.nonces.get(namespace).await?;
        let jws = match payload {
            Some(value) => self.signer.sign(url, &nonce, value)?,
            None => self.signer.sign_empty(url, &nonce)?,
        };

        let response = self.http.post(url, "application/jose+json", jws.into_bytes()).await?;

        if let Some(replay_nonce) = response.header("replay-nonce") {
            self.nonces.put(namespace, replay_nonce.to_string()).await;
        }

        self.rate_limiter.note_response(url, &response).await;

        if !response.is_success() {
            return Err(crate::types::problem_to_error(&response));
        }

        Ok(AcmeResponse { http: response })
    }

    /// Unsigned GET, used for directory fetches and certificate download
    /// links that don't require authentication.
    pub async fn get(&self, url: &str) -> Result<AcmeResponse> {
        let response = self.http.get(url).await?;
        if !response.is_success() {
            return Err(crate::types::problem_to_error(&response));
        }
        Ok(AcmeResponse { http: response })
    }
}
