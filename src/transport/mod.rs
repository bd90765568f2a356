//! Transport layer: HTTP client, signed ACME transport, and rate limiting.

pub mod acme_transport;
pub mod http_client;
pub mod rate_limit;

pub use acme_transport::{AcmeResponse, AcmeTransport};
pub use http_client::{Body, HttpClient, HttpClientConfig, HttpResponse};
pub use rate_limit::RateLimiter;
