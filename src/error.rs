//! Typed error taxonomy for the ACME client.
//!
//! RFC 7807 problem documents returned by the CA are mapped onto this
//! enum by [`crate::types::AcmeErrorDetail::into_typed`]. Transport,
//! timing, and local-state failures that never reach the wire get their
//! own variants alongside the protocol-error ones.
use thiserror::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, AcmeError>;

/// URN prefix every ACME problem `type` field is expected to carry.
pub const ACME_ERROR_URN_PREFIX: &str = "urn:ietf:params:acme:error:";

/// A single RFC 7807 problem, typed by its `urn:ietf:params:acme:error:*` suffix,
/// plus the local failure modes (transport, timing, crypto) that never
/// reach the wire as a problem document.
#[derive(Error, Debug, Clone)]
pub enum AcmeError {
    #[error("account does not exist: {detail}")]
    AccountDoesNotExist { detail: String },

    #[error("certificate already revoked: {detail}")]
    AlreadyRevoked { detail: String },

    #[error("bad CSR: {detail}")]
    BadCsr { detail: String },

    #[error("bad nonce: {detail}")]
    BadNonce { detail: String },

    #[error("bad public key: {detail}")]
    BadPublicKey { detail: String },

    #[error("bad revocation reason: {detail}")]
    BadRevocationReason { detail: String },

    /// Carries the server's supported-algorithms list, per spec §4.5.
    #[error("bad signature algorithm: {detail} (supported: {algorithms:?})")]
    BadSignatureAlgorithm {
        detail: String,
        algorithms: Vec<String>,
    },

    #[error("CAA record forbids issuance: {detail}")]
    Caa { detail: String },

    /// Fallback for a problem with subproblems and no (or an unrecognized) `type`.
    #[error("{detail} ({})", format_subproblems(.subproblems))]
    Compound {
        detail: String,
        subproblems: Vec<AcmeError>,
    },

    #[error("DNS problem: {detail}")]
    Dns { detail: String },

    #[error("external account required: {detail}")]
    ExternalAccountRequired { detail: String },

    #[error("incorrect response: {detail}")]
    IncorrectResponse { detail: String },

    #[error("invalid contact: {detail}")]
    InvalidContact { detail: String },

    #[error("malformed request: {detail}")]
    Malformed { detail: String },

    #[error("order not ready: {detail}")]
    OrderNotReady { detail: String },

    /// The CA itself asked us to back off (status 429/`rateLimited` type).
    #[error("rate limited by server: {detail}")]
    RateLimitedByServer {
        detail: String,
        retry_after: Option<u64>,
    },

    #[error("rejected identifier: {detail}")]
    RejectedIdentifier { detail: String },

    /// `serverInternal` that looked like scheduled maintenance rather than a bug.
    #[error("server is under maintenance: {detail}")]
    ServerMaintenance { detail: String },

    #[error("server internal error: {detail}")]
    ServerInternal { detail: String },

    #[error("TLS problem: {detail}")]
    Tls { detail: String },

    #[error("unauthorized: {detail}")]
    UnauthorizedProblem { detail: String },

    #[error("unsupported contact: {detail}")]
    UnsupportedContact { detail: String },

    #[error("unsupported identifier: {detail}")]
    UnsupportedIdentifier { detail: String },

    #[error("user action required: {detail} (see {instance:?})")]
    UserActionRequired {
        detail: String,
        instance: Option<String>,
    },

    /// A challenge type invalid for the authorization's identifier (e.g.
    /// http-01/tls-alpn-01 selected for a wildcard authorization).
    #[error("challenge type not supported for this identifier: {0}")]
    ChallengeNotSupported(String),

    /// An unrecognized `urn:ietf:params:acme:error:*` type.
    #[error("ACME problem [{error_type}]: {detail}")]
    Protocol {
        error_type: String,
        detail: String,
        status: Option<u16>,
    },

    /// Network or TLS-handshake level failure reaching the CA.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The local rate limiter exhausted its retry budget.
    #[error("rate limit exhausted on {endpoint} after {attempts} attempts")]
    RateLimited {
        endpoint: String,
        retry_after_unix_ms: Option<u64>,
        retry_delay_seconds: Option<u64>,
        attempts: u32,
    },

    /// A nonce waiter timed out before a nonce became available.
    #[error("timed out waiting for a nonce after {0:?}")]
    NonceTimeout(std::time::Duration),

    /// Local precondition violated (e.g. signing before an account key is bound).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Order/authorization polling exceeded its attempt budget.
    #[error("polling timed out: {resource} last observed status {last_status}")]
    PollingTimeout {
        resource: String,
        last_status: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("PEM error: {0}")]
    Pem(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

fn format_subproblems(subproblems: &[AcmeError]) -> String {
    subproblems
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. [{}]", i + 1, e))
        .collect::<Vec<_>>()
        .join(" ")
}

impl From<std::io::Error> for AcmeError {
    fn from(e: std::io::Error) -> Self {
        AcmeError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AcmeError {
    fn from(e: serde_json::Error) -> Self {
        AcmeError::Json(e.to_string())
    }
}

impl AcmeError {
    pub fn crypto<S: Into<String>>(msg: S) -> Self {
        AcmeError::Crypto(msg.into())
    }

    pub fn certificate<S: Into<String>>(msg: S) -> Self {
        AcmeError::Certificate(msg.into())
    }

    pub fn pem<S: Into<String>>(msg: S) -> Self {
        AcmeError::Pem(msg.into())
    }

    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        AcmeError::Configuration(msg.into())
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        AcmeError::InvalidInput(msg.into())
    }

    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        AcmeError::Unauthorized(msg.into())
    }

    pub fn connection<S: Into<String>>(msg: S) -> Self {
        AcmeError::Connection(msg.into())
    }

    pub fn protocol<S: Into<String>>(error_type: S, detail: S, status: Option<u16>) -> Self {
        AcmeError::Protocol {
            error_type: error_type.into(),
            detail: detail.into(),
            status,
        }
    }

    /// True if this is the maintenance-window flavor of `serverInternal`.
    pub fn is_maintenance(&self) -> bool {
        matches!(self, AcmeError::ServerMaintenance { .. })
    }

    pub fn is_server_rate_limited(&self) -> bool {
        matches!(self, AcmeError::RateLimitedByServer { .. })
    }

    pub fn is_bad_nonce(&self) -> bool {
        matches!(self, AcmeError::BadNonce { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_error_display_enumerates_subproblems() {
        let err = AcmeError::Compound {
            detail: "Errors during validation".to_string(),
            subproblems: vec![
                AcmeError::IncorrectResponse {
                    detail: "resp mismatch 1".to_string(),
                },
                AcmeError::IncorrectResponse {
                    detail: "resp mismatch 2".to_string(),
                },
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("1. ["));
        assert!(rendered.contains("2. ["));
    }

    #[test]
    fn maintenance_classification() {
        let err = AcmeError::ServerMaintenance {
            detail: "Service is down for maintenance".to_string(),
        };
        assert!(err.is_maintenance());
    }
}
