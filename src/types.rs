/// Common types and structures for ACME protocol
use crate::error::AcmeError;
use crate::transport::http_client::HttpResponse;
use serde::{Deserialize, Serialize};

/// Map a non-2xx HTTP response to a typed [`AcmeError`], parsing an RFC
/// 7807 problem document from the body when present and falling back to
/// a generic protocol error otherwise (spec §4.5).
pub fn problem_to_error(response: &HttpResponse) -> AcmeError {
    let retry_after = response
        .header("retry-after")
        .and_then(|h| h.parse::<u64>().ok());

    match response.body.as_json() {
        Some(json) => match serde_json::from_value::<AcmeErrorDetail>(json.clone()) {
            Ok(detail) => {
                let mut err = detail.into_typed();
                if let AcmeError::RateLimitedByServer { retry_after: ra, .. } = &mut err {
                    *ra = retry_after;
                }
                err
            }
            Err(_) => AcmeError::Protocol {
                error_type: String::new(),
                detail: response.body.as_text().map(str::to_string).unwrap_or_default(),
                status: Some(response.status),
            },
        },
        None => {
            if response.status == 429 {
                AcmeError::RateLimitedByServer {
                    detail: "server returned 429 with no problem document".to_string(),
                    retry_after,
                }
            } else {
                AcmeError::Protocol {
                    error_type: String::new(),
                    detail: format!("HTTP {}", response.status),
                    status: Some(response.status),
                }
            }
        }
    }
}

/// JWS protected header, as sent on the wire. Exactly one of `jwk`/`kid`
/// is populated per spec §4.2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    pub nonce: String,
    pub url: String,
}

/// RFC 7807 problem document as returned by the CA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcmeErrorDetail {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subproblems: Option<Vec<AcmeSubproblem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithms: Option<Vec<String>>,
}

/// A subproblem nested inside a `compound` problem document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcmeSubproblem {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,
}

const MAINTENANCE_MARKERS: &[&str] = &["maintenance", "service is down"];

impl AcmeErrorDetail {
    /// Map an RFC 7807 problem document to a typed [`AcmeError`], per spec §4.5.
    pub fn into_typed(self) -> AcmeError {
        let detail = self.detail.clone().unwrap_or_default();
        let urn = self
            .error_type
            .clone()
            .and_then(|t| t.strip_prefix(crate::error::ACME_ERROR_URN_PREFIX).map(str::to_string));

        match urn.as_deref() {
            Some("accountDoesNotExist") => AcmeError::AccountDoesNotExist { detail },
            Some("alreadyRevoked") => AcmeError::AlreadyRevoked { detail },
            Some("badCSR") => AcmeError::BadCsr { detail },
            Some("badNonce") => AcmeError::BadNonce { detail },
            Some("badPublicKey") => AcmeError::BadPublicKey { detail },
            Some("badRevocationReason") => AcmeError::BadRevocationReason { detail },
            Some("badSignatureAlgorithm") => AcmeError::BadSignatureAlgorithm {
                detail,
                algorithms: self.algorithms.unwrap_or_default(),
            },
            Some("caa") => AcmeError::Caa { detail },
            Some("connection") => AcmeError::Connection(detail),
            Some("dns") => AcmeError::Dns { detail },
            Some("externalAccountRequired") => AcmeError::ExternalAccountRequired { detail },
            Some("incorrectResponse") => AcmeError::IncorrectResponse { detail },
            Some("invalidContact") => AcmeError::InvalidContact { detail },
            Some("malformed") => AcmeError::Malformed { detail },
            Some("orderNotReady") => AcmeError::OrderNotReady { detail },
            Some("rateLimited") => AcmeError::RateLimitedByServer {
                detail,
                retry_after: None,
            },
            Some("rejectedIdentifier") => AcmeError::RejectedIdentifier { detail },
            Some("serverInternal") => {
                if is_maintenance_detail(&detail) || self.status == Some(503) {
                    AcmeError::ServerMaintenance { detail }
                } else {
                    AcmeError::ServerInternal { detail }
                }
            }
            Some("tls") => AcmeError::Tls { detail },
            Some("unauthorized") => AcmeError::UnauthorizedProblem { detail },
            Some("unsupportedContact") => AcmeError::UnsupportedContact { detail },
            Some("unsupportedIdentifier") => AcmeError::UnsupportedIdentifier { detail },
            Some("userActionRequired") => AcmeError::UserActionRequired {
                detail,
                instance: self.instance.clone(),
            },
            Some("compound") | None
                if self.subproblems.as_ref().is_some_and(|s| !s.is_empty()) =>
            {
                AcmeError::Compound {
                    detail,
                    subproblems: self
                        .subproblems
                        .unwrap_or_default()
                        .into_iter()
                        .map(AcmeSubproblem::into_typed)
                        .collect(),
                }
            }
            Some(other) => AcmeError::Protocol {
                error_type: other.to_string(),
                detail,
                status: self.status,
            },
            None => AcmeError::Protocol {
                error_type: self.error_type.unwrap_or_default(),
                detail,
                status: self.status,
            },
        }
    }
}

impl AcmeSubproblem {
    fn into_typed(self) -> AcmeError {
        AcmeErrorDetail {
            error_type: self.error_type,
            detail: self.detail,
            status: None,
            title: None,
            instance: None,
            subproblems: None,
            algorithms: None,
        }
        .into_typed()
    }
}

fn is_maintenance_detail(detail: &str) -> bool {
    let lower = detail.to_lowercase();
    MAINTENANCE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Identifier for domain authorization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identifier {
    /// Type: "dns" or "ip"
    #[serde(rename = "type")]
    pub id_type: String,
    /// Value: domain name or IP address
    pub value: String,
}

impl Identifier {
    /// Create a DNS identifier
    pub fn dns(domain: impl Into<String>) -> Self {
        Self {
            id_type: "dns".to_string(),
            value: domain.into(),
        }
    }

    /// Create an IP identifier
    pub fn ip(ip: impl Into<String>) -> Self {
        Self {
            id_type: "ip".to_string(),
            value: ip.into(),
        }
    }
}

/// Certificate revocation reason
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[repr(u8)]
pub enum RevocationReason {
    /// Reason unspecified
    Unspecified = 0,
    /// Key compromise
    KeyCompromise = 1,
    /// CA compromise
    CaCompromise = 2,
    /// Affiliation changed
    AffiliationChanged = 3,
    /// Superseded
    Superseded = 4,
    /// Cessation of operation
    CessationOfOperation = 5,
    /// Certificate hold
    CertificateHold = 6,
    /// Remove from CRL
    RemoveFromCRL = 8,
    /// Privilege withdrawn
    PrivilegeWithdrawn = 9,
    /// AA compromise
    AACompromise = 10,
}

impl RevocationReason {
    /// Get the numeric value
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Contact information for account
#[derive(Debug, Clone)]
pub struct Contact {
    /// Email address
    pub email: Option<String>,
    /// Phone number
    pub phone: Option<String>,
    /// URL
    pub url: Option<String>,
}

impl Contact {
    /// Create email contact
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            phone: None,
            url: None,
        }
    }

    /// Create phone contact
    pub fn phone(phone: impl Into<String>) -> Self {
        Self {
            email: None,
            phone: Some(phone.into()),
            url: None,
        }
    }

    /// Create URL contact
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            email: None,
            phone: None,
            url: Some(url.into()),
        }
    }

    /// Convert to ACME URI format
    pub fn to_uri(&self) -> String {
        if let Some(email) = &self.email {
            format!("mailto:{}", email)
        } else if let Some(phone) = &self.phone {
            format!("tel:{}", phone)
        } else if let Some(url) = &self.url {
            url.clone()
        } else {
            String::new()
        }
    }
}

/// Challenge type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeType {
    /// HTTP-01 challenge
    Http01,
    /// DNS-01 challenge
    Dns01,
    /// TLS-ALPN-01 challenge
    TlsAlpn01,
}

impl ChallengeType {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeType::Http01 => "http-01",
            ChallengeType::Dns01 => "dns-01",
            ChallengeType::TlsAlpn01 => "tls-alpn-01",
        }
    }
}

impl std::str::FromStr for ChallengeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "http-01" => Ok(ChallengeType::Http01),
            "dns-01" => Ok(ChallengeType::Dns01),
            "tls-alpn-01" => Ok(ChallengeType::TlsAlpn01),
            _ => Err(format!("Unknown challenge type: {}", s)),
        }
    }
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Pending authorization
    Pending,
    /// Validated and ready for finalization
    Ready,
    /// Processing finalization
    Processing,
    /// Certificate issued
    Valid,
    /// Invalid
    Invalid,
    /// Expired
    Expired,
    /// Deactivated
    Deactivated,
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "ready" => Ok(OrderStatus::Ready),
            "processing" => Ok(OrderStatus::Processing),
            "valid" => Ok(OrderStatus::Valid),
            "invalid" => Ok(OrderStatus::Invalid),
            "expired" => Ok(OrderStatus::Expired),
            "deactivated" => Ok(OrderStatus::Deactivated),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

impl OrderStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Ready => "ready",
            OrderStatus::Processing => "processing",
            OrderStatus::Valid => "valid",
            OrderStatus::Invalid => "invalid",
            OrderStatus::Expired => "expired",
            OrderStatus::Deactivated => "deactivated",
        }
    }

    /// Terminal states for order polling (spec §4.9 step 8).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Valid | OrderStatus::Invalid)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authorization status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// Pending validation
    Pending,
    /// Validated
    Valid,
    /// Invalid
    Invalid,
    /// Deactivated
    Deactivated,
    /// Expired
    Expired,
    /// Revoked
    Revoked,
}

impl std::str::FromStr for AuthorizationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AuthorizationStatus::Pending),
            "valid" => Ok(AuthorizationStatus::Valid),
            "invalid" => Ok(AuthorizationStatus::Invalid),
            "deactivated" => Ok(AuthorizationStatus::Deactivated),
            "expired" => Ok(AuthorizationStatus::Expired),
            "revoked" => Ok(AuthorizationStatus::Revoked),
            _ => Err(format!("Unknown authorization status: {}", s)),
        }
    }
}

impl AuthorizationStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::Pending => "pending",
            AuthorizationStatus::Valid => "valid",
            AuthorizationStatus::Invalid => "invalid",
            AuthorizationStatus::Deactivated => "deactivated",
            AuthorizationStatus::Expired => "expired",
            AuthorizationStatus::Revoked => "revoked",
        }
    }

    /// Terminal states for authorization polling (spec §4.9 step 6).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthorizationStatus::Valid
                | AuthorizationStatus::Invalid
                | AuthorizationStatus::Expired
                | AuthorizationStatus::Deactivated
                | AuthorizationStatus::Revoked
        )
    }
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_dns() {
        let id = Identifier::dns("example.com");
        assert_eq!(id.id_type, "dns");
        assert_eq!(id.value, "example.com");
    }

    #[test]
    fn test_contact_email() {
        let contact = Contact::email("test@example.com");
        assert_eq!(contact.to_uri(), "mailto:test@example.com");
    }

    #[test]
    fn test_challenge_type() {
        assert_eq!(ChallengeType::Http01.as_str(), "http-01");
        assert_eq!("dns-01".parse::<ChallengeType>(), Ok(ChallengeType::Dns01));
    }

    #[test]
    fn test_order_status() {
        assert_eq!("pending".parse::<OrderStatus>(), Ok(OrderStatus::Pending));
        assert_eq!(OrderStatus::Valid.as_str(), "valid");
    }

    #[test]
    fn compound_fallback_maps_subproblems() {
        let detail = AcmeErrorDetail {
            error_type: None,
            detail: Some("Errors during validation".to_string()),
            status: None,
            title: None,
            subproblems: Some(vec![
                AcmeSubproblem {
                    error_type: Some(
                        "urn:ietf:params:acme:error:incorrectResponse".to_string(),
                    ),
                    detail: Some("resp mismatch 1".to_string()),
                    identifier: None,
                },
                AcmeSubproblem {
                    error_type: Some(
                        "urn:ietf:params:acme:error:incorrectResponse".to_string(),
                    ),
                    detail: Some("resp mismatch 2".to_string()),
                    identifier: None,
                },
            ]),
            algorithms: None,
        };
        let err = detail.into_typed();
        assert!(matches!(err, AcmeError::Compound { ref subproblems, .. } if subproblems.len() == 2));
    }

    #[test]
    fn maintenance_detail_maps_to_maintenance_error() {
        let detail = AcmeErrorDetail {
            error_type: Some("urn:ietf:params:acme:error:serverInternal".to_string()),
            detail: Some("Service is down for maintenance".to_string()),
            status: Some(503),
            title: None,
            instance: None,
            subproblems: None,
            algorithms: None,
        };
        assert!(detail.into_typed().is_maintenance());
    }
}
