//! JSON Web Key representation and RFC 7638 thumbprint computation.
use crate::crypto::keypair::{JwkParams, KeyPair};
use crate::error::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// JSON Web Key representation, per RFC 7517.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    #[serde(flatten)]
    pub params: HashMap<String, Value>,
}

impl Jwk {
    /// Build the public JWK for an account key pair.
    pub fn from_key_pair(key_pair: &KeyPair) -> Result<Self> {
        Ok(match key_pair.public_jwk_params()? {
            JwkParams::Ec { crv, x, y } => Self::new_ec(crv, x, y),
            JwkParams::Rsa { n, e } => Self::new_rsa(n, e),
        })
    }

    pub fn new_rsa(n: impl Into<String>, e: impl Into<String>) -> Self {
        let mut params = HashMap::new();
        params.insert("n".to_string(), Value::String(n.into()));
        params.insert("e".to_string(), Value::String(e.into()));

        Self {
            kty: "RSA".to_string(),
            use_: Some("sig".to_string()),
            params,
        }
    }

    pub fn new_ec(crv: impl Into<String>, x: impl Into<String>, y: impl Into<String>) -> Self {
        let mut params = HashMap::new();
        params.insert("crv".to_string(), Value::String(crv.into()));
        params.insert("x".to_string(), Value::String(x.into()));
        params.insert("y".to_string(), Value::String(y.into()));

        Self {
            kty: "EC".to_string(),
            use_: Some("sig".to_string()),
            params,
        }
    }

    /// Generate the RFC 7638 JWK thumbprint (SHA-256, base64url, no padding).
    pub fn thumbprint_sha256(&self) -> Result<String> {
        match self.kty.as_str() {
            "RSA" => {
                let e = self.require_str("e")?;
                let n = self.require_str("n")?;
                let required = json!({ "e": e, "kty": "RSA", "n": n });
                self.compute_thumbprint(&required)
            }
            "EC" => {
                let crv = self.require_str("crv")?;
                let x = self.require_str("x")?;
                let y = self.require_str("y")?;
                let required = json!({ "crv": crv, "kty": "EC", "x": x, "y": y });
                self.compute_thumbprint(&required)
            }
            other => Err(crate::error::AcmeError::invalid_input(format!(
                "unsupported key type: {other}"
            ))),
        }
    }

    fn require_str(&self, key: &str) -> Result<String> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                crate::error::AcmeError::invalid_input(format!("missing JWK member '{key}'"))
            })
    }

    fn compute_thumbprint(&self, required: &Value) -> Result<String> {
        let json_str = required.to_string();
        let mut hasher = Sha256::new();
        hasher.update(json_str.as_bytes());
        let digest = hasher.finalize();
        Ok(URL_SAFE_NO_PAD.encode(digest))
    }

    /// Convert to a JSON value for embedding in a JWS protected header.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ec_round_trips_through_value() {
        let jwk = Jwk::new_ec(
            "P-256",
            "WKn-ZIGevcwGIyyrzFoZNBdaq9_TsqzGl96oc0CWuis",
            "y8lrnvOohSs2gksT69r56Fq3MZ_yCjL8MyCvD94PoWU",
        );
        assert_eq!(jwk.kty, "EC");
        let value = jwk.to_value();
        assert_eq!(value.get("crv").unwrap().as_str().unwrap(), "P-256");
    }

    #[test]
    fn thumbprint_is_stable_base64url() {
        let jwk = Jwk::new_rsa(
            "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw",
            "AQAB",
        );
        let thumbprint = jwk.thumbprint_sha256().expect("thumbprint");
        assert!(!thumbprint.is_empty());
        assert!(thumbprint
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn missing_member_is_invalid_input() {
        let mut jwk = Jwk::new_ec("P-256", "x", "");
        jwk.params.remove("y");
        assert!(jwk.thumbprint_sha256().is_err());
    }
}
