//! Flattened JWS signing for ACME requests (RFC 7515 §7.2.2, RFC 8555 §6.2).
use crate::crypto::keypair::KeyPair;
use crate::error::{AcmeError, Result};
use crate::protocol::jwk::Jwk;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;

/// Signs ACME requests with the account key pair. Carries `jwk` in the
/// protected header until [`bind_kid`](Self::bind_kid) is called on
/// successful account registration, after which it carries `kid` —
/// exactly one of the two is ever present.
pub struct JwsSigner {
    key_pair: KeyPair,
    jwk: Jwk,
    kid: OnceCell<String>,
}

impl JwsSigner {
    pub fn new(key_pair: KeyPair) -> Result<Self> {
        let jwk = Jwk::from_key_pair(&key_pair)?;
        Ok(Self {
            key_pair,
            jwk,
            kid: OnceCell::new(),
        })
    }

    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn kid(&self) -> Option<&str> {
        self.kid.get().map(String::as_str)
    }

    /// Bind the account URL as this signer's key ID. Only the first call
    /// takes effect, so a concurrent double-registration can't clobber an
    /// already-bound KID.
    pub fn bind_kid(&self, kid: String) {
        let _ = self.kid.set(kid);
    }

    /// Sign `payload` for a POST to `url`, using the just-dispensed `nonce`.
    pub fn sign(&self, url: &str, nonce: &str, payload: &Value) -> Result<String> {
        self.sign_with_payload_bytes(url, nonce, payload_bytes(payload)?)
    }

    /// Sign an empty payload, for POST-as-GET.
    pub fn sign_empty(&self, url: &str, nonce: &str) -> Result<String> {
        self.sign_with_payload_bytes(url, nonce, Vec::new())
    }

    fn sign_with_payload_bytes(&self, url: &str, nonce: &str, payload: Vec<u8>) -> Result<String> {
        let mut header = json!({
            "alg": self.key_pair.algorithm(),
            "url": url,
            "nonce": nonce,
        });
        match self.kid.get() {
            Some(kid) => header["kid"] = json!(kid),
            None => header["jwk"] = self.jwk.to_value(),
        }
        self.sign_flattened(&header, &payload)
    }

    /// Sign with an explicit `jwk` header regardless of any bound KID —
    /// used for key rollover's inner JWS (RFC 8555 §7.3.5), which always
    /// carries the *new* key's JWK.
    pub fn sign_with_jwk_header(
        &self,
        url: &str,
        nonce: &str,
        jwk: &Value,
        payload: &Value,
    ) -> Result<String> {
        let header = json!({
            "alg": self.key_pair.algorithm(),
            "url": url,
            "nonce": nonce,
            "jwk": jwk,
        });
        self.sign_flattened(&header, &payload_bytes(payload)?)
    }

    /// Sign with a caller-supplied protected header, verbatim. Used for
    /// JWS shapes that omit the usual `nonce`/`kid` fields (key-rollover
    /// and EAB inner JWSes, RFC 8555 §7.3.4/§7.3.5).
    pub fn sign_with_header(&self, header: Value, payload: &Value) -> Result<String> {
        self.sign_flattened(&header, &payload_bytes(payload)?)
    }

    fn sign_flattened(&self, header: &Value, payload: &[u8]) -> Result<String> {
        let header_encoded = URL_SAFE_NO_PAD.encode(header.to_string().as_bytes());
        let payload_encoded = URL_SAFE_NO_PAD.encode(payload);
        let signing_input = format!("{header_encoded}.{payload_encoded}");
        let signature = self.key_pair.sign(signing_input.as_bytes())?;
        let signature_encoded = URL_SAFE_NO_PAD.encode(signature);
        Ok(json!({
            "protected": header_encoded,
            "payload": payload_encoded,
            "signature": signature_encoded,
        })
        .to_string())
    }

    /// `token.thumbprint`, per RFC 8555 §8.1.
    pub fn generate_key_authorization(&self, token: &str) -> Result<String> {
        let thumbprint = self.jwk.thumbprint_sha256()?;
        Ok(format!("{token}.{thumbprint}"))
    }

    /// DNS-01 TXT record value: `base64url(SHA-256(keyAuth))`.
    pub fn dns01_value(&self, token: &str) -> Result<String> {
        let key_auth = self.generate_key_authorization(token)?;
        Ok(sha256_b64(key_auth.as_bytes()))
    }

    /// TLS-ALPN-01 digest (RFC 8737 §3): the same construction as
    /// `dns01_value`, consumed by the `acmeIdentifier` certificate
    /// extension rather than a DNS record.
    pub fn tls_alpn01_digest(&self, token: &str) -> Result<String> {
        self.dns01_value(token)
    }
}

fn sha256_b64(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

fn payload_bytes(payload: &Value) -> Result<Vec<u8>> {
    if payload.is_null() {
        return Ok(Vec::new());
    }
    serde_json::to_vec(payload).map_err(|e| AcmeError::Json(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keypair::KeyType;

    fn signer() -> JwsSigner {
        let key_pair = KeyPair::generate(KeyType::EcdsaP256).unwrap();
        JwsSigner::new(key_pair).unwrap()
    }

    #[test]
    fn sign_produces_three_base64url_parts() {
        let signer = signer();
        let jws = signer
            .sign(
                "https://example.com/acme/new-order",
                "test-nonce",
                &json!({"identifiers": []}),
            )
            .unwrap();
        let value: Value = serde_json::from_str(&jws).unwrap();
        for key in ["protected", "payload", "signature"] {
            let part = value[key].as_str().unwrap();
            assert!(URL_SAFE_NO_PAD.decode(part).is_ok());
        }
    }

    #[test]
    fn uses_jwk_before_kid_and_kid_after_binding() {
        let signer = signer();
        let jws = signer.sign_empty("https://example.com/x", "n1").unwrap();
        let value: Value = serde_json::from_str(&jws).unwrap();
        let protected: Value = serde_json::from_slice(
            &URL_SAFE_NO_PAD
                .decode(value["protected"].as_str().unwrap())
                .unwrap(),
        )
        .unwrap();
        assert!(protected.get("jwk").is_some());
        assert!(protected.get("kid").is_none());

        signer.bind_kid("https://example.com/acme/acct/1".to_string());
        let jws = signer.sign_empty("https://example.com/x", "n2").unwrap();
        let value: Value = serde_json::from_str(&jws).unwrap();
        let protected: Value = serde_json::from_slice(
            &URL_SAFE_NO_PAD
                .decode(value["protected"].as_str().unwrap())
                .unwrap(),
        )
        .unwrap();
        assert!(protected.get("kid").is_some());
        assert!(protected.get("jwk").is_none());
    }

    #[test]
    fn dns01_value_matches_sha256_of_key_authorization() {
        let signer = signer();
        let key_auth = signer.generate_key_authorization("tok").unwrap();
        let expected = sha256_b64(key_auth.as_bytes());
        assert_eq!(signer.dns01_value("tok").unwrap(), expected);
    }
}
