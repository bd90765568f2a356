//! Account lifecycle: registration (with optional External Account
//! Binding), contact updates, and deactivation (spec §4.8).
use crate::error::{AcmeError, Result};
use crate::protocol::directory::DirectoryManager;
use crate::protocol::jwk::Jwk;
use crate::transport::acme_transport::AcmeTransport;
use crate::types::Contact;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Account resource as returned by the CA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub contact: Vec<String>,
    #[serde(rename = "termsOfServiceAgreed", default)]
    pub terms_of_service_agreed: bool,
    #[serde(default)]
    pub orders: Option<String>,
}

/// External Account Binding credentials supplied by the caller when the
/// CA's directory advertises `externalAccountRequired`.
pub struct ExternalAccountBinding {
    pub key_id: String,
    /// Base64url-encoded HMAC key, as issued by the CA.
    pub hmac_key: String,
}

#[derive(Default)]
pub struct RegisterOptions {
    pub contact: Vec<Contact>,
    pub terms_of_service_agreed: bool,
    pub external_account_binding: Option<ExternalAccountBinding>,
    pub only_return_existing: bool,
}

/// Manages the ACME account lifecycle for one signer/transport pair.
pub struct AccountSession {
    transport: Arc<AcmeTransport>,
    directory: Arc<DirectoryManager>,
}

impl AccountSession {
    pub fn new(transport: Arc<AcmeTransport>, directory: Arc<DirectoryManager>) -> Self {
        Self { transport, directory }
    }

    /// Register (or, with `only_return_existing`, look up) an account.
    /// On success, binds the account URL as the signer's KID so every
    /// subsequent signed request uses `kid` instead of `jwk`.
    pub async fn register(&self, options: RegisterOptions) -> Result<Account> {
        let directory = self.directory.get().await?;

        let mut payload = json!({
            "termsOfServiceAgreed": options.terms_of_service_agreed,
        });
        if !options.contact.is_empty() {
            let uris: Vec<String> = options.contact.iter().map(Contact::to_uri).collect();
            payload["contact"] = json!(uris);
        }
        if options.only_return_existing {
            payload["onlyReturnExisting"] = json!(true);
        }
        if let Some(eab) = &options.external_account_binding {
            if !directory.requires_external_account_binding() {
                return Err(AcmeError::invalid_input(
                    "external account binding was supplied but the CA does not require one",
                ));
            }
            payload["externalAccountBinding"] =
                self.build_eab_jws(eab, &directory.new_account)?;
        } else if directory.requires_external_account_binding() && !options.only_return_existing {
            return Err(AcmeError::ExternalAccountRequired {
                detail: "this CA requires External Account Binding on newAccount".to_string(),
            });
        }

        let response = self.transport.post(&directory.new_account, &payload).await?;

        if response.is_success() || (response.http.status == 200 && options.only_return_existing) {
            let account_url = response
                .location()
                .ok_or_else(|| AcmeError::Malformed {
                    detail: "newAccount response is missing a Location header".to_string(),
                })?
                .to_string();
            self.transport.signer().bind_kid(account_url.clone());

            let mut account: Account = serde_json::from_value(response.json()?)?;
            account.id = account_url;
            return Ok(account);
        }

        Err(crate::types::problem_to_error(&response.http))
    }

    /// Build the EAB inner JWS (RFC 8555 §7.3.4): an HS256 JWS over the
    /// account's public JWK, keyed by the CA-issued HMAC key, with
    /// protected header `{alg: "HS256", kid, url}` and no nonce.
    fn build_eab_jws(&self, eab: &ExternalAccountBinding, url: &str) -> Result<Value> {
        let jwk = self.transport.signer().jwk();
        let payload = jwk.to_value();
        let header = json!({
            "alg": "HS256",
            "kid": eab.key_id,
            "url": url,
        });

        let header_encoded = URL_SAFE_NO_PAD.encode(header.to_string().as_bytes());
        let payload_encoded = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        let signing_input = format!("{header_encoded}.{payload_encoded}");

        let key_bytes = URL_SAFE_NO_PAD
            .decode(&eab.hmac_key)
            .map_err(|e| AcmeError::invalid_input(format!("invalid EAB HMAC key: {e}")))?;
        let mut mac = HmacSha256::new_from_slice(&key_bytes)
            .map_err(|e| AcmeError::crypto(format!("invalid EAB HMAC key length: {e}")))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(json!({
            "protected": header_encoded,
            "payload": payload_encoded,
            "signature": signature,
        }))
    }

    pub async fn update_contacts(&self, account_url: &str, contact: Vec<Contact>) -> Result<Account> {
        let uris: Vec<String> = contact.iter().map(Contact::to_uri).collect();
        let payload = json!({ "contact": uris });
        let response = self.transport.post(account_url, &payload).await?;
        if !response.is_success() {
            return Err(crate::types::problem_to_error(&response.http));
        }
        let mut account: Account = serde_json::from_value(response.json()?)?;
        account.id = account_url.to_string();
        Ok(account)
    }

    pub async fn get_account(&self, account_url: &str) -> Result<Account> {
        let response = self.transport.post_as_get(account_url).await?;
        if !response.is_success() {
            return Err(crate::types::problem_to_error(&response.http));
        }
        let mut account: Account = serde_json::from_value(response.json()?)?;
        account.id = account_url.to_string();
        Ok(account)
    }

    pub async fn deactivate(&self, account_url: &str) -> Result<()> {
        let payload = json!({ "status": "deactivated" });
        let response = self.transport.post(account_url, &payload).await?;
        if !response.is_success() {
            return Err(crate::types::problem_to_error(&response.http));
        }
        Ok(())
    }

    /// `token.thumbprint`, per RFC 8555 §8.1.
    pub fn compute_key_authorization(&self, token: &str) -> Result<String> {
        self.transport.signer().generate_key_authorization(token)
    }

    pub fn get_jwk_thumbprint(&self) -> Result<String> {
        self.transport.signer().jwk().thumbprint_sha256()
    }

    pub fn get_jwk(&self) -> Jwk {
        self.transport.signer().jwk().clone()
    }

    pub fn transport(&self) -> &Arc<AcmeTransport> {
        &self.transport
    }

    pub fn directory(&self) -> &Arc<DirectoryManager> {
        &self.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_parses_from_server_json() {
        let json = r#"{
            "status": "valid",
            "contact": ["mailto:admin@example.com"],
            "termsOfServiceAgreed": true,
            "orders": "https://example.com/acme/acct/123/orders"
        }"#;

        let account: Account = serde_json::from_str(json).expect("parse account");
        assert_eq!(account.status, "valid");
        assert_eq!(account.contact.len(), 1);
        assert!(account.terms_of_service_agreed);
    }
}
