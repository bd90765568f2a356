//! Account key rollover (RFC 8555 §7.3.5): an inner JWS signed by the new
//! key carrying its own JWK, wrapped as the payload of an outer JWS
//! signed by the currently-bound (old) key.
use crate::account::session::AccountSession;
use crate::crypto::keypair::KeyPair;
use crate::error::Result;
use crate::protocol::jwk::Jwk;
use crate::protocol::jws::JwsSigner;
use serde_json::{json, Value};

/// Performs a key rollover for one account session.
pub struct KeyRollover<'a> {
    session: &'a AccountSession,
    new_signer: JwsSigner,
    new_jwk: Jwk,
}

impl<'a> KeyRollover<'a> {
    pub fn new(session: &'a AccountSession, new_key_pair: KeyPair) -> Result<Self> {
        let new_jwk = Jwk::from_key_pair(&new_key_pair)?;
        let new_signer = JwsSigner::new(new_key_pair)?;
        Ok(Self {
            session,
            new_signer,
            new_jwk,
        })
    }

    /// Execute the rollover for the account bound to `account_url`.
    pub async fn execute(&self, account_url: &str) -> Result<()> {
        let directory = self.session.directory().get().await?;
        let key_change_url = directory.key_change;

        let inner_payload = json!({
            "account": account_url,
            "oldKey": self.session.get_jwk().to_value(),
        });
        let inner_header = json!({
            "alg": self.new_signer.key_pair().algorithm(),
            "jwk": self.new_jwk.to_value(),
            "url": key_change_url,
        });
        let inner_jws = self.new_signer.sign_with_header(inner_header, &inner_payload)?;
        let inner_jws_value: Value = serde_json::from_str(&inner_jws)?;

        let response = self.session.transport().post(&key_change_url, &inner_jws_value).await?;
        if !response.is_success() {
            return Err(crate::types::problem_to_error(&response.http));
        }
        Ok(())
    }

    pub fn new_jwk(&self) -> &Jwk {
        &self.new_jwk
    }
}
