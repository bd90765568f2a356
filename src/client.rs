//! High-level ACME client facade composing directory, transport, account
//! session, and order engine into the convenience API most callers want.
use crate::account::{AccountSession, RegisterOptions};
use crate::challenge::ChallengeSolver;
use crate::config::{Config, PollingSettings, RateLimitSettings};
use crate::crypto::{KeyPair, KeyType};
use crate::error::Result;
use crate::order::{IssueCertificateOptions, IssuedCertificate, OrderEngine};
use crate::protocol::{DirectoryManager, JwsSigner, NonceManager};
use crate::transport::AcmeTransport;
use crate::types::Contact;
use std::sync::Arc;

/// Top-level client configuration. Separate from [`Config`], which is
/// the file/env-backed settings document — this is what callers build
/// directly when embedding the crate.
#[derive(Clone)]
pub struct AcmeConfig {
    pub directory_url: String,
    pub contacts: Vec<Contact>,
    pub terms_of_service_agreed: bool,
    pub rate_limit: RateLimitSettings,
    pub polling: PollingSettings,
}

impl AcmeConfig {
    pub fn new(directory_url: impl Into<String>) -> Self {
        Self {
            directory_url: directory_url.into(),
            contacts: Vec::new(),
            terms_of_service_agreed: false,
            rate_limit: RateLimitSettings::default(),
            polling: PollingSettings::default(),
        }
    }

    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contacts.push(contact);
        self
    }

    pub fn with_tos_agreed(mut self, agreed: bool) -> Self {
        self.terms_of_service_agreed = agreed;
        self
    }

    /// Let's Encrypt staging directory.
    pub fn lets_encrypt_staging() -> Self {
        Self::new("https://acme-staging-v02.api.letsencrypt.org/directory")
    }

    /// Let's Encrypt production directory.
    pub fn lets_encrypt() -> Self {
        Self::new("https://acme-v02.api.letsencrypt.org/directory")
    }
}

impl From<&Config> for AcmeConfig {
    fn from(config: &Config) -> Self {
        Self {
            directory_url: config.acme.directory.clone(),
            contacts: config.acme.contact.iter().cloned().map(Contact::url).collect(),
            terms_of_service_agreed: config.acme.tos_agreed,
            rate_limit: config.rate_limit.clone(),
            polling: config.polling.clone(),
        }
    }
}

/// High-level ACME client: one account key, one directory, one bound
/// account session.
pub struct AcmeClient {
    config: AcmeConfig,
    directory: Arc<DirectoryManager>,
    session: Arc<AccountSession>,
    account_id: Option<String>,
}

impl AcmeClient {
    /// Create a client with a freshly generated ECDSA P-256 account key.
    /// Fetches the CA's directory once, up front, to learn the
    /// `newNonce` endpoint.
    pub async fn new(config: AcmeConfig) -> Result<Self> {
        Self::with_key_pair(config, KeyPair::generate(KeyType::EcdsaP256)?).await
    }

    /// Create a client with an existing account key pair.
    pub async fn with_key_pair(config: AcmeConfig, key_pair: KeyPair) -> Result<Self> {
        let http_client = reqwest::Client::new();
        let directory_mgr = DirectoryManager::new(&config.directory_url, http_client.clone());
        let directory_doc = directory_mgr.get().await?;
        let directory = Arc::new(directory_mgr);

        let signer = Arc::new(JwsSigner::new(key_pair)?);
        let nonces = Arc::new(NonceManager::new(&directory_doc.new_nonce, http_client));
        let transport = Arc::new(AcmeTransport::new(signer, nonces, &config.rate_limit)?);
        let session = Arc::new(AccountSession::new(transport, directory.clone()));

        Ok(Self {
            config,
            directory,
            session,
            account_id: None,
        })
    }

    /// Register (or look up) the account against the CA's directory.
    pub async fn register_account(&mut self) -> Result<String> {
        let account = self
            .session
            .register(RegisterOptions {
                contact: self.config.contacts.clone(),
                terms_of_service_agreed: self.config.terms_of_service_agreed,
                external_account_binding: None,
                only_return_existing: false,
            })
            .await?;

        self.account_id = Some(account.id.clone());
        tracing::info!(account_id = %account.id, "account registered");
        Ok(account.id)
    }

    /// Issue a certificate for the given domains, driving the full
    /// newOrder → authorize → finalize → download state machine.
    pub async fn issue_certificate(
        &mut self,
        domains: Vec<String>,
        challenge_solver: Arc<dyn ChallengeSolver>,
    ) -> Result<CertificateBundle> {
        if self.account_id.is_none() {
            self.register_account().await?;
        }

        let engine = OrderEngine::new(self.session.clone(), self.config.polling.clone());
        let IssuedCertificate {
            certificate_pem,
            private_key_pem,
            ..
        } = engine
            .issue_certificate(IssueCertificateOptions {
                identifiers: domains.clone(),
                challenge_solver,
                self_check: true,
            })
            .await?;

        Ok(CertificateBundle {
            certificate_pem,
            private_key_pem,
            domains,
        })
    }

    /// Revoke a previously issued certificate.
    pub async fn revoke_certificate(
        &self,
        certificate_der: &[u8],
        reason: Option<crate::types::RevocationReason>,
    ) -> Result<()> {
        crate::order::revoke_certificate(&self.session, certificate_der, reason).await
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn session(&self) -> &Arc<AccountSession> {
        &self.session
    }

    pub fn directory(&self) -> &Arc<DirectoryManager> {
        &self.directory
    }
}

/// Certificate bundle containing certificate and private key.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CertificateBundle {
    pub certificate_pem: String,
    pub private_key_pem: String,
    pub domains: Vec<String>,
}

impl CertificateBundle {
    pub fn save_to_files(&self, cert_path: &str, key_path: &str) -> Result<()> {
        std::fs::write(cert_path, &self.certificate_pem)?;
        std::fs::write(key_path, &self.private_key_pem)?;
        Ok(())
    }

    pub fn certificate_der(&self) -> Result<Vec<Vec<u8>>> {
        crate::order::parse_certificate_chain(&self.certificate_pem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acme_config_builder() {
        let config = AcmeConfig::lets_encrypt_staging()
            .with_contact(Contact::email("test@example.com"))
            .with_tos_agreed(true);

        assert!(config.terms_of_service_agreed);
        assert_eq!(config.contacts.len(), 1);
    }
}
