//! Certificate issuance state machine (spec §4.9): newOrder → poll
//! authorizations → solve challenges → finalize → poll order →
//! download certificate.
use crate::account::AccountSession;
use crate::challenge::{self, ChallengeSolver, SystemDnsResolver};
use crate::config::PollingSettings;
use crate::error::{AcmeError, Result};
use crate::order::csr::{self, CsrGenerator};
use crate::order::manager::OrderManager;
use crate::order::objects::{Authorization, NewOrderRequest};
use crate::types::{ChallengeType, Identifier};
use std::sync::Arc;

pub struct IssueCertificateOptions {
    pub identifiers: Vec<String>,
    pub challenge_solver: Arc<dyn ChallengeSolver>,
    /// Run the client-side self-check before telling the CA to validate.
    /// A failed self-check only logs a warning; it never blocks issuance.
    pub self_check: bool,
}

pub struct IssuedCertificate {
    pub certificate_pem: String,
    pub certificate_chain_der: Vec<Vec<u8>>,
    pub private_key_pem: String,
}

/// Drives one certificate issuance to completion against a bound
/// account session.
pub struct OrderEngine {
    session: Arc<AccountSession>,
    orders: OrderManager,
    polling: PollingSettings,
}

impl OrderEngine {
    pub fn new(session: Arc<AccountSession>, polling: PollingSettings) -> Self {
        let orders = OrderManager::new(session.transport().clone());
        Self { session, orders, polling }
    }

    pub async fn issue_certificate(&self, options: IssueCertificateOptions) -> Result<IssuedCertificate> {
        self.reject_unsupported_wildcards(&options)?;

        let directory = self.session.directory().get().await?;
        let request = NewOrderRequest::new(options.identifiers.clone());
        let (order_url, mut order) = self.orders.create_order(&directory.new_order, &request).await?;

        for auth_url in order.authorizations.clone() {
            let authorization = self.orders.get_authorization(&auth_url).await?;
            if matches!(authorization.status_enum(), Some(crate::types::AuthorizationStatus::Valid)) {
                continue;
            }
            self.solve_authorization(&auth_url, &authorization, &options).await?;
        }

        order = self.orders.poll_order_ready(&order_url, &self.polling).await?;
        if matches!(order.status_enum(), Some(crate::types::OrderStatus::Invalid)) {
            return Err(AcmeError::OrderNotReady {
                detail: format!("order {order_url} went invalid during authorization"),
            });
        }

        let (csr_der, private_key_pem) = CsrGenerator::new(options.identifiers.clone()).generate()?;
        order = self.orders.finalize_order(&order.finalize, &csr_der).await?;
        order = self.orders.poll_order(&order_url, &self.polling).await?;

        if matches!(order.status_enum(), Some(crate::types::OrderStatus::Invalid)) {
            return Err(AcmeError::OrderNotReady {
                detail: format!("order {order_url} was invalid after finalization"),
            });
        }

        let certificate_url = order.certificate.clone().ok_or_else(|| AcmeError::Malformed {
            detail: "valid order has no certificate URL".to_string(),
        })?;
        let certificate_pem = self.orders.download_certificate(&certificate_url).await?;
        let certificate_chain_der = csr::parse_certificate_chain(&certificate_pem)?;

        Ok(IssuedCertificate {
            certificate_pem,
            certificate_chain_der,
            private_key_pem,
        })
    }

    fn reject_unsupported_wildcards(&self, options: &IssueCertificateOptions) -> Result<()> {
        let supported = options.challenge_solver.supported_types();
        for identifier in &options.identifiers {
            if identifier.starts_with("*.") && !supported.contains(&ChallengeType::Dns01) {
                return Err(AcmeError::ChallengeNotSupported(format!(
                    "{identifier}: wildcard identifiers require dns-01 (RFC 8555 §7.1.4), \
                     but the supplied solver does not support it"
                )));
            }
        }
        Ok(())
    }

    async fn solve_authorization(
        &self,
        auth_url: &str,
        authorization: &Authorization,
        options: &IssueCertificateOptions,
    ) -> Result<()> {
        let is_wildcard = authorization.wildcard.unwrap_or(false) || authorization.identifier.value.starts_with("*.");
        let challenge_type = self.pick_challenge_type(authorization, options.challenge_solver.as_ref(), is_wildcard)?;

        let challenge = authorization
            .get_challenge(challenge_type.as_str())
            .ok_or_else(|| AcmeError::ChallengeNotSupported(format!(
                "{}: no {} challenge offered",
                authorization.identifier.value,
                challenge_type.as_str()
            )))?;

        let key_authorization = self.session.compute_key_authorization(&challenge.token)?;

        options
            .challenge_solver
            .prepare(&authorization.identifier, challenge_type, &challenge.token, &key_authorization)
            .await?;

        if options.self_check {
            self.run_self_check(&authorization.identifier, challenge_type, &challenge.token, &key_authorization)
                .await;
        }

        self.orders.respond_to_challenge(&challenge.url).await?;
        let resolved = self.orders.poll_authorization(auth_url, &self.polling).await;

        options
            .challenge_solver
            .cleanup(&authorization.identifier, challenge_type)
            .await?;

        let resolved = resolved?;
        if !matches!(resolved.status_enum(), Some(crate::types::AuthorizationStatus::Valid)) {
            return Err(AcmeError::OrderNotReady {
                detail: format!(
                    "authorization for {} ended in status {}",
                    authorization.identifier.value, resolved.status
                ),
            });
        }

        Ok(())
    }

    fn pick_challenge_type(
        &self,
        authorization: &Authorization,
        solver: &dyn ChallengeSolver,
        is_wildcard: bool,
    ) -> Result<ChallengeType> {
        solver
            .supported_types()
            .iter()
            .copied()
            .filter(|t| !is_wildcard || *t == ChallengeType::Dns01)
            .find(|t| authorization.get_challenge(t.as_str()).is_some())
            .ok_or_else(|| {
                AcmeError::ChallengeNotSupported(format!(
                    "{}: no offered challenge type is supported by the solver",
                    authorization.identifier.value
                ))
            })
    }

    async fn run_self_check(
        &self,
        identifier: &Identifier,
        challenge_type: ChallengeType,
        token: &str,
        key_authorization: &str,
    ) {
        let outcome = match challenge_type {
            ChallengeType::Http01 => challenge::http01_self_check(&identifier.value, token, key_authorization).await,
            ChallengeType::Dns01 => self.dns01_self_check(identifier, token).await,
            ChallengeType::TlsAlpn01 => return,
        };

        match outcome {
            Ok(true) => {}
            Ok(false) => tracing::warn!(domain = %identifier.value, ?challenge_type, "self-check did not find the expected challenge response"),
            Err(e) => tracing::warn!(domain = %identifier.value, ?challenge_type, error = %e, "self-check failed to run"),
        }
    }

    async fn dns01_self_check(&self, identifier: &Identifier, token: &str) -> Result<bool> {
        let digest = self.session.transport().signer().dns01_value(token)?;
        let resolver = SystemDnsResolver::from_system_conf()?;
        challenge::dns01::self_check(&resolver, &identifier.value, &digest).await
    }
}
