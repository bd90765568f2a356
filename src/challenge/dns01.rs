//! DNS-01 self-check: resolves the `_acme-challenge` TXT record to
//! confirm propagation before telling the CA to validate, per spec
//! §4.10. This never creates or deletes DNS records — publishing the
//! record is the caller's responsibility; pluggable DNS providers are
//! out of scope.
use crate::error::{AcmeError, Result};
use async_trait::async_trait;
use hickory_resolver::TokioResolver;

/// Resolves TXT records. Abstracted so tests and callers with unusual
/// resolution needs aren't forced through the host resolver.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>>;
}

/// Default resolver: queries the host's configured nameservers.
pub struct SystemDnsResolver {
    resolver: TokioResolver,
}

impl SystemDnsResolver {
    pub fn from_system_conf() -> Result<Self> {
        let resolver = TokioResolver::builder_tokio()
            .map_err(|e| AcmeError::connection(format!("failed to read system DNS config: {e}")))?
            .build();
        Ok(Self { resolver })
    }
}

#[async_trait]
impl DnsResolver for SystemDnsResolver {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>> {
        let lookup = self
            .resolver
            .txt_lookup(name)
            .await
            .map_err(|e| AcmeError::Dns {
                detail: format!("TXT lookup for {name} failed: {e}"),
            })?;
        Ok(lookup.iter().map(|txt| txt.to_string()).collect())
    }
}

/// Resolve `_acme-challenge.{domain}` and check whether any TXT record
/// equals the expected DNS-01 digest.
pub async fn self_check(resolver: &dyn DnsResolver, domain: &str, expected_digest: &str) -> Result<bool> {
    let name = format!("_acme-challenge.{domain}");
    let records = resolver.lookup_txt(&name).await?;
    Ok(records.iter().any(|record| record == expected_digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StubResolver {
        records: HashMap<String, Vec<String>>,
    }

    #[async_trait]
    impl DnsResolver for StubResolver {
        async fn lookup_txt(&self, name: &str) -> Result<Vec<String>> {
            Ok(self.records.get(name).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn self_check_succeeds_when_digest_present() {
        let mut records = HashMap::new();
        records.insert(
            "_acme-challenge.example.com".to_string(),
            vec!["expected-digest".to_string()],
        );
        let resolver = StubResolver { records };
        assert!(self_check(&resolver, "example.com", "expected-digest").await.unwrap());
    }

    #[tokio::test]
    async fn self_check_fails_when_digest_absent() {
        let resolver = StubResolver { records: HashMap::new() };
        assert!(!self_check(&resolver, "example.com", "expected-digest").await.unwrap());
    }
}
