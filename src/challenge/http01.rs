//! HTTP-01 self-check: confirms a challenge response is live and correct
//! before telling the CA to validate, per spec §4.10. This never hosts a
//! server — publishing the response at
//! `/.well-known/acme-challenge/{token}` is the caller's responsibility.
use crate::error::Result;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);
const DEFAULT_MAX_REDIRECTS: usize = 3;
const USER_AGENT: &str = concat!("acme-core/", env!("CARGO_PKG_VERSION"), " http-01-self-check");

pub struct Http01SelfCheckConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl Default for Http01SelfCheckConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// GET `http://{domain}/.well-known/acme-challenge/{token}` over plain
/// HTTP and compare the trimmed body to the expected key authorization.
/// A failure here is a warning, not a hard error — the caller decides
/// whether to proceed and let the CA's own validation be authoritative.
pub async fn self_check(domain: &str, token: &str, key_authorization: &str) -> Result<bool> {
    self_check_with_config(domain, token, key_authorization, &Http01SelfCheckConfig::default()).await
}

pub async fn self_check_with_config(
    domain: &str,
    token: &str,
    key_authorization: &str,
    config: &Http01SelfCheckConfig,
) -> Result<bool> {
    let url = format!("http://{domain}/.well-known/acme-challenge/{token}");

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| crate::error::AcmeError::connection(format!("failed to build self-check client: {e}")))?;

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(domain, %e, "HTTP-01 self-check request failed");
            return Ok(false);
        }
    };

    if !response.status().is_success() {
        tracing::warn!(domain, status = %response.status(), "HTTP-01 self-check got non-success status");
        return Ok(false);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(domain, %e, "HTTP-01 self-check failed to read body");
            return Ok(false);
        }
    };

    Ok(body.trim() == key_authorization)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = Http01SelfCheckConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(4));
        assert_eq!(config.max_redirects, 3);
    }
}
