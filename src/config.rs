//! Client configuration.
//!
//! Covers only what this library actually consumes: which directory to
//! talk to, how to identify the account, and tuning knobs for the nonce
//! pool, rate limiter, and order-polling loop. Storage, DNS-provider
//! credentials, and server/CLI settings have no home here — this crate
//! does not persist keys or certificates and does not run a server.

use crate::error::{AcmeError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub acme: AcmeSettings,

    #[serde(default)]
    pub nonce: NonceSettings,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    #[serde(default)]
    pub polling: PollingSettings,
}

/// ACME account and directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcmeSettings {
    /// ACME directory URL.
    #[serde(default = "default_acme_url")]
    pub directory: String,

    /// Contact URIs (e.g. `mailto:admin@example.com`).
    #[serde(default)]
    pub contact: Vec<String>,

    /// Agree to the CA's terms of service on registration.
    #[serde(default = "default_true")]
    pub tos_agreed: bool,

    /// External Account Binding, required by CAs that advertise
    /// `externalAccountRequired` in their directory metadata.
    #[serde(default)]
    pub external_account_binding: Option<ExternalAccountBinding>,
}

/// External Account Binding credentials (RFC 8555 §7.3.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalAccountBinding {
    pub key_id: String,
    pub hmac_key: String,
}

/// Nonce pool tuning (spec §4.3 defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceSettings {
    #[serde(default = "default_nonce_max_age_ms")]
    pub max_age_ms: u64,
    #[serde(default = "default_nonce_max_pool_size")]
    pub max_pool_size: usize,
    #[serde(default = "default_nonce_prefetch_low_water")]
    pub prefetch_low_water: usize,
    #[serde(default = "default_nonce_prefetch_high_water")]
    pub prefetch_high_water: usize,
    #[serde(default = "default_nonce_waiter_timeout_ms")]
    pub waiter_timeout_ms: u64,
}

/// Rate limiter tuning (spec §4.4 defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_rate_limit_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_rate_limit_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_rate_limit_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_true")]
    pub respect_retry_after: bool,
}

/// Order/authorization polling tuning (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_poll_max_attempts")]
    pub max_attempts: u32,
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl NonceSettings {
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    pub fn waiter_timeout(&self) -> Duration {
        Duration::from_millis(self.waiter_timeout_ms)
    }
}

impl RateLimitSettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

fn default_acme_url() -> String {
    "https://acme-v02.api.letsencrypt.org/directory".to_string()
}
fn default_true() -> bool {
    true
}
fn default_nonce_max_age_ms() -> u64 {
    120_000
}
fn default_nonce_max_pool_size() -> usize {
    32
}
fn default_nonce_prefetch_low_water() -> usize {
    5
}
fn default_nonce_prefetch_high_water() -> usize {
    10
}
fn default_nonce_waiter_timeout_ms() -> u64 {
    30_000
}
fn default_rate_limit_max_retries() -> u32 {
    3
}
fn default_rate_limit_base_delay_ms() -> u64 {
    1_000
}
fn default_rate_limit_max_delay_ms() -> u64 {
    300_000
}
fn default_poll_interval_ms() -> u64 {
    5_000
}
fn default_poll_max_attempts() -> u32 {
    60
}

impl Default for AcmeSettings {
    fn default() -> Self {
        Self {
            directory: default_acme_url(),
            contact: Vec::new(),
            tos_agreed: default_true(),
            external_account_binding: None,
        }
    }
}

impl Default for NonceSettings {
    fn default() -> Self {
        Self {
            max_age_ms: default_nonce_max_age_ms(),
            max_pool_size: default_nonce_max_pool_size(),
            prefetch_low_water: default_nonce_prefetch_low_water(),
            prefetch_high_water: default_nonce_prefetch_high_water(),
            waiter_timeout_ms: default_nonce_waiter_timeout_ms(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_retries: default_rate_limit_max_retries(),
            base_delay_ms: default_rate_limit_base_delay_ms(),
            max_delay_ms: default_rate_limit_max_delay_ms(),
            respect_retry_after: default_true(),
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_attempts: default_poll_max_attempts(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            acme: AcmeSettings::default(),
            nonce: NonceSettings::default(),
            rate_limit: RateLimitSettings::default(),
            polling: PollingSettings::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AcmeError::configuration(format!("failed to read config file: {e}")))?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| AcmeError::configuration(format!("failed to parse TOML: {e}")))
    }

    /// Apply `ACME_CORE_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("ACME_CORE_DIRECTORY") {
            self.acme.directory = url;
        }
        if let Ok(contacts) = env::var("ACME_CORE_CONTACT") {
            self.acme.contact = contacts.split(',').map(str::to_string).collect();
        }
        if let Ok(interval) = env::var("ACME_CORE_POLL_INTERVAL_MS")
            && let Ok(ms) = interval.parse()
        {
            self.polling.interval_ms = ms;
        }
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.acme.directory.is_empty() {
            return Err(AcmeError::configuration("ACME directory URL cannot be empty"));
        }
        if self.polling.interval_ms == 0 {
            return Err(AcmeError::configuration(
                "polling interval must be greater than 0",
            ));
        }
        if self.nonce.prefetch_low_water > self.nonce.prefetch_high_water {
            return Err(AcmeError::configuration(
                "nonce prefetch_low_water must not exceed prefetch_high_water",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_production_letsencrypt() {
        let config = Config::default();
        assert_eq!(
            config.acme.directory,
            "https://acme-v02.api.letsencrypt.org/directory"
        );
        assert_eq!(config.polling.max_attempts, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[acme]
directory = "https://acme-staging-v02.api.letsencrypt.org/directory"
tos_agreed = true
contact = ["mailto:admin@example.com"]

[polling]
interval_ms = 2000
max_attempts = 30
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(
            config.acme.directory,
            "https://acme-staging-v02.api.letsencrypt.org/directory"
        );
        assert_eq!(config.polling.interval_ms, 2000);
        assert_eq!(config.polling.max_attempts, 30);
    }

    #[test]
    fn env_override_replaces_directory() {
        temp_env::with_var("ACME_CORE_DIRECTORY", Some("https://example.com/directory"), || {
            let mut config = Config::default();
            config.apply_env_overrides();
            assert_eq!(config.acme.directory, "https://example.com/directory");
        });
    }

    #[test]
    fn invalid_prefetch_watermarks_rejected() {
        let mut config = Config::default();
        config.nonce.prefetch_low_water = 20;
        config.nonce.prefetch_high_water = 10;
        assert!(config.validate().is_err());
    }
}
