//! # acme-core - ACME v2 client library
//!
//! A Rust library implementing the ACME v2 protocol (RFC 8555) for
//! certificate issuance and revocation against Let's Encrypt and other
//! compliant CAs.
//!
//! ## Features
//!
//! - Full RFC 8555 directory/nonce/JWS/order/authorization flow
//! - HTTP-01 and DNS-01 challenge self-validation
//! - Account registration, key rollover, deactivation, External Account Binding
//! - Async, built on Tokio
//!
//! This crate never persists keys, certificates, or account state, and
//! never runs a server: publishing challenge responses and storing the
//! resulting certificate are the caller's responsibility.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use acme_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> acme_core::Result<()> {
//!     let config = AcmeConfig::lets_encrypt_staging();
//!     let mut client = AcmeClient::new(config).await?;
//!     client.register_account().await?;
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod challenge;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod order;
pub mod protocol;
pub mod transport;
pub mod types;

pub use account::{Account, AccountSession, ExternalAccountBinding, KeyRollover, RegisterOptions};
pub use challenge::{ChallengeSolver, DnsResolver, Http01SelfCheckConfig, SystemDnsResolver};
pub use client::{AcmeClient, AcmeConfig, CertificateBundle};
pub use config::{AcmeSettings, Config, NonceSettings, PollingSettings, RateLimitSettings};
pub use crypto::{JwkParams, KeyPair, KeyType};
pub use error::{AcmeError, Result};
pub use order::{
    parse_certificate_chain, verify_certificate_domains, Authorization, Challenge, CsrGenerator,
    FinalizationRequest, IssueCertificateOptions, IssuedCertificate, NewOrderRequest, Order,
    OrderEngine, OrderManager,
};
pub use protocol::{Directory, DirectoryManager, Jwk, JwsSigner, NonceManager};
pub use transport::{AcmeTransport, HttpClient};
pub use types::{
    AuthorizationStatus, ChallengeType, Contact, Identifier, OrderStatus, RevocationReason,
};

/// Commonly used types, re-exported for a single `use acme_core::prelude::*`.
pub mod prelude {
    pub use crate::{
        account::{Account, AccountSession, KeyRollover, RegisterOptions},
        challenge::ChallengeSolver,
        client::{AcmeClient, AcmeConfig, CertificateBundle},
        crypto::{KeyPair, KeyType},
        error::{AcmeError, Result},
        order::{
            Authorization, Challenge, FinalizationRequest, IssueCertificateOptions,
            IssuedCertificate, NewOrderRequest, Order,
        },
        protocol::{Directory, DirectoryManager, Jwk, JwsSigner, NonceManager},
        types::{
            AuthorizationStatus, ChallengeType, Contact, Identifier, OrderStatus, RevocationReason,
        },
    };
}
