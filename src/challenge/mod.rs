//! Challenge publication and self-validation (spec §4.9/§4.10).
//!
//! Publishing a challenge response (serving a file, setting a DNS
//! record) is the caller's responsibility, supplied as a
//! [`ChallengeSolver`]. This crate only picks a supported challenge type
//! and, optionally, self-checks propagation before asking the CA to
//! validate — it never runs an HTTP server or pushes DNS records itself.
pub mod dns01;
pub mod http01;

pub use dns01::{DnsResolver, SystemDnsResolver};
pub use http01::{self_check as http01_self_check, Http01SelfCheckConfig};

use crate::error::Result;
use crate::types::{ChallengeType, Identifier};
use async_trait::async_trait;

/// Publishes and retracts challenge responses for whichever challenge
/// types it supports. The order engine selects a type this solver
/// supports (honoring the wildcard restriction of RFC 8555 §7.1.4) and
/// calls `prepare` before asking the CA to validate, then `cleanup`
/// once the authorization reaches a terminal state.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Challenge types this solver can publish, in preference order.
    fn supported_types(&self) -> &[ChallengeType];

    /// Publish the challenge response for `identifier`.
    async fn prepare(
        &self,
        identifier: &Identifier,
        challenge_type: ChallengeType,
        token: &str,
        key_authorization: &str,
    ) -> Result<()>;

    /// Remove the published response.
    async fn cleanup(&self, identifier: &Identifier, challenge_type: ChallengeType) -> Result<()>;
}
