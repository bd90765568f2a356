//! Certificate revocation (spec §4.9 "sibling operation").
use crate::account::AccountSession;
use crate::error::Result;
use crate::types::RevocationReason;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;

/// Revoke a certificate using the given account session.
pub async fn revoke_certificate(
    session: &AccountSession,
    certificate_der: &[u8],
    reason: Option<RevocationReason>,
) -> Result<()> {
    let directory = session.directory().get().await?;
    let revoke_url = directory.revoke_cert;

    let mut payload = json!({
        "certificate": URL_SAFE_NO_PAD.encode(certificate_der),
    });
    if let Some(reason) = reason {
        payload["reason"] = json!(reason.as_u8());
    }

    let response = session.transport().post(&revoke_url, &payload).await?;
    if !response.is_success() {
        return Err(crate::types::problem_to_error(&response.http));
    }

    tracing::info!("certificate revoked");
    Ok(())
}
