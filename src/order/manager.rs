//! Low-level order/authorization/challenge/certificate HTTP operations,
//! each a single signed round trip through [`AcmeTransport`].
use crate::config::PollingSettings;
use crate::error::{AcmeError, Result};
use crate::order::{Authorization, Challenge, NewOrderRequest, Order};
use crate::transport::acme_transport::AcmeTransport;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub struct OrderManager {
    transport: Arc<AcmeTransport>,
}

impl OrderManager {
    pub fn new(transport: Arc<AcmeTransport>) -> Self {
        Self { transport }
    }

    pub async fn create_order(&self, new_order_url: &str, request: &NewOrderRequest) -> Result<(String, Order)> {
        let payload = json!(request);
        let response = self.transport.post(new_order_url, &payload).await?;

        let order_url = response
            .location()
            .ok_or_else(|| AcmeError::Malformed {
                detail: "newOrder response is missing a Location header".to_string(),
            })?
            .to_string();

        let order: Order = serde_json::from_value(response.json()?)?;
        Ok((order_url, order))
    }

    pub async fn get_order(&self, order_url: &str) -> Result<Order> {
        let response = self.transport.post_as_get(order_url).await?;
        Ok(serde_json::from_value(response.json()?)?)
    }

    pub async fn get_authorization(&self, auth_url: &str) -> Result<Authorization> {
        let response = self.transport.post_as_get(auth_url).await?;
        Ok(serde_json::from_value(response.json()?)?)
    }

    /// Tell the CA a challenge response is ready to be validated.
    pub async fn respond_to_challenge(&self, challenge_url: &str) -> Result<Challenge> {
        let response = self.transport.post(challenge_url, &json!({})).await?;
        Ok(serde_json::from_value(response.json()?)?)
    }

    pub async fn finalize_order(&self, finalize_url: &str, csr_der: &[u8]) -> Result<Order> {
        let payload = json!({ "csr": URL_SAFE_NO_PAD.encode(csr_der) });
        let response = self.transport.post(finalize_url, &payload).await?;
        Ok(serde_json::from_value(response.json()?)?)
    }

    pub async fn download_certificate(&self, certificate_url: &str) -> Result<String> {
        let response = self.transport.post_as_get(certificate_url).await?;
        response
            .http
            .body
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| AcmeError::certificate("certificate response was not a PEM chain"))
    }

    /// Poll an order until it is `ready` for finalization (or already
    /// terminal), per spec §4.9 step 4 → step 7 transition.
    pub async fn poll_order_ready(&self, order_url: &str, polling: &PollingSettings) -> Result<Order> {
        self.poll_order_until(order_url, polling, |order| {
            matches!(
                order.status_enum(),
                Some(crate::types::OrderStatus::Ready) | Some(crate::types::OrderStatus::Valid) | Some(crate::types::OrderStatus::Invalid)
            )
        })
        .await
    }

    /// Poll an order until it reaches a terminal state (spec §4.9 step 8).
    pub async fn poll_order(&self, order_url: &str, polling: &PollingSettings) -> Result<Order> {
        self.poll_order_until(order_url, polling, |order| {
            order.status_enum().is_some_and(|s| s.is_terminal())
        })
        .await
    }

    async fn poll_order_until(
        &self,
        order_url: &str,
        polling: &PollingSettings,
        done: impl Fn(&Order) -> bool,
    ) -> Result<Order> {
        for attempt in 0..polling.max_attempts {
            let order = self.get_order(order_url).await?;
            if done(&order) {
                return Ok(order);
            }
            tracing::debug!(order_url, attempt, status = %order.status, "order still pending");
            tokio::time::sleep(polling.interval()).await;
        }
        Err(AcmeError::PollingTimeout {
            resource: order_url.to_string(),
            last_status: "unknown".to_string(),
        })
    }

    /// Poll an authorization until it reaches a terminal state (spec §4.9 step 6).
    pub async fn poll_authorization(&self, auth_url: &str, polling: &PollingSettings) -> Result<Authorization> {
        let mut last_status = String::new();
        for attempt in 0..polling.max_attempts {
            let authorization = self.get_authorization(auth_url).await?;
            last_status = authorization.status.clone();
            if let Some(status) = authorization.status_enum() {
                if status.is_terminal() {
                    return Ok(authorization);
                }
            }
            tracing::debug!(auth_url, attempt, status = %authorization.status, "authorization still pending");
            tokio::time::sleep(polling.interval()).await;
        }
        Err(AcmeError::PollingTimeout {
            resource: auth_url.to_string(),
            last_status,
        })
    }

    /// Wait past an active `Retry-After` window between poll attempts,
    /// independent of the fixed `interval` spacing (not currently used by
    /// `poll_order`/`poll_authorization`, which rely on a flat interval
    /// per spec §4.9, but kept available for exponential-backoff callers).
    pub async fn sleep(interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}
