//! Rate limiting for ACME endpoints: per-endpoint backoff with
//! `Retry-After` awareness and exponential fallback.
use crate::config::RateLimitSettings;
use crate::error::AcmeError;
use crate::transport::http_client::HttpResponse;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Tracks the active backoff window per endpoint, and retries a fallible
/// async call with exponential-backoff-or-`Retry-After` delays between
/// attempts.
pub struct RateLimiter {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    respect_retry_after: bool,
    windows: Mutex<HashMap<String, u64>>,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: settings.base_delay(),
            max_delay: settings.max_delay(),
            respect_retry_after: settings.respect_retry_after,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Run `call` against `endpoint`, sleeping out any active backoff
    /// window first, and retrying on rate-limit responses up to
    /// `max_retries + 1` total attempts.
    pub async fn run<F, Fut, T>(&self, endpoint: &str, mut call: F) -> Result<T, AcmeError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, AcmeError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            self.wait_out_window(endpoint).await;

            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if is_rate_limited(&err) => {
                    attempt += 1;
                    let retry_after_unix_ms = self.record_window(endpoint, &err, attempt).await;
                    if attempt > self.max_retries {
                        return Err(AcmeError::RateLimited {
                            endpoint: endpoint.to_string(),
                            retry_after_unix_ms,
                            retry_delay_seconds: retry_after_unix_ms
                                .map(|ms| ms.saturating_sub(now_unix_ms()) / 1000),
                            attempts: attempt,
                        });
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Record an observed backoff window from a raw HTTP response, ahead
    /// of error classification. Used by the signed transport so a 429
    /// with a `Retry-After` header is honored even before the problem
    /// body is parsed.
    pub async fn note_response(&self, endpoint: &str, response: &HttpResponse) {
        if response.status != 429 && response.status != 503 {
            return;
        }
        let delay = retry_after_delay(response.header("retry-after"), self.base_delay, self.max_delay, 1);
        let mut windows = self.windows.lock().await;
        windows.insert(endpoint.to_string(), now_unix_ms() + delay.as_millis() as u64);
    }

    async fn record_window(&self, endpoint: &str, err: &AcmeError, attempt: u32) -> Option<u64> {
        let retry_after_header = match err {
            AcmeError::RateLimitedByServer { retry_after, .. } => *retry_after,
            _ => None,
        };
        let delay = if self.respect_retry_after {
            if let Some(seconds) = retry_after_header {
                Duration::from_secs(seconds).min(self.max_delay)
            } else {
                exponential_delay(self.base_delay, self.max_delay, attempt)
            }
        } else {
            exponential_delay(self.base_delay, self.max_delay, attempt)
        };
        let target = now_unix_ms() + delay.as_millis() as u64;
        let mut windows = self.windows.lock().await;
        windows.insert(endpoint.to_string(), target);
        Some(target)
    }

    async fn wait_out_window(&self, endpoint: &str) {
        let target = {
            let windows = self.windows.lock().await;
            windows.get(endpoint).copied()
        };
        if let Some(target) = target {
            let now = now_unix_ms();
            if target > now {
                tokio::time::sleep(Duration::from_millis(target - now)).await;
            }
        }
    }
}

fn is_rate_limited(err: &AcmeError) -> bool {
    err.is_server_rate_limited()
}

fn exponential_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    let millis = base.as_millis() as u64 * factor;
    Duration::from_millis(millis).min(max)
}

fn retry_after_delay(header: Option<&str>, base: Duration, max: Duration, attempt: u32) -> Duration {
    match header.and_then(|h| h.parse::<u64>().ok()) {
        Some(seconds) => Duration::from_secs(seconds).min(max),
        None => exponential_delay(base, max, attempt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_delay_doubles_per_attempt() {
        let base = Duration::from_millis(1000);
        let max = Duration::from_secs(300);
        assert_eq!(exponential_delay(base, max, 1), Duration::from_millis(1000));
        assert_eq!(exponential_delay(base, max, 2), Duration::from_millis(2000));
        assert_eq!(exponential_delay(base, max, 3), Duration::from_millis(4000));
    }

    #[test]
    fn exponential_delay_is_capped() {
        let base = Duration::from_millis(1000);
        let max = Duration::from_secs(5);
        assert_eq!(exponential_delay(base, max, 20), max);
    }

    #[tokio::test]
    async fn run_succeeds_without_rate_limit() {
        let limiter = RateLimiter::new(&RateLimitSettings::default());
        let result: Result<u32, AcmeError> = limiter.run("newOrder", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn run_exhausts_retries_and_reports_attempts() {
        let mut settings = RateLimitSettings::default();
        settings.max_retries = 1;
        settings.base_delay_ms = 1;
        settings.max_delay_ms = 2;
        let limiter = RateLimiter::new(&settings);
        let result: Result<u32, AcmeError> = limiter
            .run("newOrder", || async {
                Err(AcmeError::RateLimitedByServer {
                    detail: "slow down".to_string(),
                    retry_after: None,
                })
            })
            .await;
        match result {
            Err(AcmeError::RateLimited { attempts, endpoint, .. }) => {
                assert_eq!(attempts, 2);
                assert_eq!(endpoint, "newOrder");
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }
}
