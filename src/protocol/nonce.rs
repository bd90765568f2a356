//! Bounded, namespaced nonce pool with prefetch.
//!
//! Namespaces key distinct pools per directory base URL + account KID so
//! concurrent multi-account use never cross-contaminates nonces.
use crate::error::{AcmeError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};

struct Entry {
    nonce: String,
    inserted_at: Instant,
}

struct Namespace {
    entries: VecDeque<Entry>,
    fetch_in_flight: bool,
    notify: Arc<Notify>,
}

impl Namespace {
    fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            fetch_in_flight: false,
            notify: Arc::new(Notify::new()),
        }
    }
}

/// Manager for ACME replay nonces, pooled per namespace.
pub struct NonceManager {
    new_nonce_url: String,
    http_client: reqwest::Client,
    max_age: Duration,
    max_pool_size: usize,
    prefetch_high_water: usize,
    waiter_timeout: Duration,
    namespaces: Mutex<HashMap<String, Namespace>>,
}

impl NonceManager {
    pub const DEFAULT_NAMESPACE: &'static str = "default";

    /// Create a manager with spec-default tuning.
    pub fn new(new_nonce_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self::with_config(
            new_nonce_url,
            http_client,
            &crate::config::NonceSettings::default(),
        )
    }

    pub fn with_config(
        new_nonce_url: impl Into<String>,
        http_client: reqwest::Client,
        config: &crate::config::NonceSettings,
    ) -> Self {
        Self {
            new_nonce_url: new_nonce_url.into(),
            http_client,
            max_age: config.max_age(),
            max_pool_size: config.max_pool_size,
            prefetch_high_water: config.prefetch_high_water,
            waiter_timeout: config.waiter_timeout(),
            namespaces: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a nonce from the default namespace.
    pub async fn get_nonce(&self) -> Result<String> {
        self.get(Self::DEFAULT_NAMESPACE).await
    }

    /// Fetch a nonce from `namespace`, triggering a prefetch burst and
    /// waiting on other in-flight fetches as needed. Times out after the
    /// configured waiter timeout.
    pub async fn get(&self, namespace: &str) -> Result<String> {
        tokio::time::timeout(self.waiter_timeout, self.get_inner(namespace))
            .await
            .map_err(|_| AcmeError::NonceTimeout(self.waiter_timeout))?
    }

    async fn get_inner(&self, namespace: &str) -> Result<String> {
        loop {
            let (popped, should_fetch, notify) = {
                let mut namespaces = self.namespaces.lock().await;
                let ns = namespaces
                    .entry(namespace.to_string())
                    .or_insert_with(Namespace::new);
                self.evict_stale(ns);
                if let Some(entry) = ns.entries.pop_front() {
                    (Some(entry.nonce), false, None)
                } else {
                    let should_fetch = !ns.fetch_in_flight;
                    ns.fetch_in_flight = true;
                    (None, should_fetch, Some(Arc::clone(&ns.notify)))
                }
            };

            if let Some(nonce) = popped {
                return Ok(nonce);
            }

            if should_fetch {
                self.prefetch(namespace).await;
                continue;
            }

            notify.expect("waiter always has a notify handle").notified().await;
        }
    }

    fn evict_stale(&self, ns: &mut Namespace) {
        let now = Instant::now();
        let max_age = self.max_age;
        ns.entries
            .retain(|e| now.duration_since(e.inserted_at) <= max_age);
    }

    /// Request up to `prefetch_high_water − pool.size` nonces concurrently
    /// via `HEAD {new_nonce_url}` and add each via [`put`](Self::put).
    async fn prefetch(&self, namespace: &str) {
        let wanted = {
            let mut namespaces = self.namespaces.lock().await;
            let ns = namespaces.get_mut(namespace).expect("namespace was just inserted");
            self.prefetch_high_water.saturating_sub(ns.entries.len()).max(1)
        };

        let mut fetches = tokio::task::JoinSet::new();
        for _ in 0..wanted {
            let client = self.http_client.clone();
            let url = self.new_nonce_url.clone();
            fetches.spawn(async move { fetch_replay_nonce(&client, &url).await });
        }

        while let Some(joined) = fetches.join_next().await {
            if let Ok(Ok(nonce)) = joined {
                self.put(namespace, nonce).await;
            }
        }

        let mut namespaces = self.namespaces.lock().await;
        if let Some(ns) = namespaces.get_mut(namespace) {
            ns.fetch_in_flight = false;
            ns.notify.notify_waiters();
        }
    }

    /// Add a nonce harvested from a `Replay-Nonce` response header.
    /// Idempotent: duplicates are rejected, and the pool never grows past
    /// `max_pool_size` (extra nonces are silently dropped).
    pub async fn put(&self, namespace: &str, nonce: String) {
        let mut namespaces = self.namespaces.lock().await;
        let ns = namespaces
            .entry(namespace.to_string())
            .or_insert_with(Namespace::new);
        if ns.entries.iter().any(|e| e.nonce == nonce) {
            return;
        }
        if ns.entries.len() >= self.max_pool_size {
            return;
        }
        ns.entries.push_back(Entry {
            nonce,
            inserted_at: Instant::now(),
        });
        ns.notify.notify_waiters();
    }

    /// Harvest into the default namespace.
    pub async fn cache_nonce(&self, nonce: String) {
        self.put(Self::DEFAULT_NAMESPACE, nonce).await;
    }

    /// Clear `namespace`'s pool. Called after a `badNonce` response so the
    /// rejected nonce (and anything else pooled alongside it) is never
    /// handed out again.
    pub async fn clear(&self, namespace: &str) {
        let mut namespaces = self.namespaces.lock().await;
        if let Some(ns) = namespaces.get_mut(namespace) {
            ns.entries.clear();
        }
    }

    pub async fn clear_pool(&self) {
        self.clear(Self::DEFAULT_NAMESPACE).await;
    }

    pub async fn pool_size(&self) -> usize {
        self.pool_size_of(Self::DEFAULT_NAMESPACE).await
    }

    pub async fn pool_size_of(&self, namespace: &str) -> usize {
        let namespaces = self.namespaces.lock().await;
        namespaces.get(namespace).map(|ns| ns.entries.len()).unwrap_or(0)
    }
}

async fn fetch_replay_nonce(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .head(url)
        .send()
        .await
        .map_err(|e| AcmeError::connection(format!("failed to fetch nonce: {e}")))?;

    if !response.status().is_success() {
        return Err(AcmeError::protocol(
            "nonce".to_string(),
            format!("new-nonce returned HTTP {}", response.status()),
            Some(response.status().as_u16()),
        ));
    }

    response
        .headers()
        .get("replay-nonce")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| AcmeError::protocol("nonce".to_string(), "missing Replay-Nonce header".to_string(), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips_without_network() {
        let manager = NonceManager::new("https://example.com/acme/new-nonce", reqwest::Client::new());
        manager.cache_nonce("nonce-1".to_string()).await;
        assert_eq!(manager.pool_size().await, 1);

        let nonce = manager.get_nonce().await.unwrap();
        assert_eq!(nonce, "nonce-1");
        assert_eq!(manager.pool_size().await, 0);
    }

    #[tokio::test]
    async fn duplicate_nonces_are_rejected() {
        let manager = NonceManager::new("https://example.com/acme/new-nonce", reqwest::Client::new());
        manager.cache_nonce("dup".to_string()).await;
        manager.cache_nonce("dup".to_string()).await;
        assert_eq!(manager.pool_size().await, 1);
    }

    #[tokio::test]
    async fn clear_pool_empties_namespace() {
        let manager = NonceManager::new("https://example.com/acme/new-nonce", reqwest::Client::new());
        manager.cache_nonce("a".to_string()).await;
        manager.cache_nonce("b".to_string()).await;
        assert_eq!(manager.pool_size().await, 2);

        manager.clear_pool().await;
        assert_eq!(manager.pool_size().await, 0);
    }

    #[tokio::test]
    async fn namespaces_do_not_cross_contaminate() {
        let manager = NonceManager::new("https://example.com/acme/new-nonce", reqwest::Client::new());
        manager.put("acct-a", "from-a".to_string()).await;
        manager.put("acct-b", "from-b".to_string()).await;
        assert_eq!(manager.pool_size_of("acct-a").await, 1);
        assert_eq!(manager.pool_size_of("acct-b").await, 1);
        assert_eq!(manager.get("acct-a").await.unwrap(), "from-a");
        assert_eq!(manager.pool_size_of("acct-b").await, 1);
    }
}
