//! TTL-bounded document/key cache with graceful degradation to an in-process map (§4.2, §9).

use parking_lot::RwLock;
use redis::AsyncCommands as _;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// `{ get, put, delete, clear }` contract shared by the networked and in-process backends (§9).
#[async_trait::async_trait]
pub trait DocumentCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration);
    async fn delete(&self, key: &str);
    async fn clear(&self);
}

/// Bounded in-process map with lazy expiry (checked on access) and a periodic sweep.
///
/// Used standalone, or as the degrade target for [`RedisDocumentCache`].
pub struct InProcessCache {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl InProcessCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Spawns a background sweep that evicts expired entries every `interval`. The per-request
    /// path never waits on this; it only shrinks memory.
    pub fn spawn_sweeper(&self, interval: Duration) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let now = Instant::now();
                inner.write().retain(|_, e| e.expires_at > now);
            }
        });
    }
}

impl Default for InProcessCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DocumentCache for InProcessCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        // Reads under the lock are brief (no I/O), per §5.
        let mut map = self.inner.write();
        let entry = map.get(key)?;
        if entry.expires_at <= Instant::now() {
            map.remove(key);
            return None;
        }
        Some(map.get(key).unwrap().value.clone())
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        self.inner.write().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn delete(&self, key: &str) {
        self.inner.write().remove(key);
    }

    async fn clear(&self) {
        self.inner.write().clear();
    }
}

/// Networked (Redis) cache with a one-way per-instance degrade latch (§9): once a connection
/// attempt fails, this instance stops trying to reconnect for the remainder of its lifetime and
/// serves every subsequent call from the in-process fallback.
pub struct RedisDocumentCache {
    client: redis::Client,
    fallback: InProcessCache,
    degraded: AtomicBool,
}

impl RedisDocumentCache {
    /// # Errors
    /// Returns an error only if `endpoint` is not a well-formed redis URL; connectivity is not
    /// checked here (the first real call establishes the degrade/latch state).
    pub fn new(endpoint: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(endpoint)?;
        Ok(Self {
            client,
            fallback: InProcessCache::new(),
            degraded: AtomicBool::new(false),
        })
    }

    async fn conn(&self) -> Option<redis::aio::ConnectionManager> {
        if self.degraded.load(Ordering::Relaxed) {
            return None;
        }
        match self.client.get_connection_manager().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                if !self.degraded.swap(true, Ordering::Relaxed) {
                    tracing::warn!(error = %e, "document cache degraded to in-process fallback");
                }
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl DocumentCache for RedisDocumentCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let Some(mut conn) = self.conn().await else {
            return self.fallback.get(key).await;
        };
        match conn.get::<_, Option<Vec<u8>>>(key).await {
            Ok(v) => v,
            Err(_) => self.fallback.get(key).await,
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let Some(mut conn) = self.conn().await else {
            self.fallback.put(key, value, ttl).await;
            return;
        };
        let secs = ttl.as_secs().max(1);
        if conn
            .set_ex::<_, _, ()>(key, value.clone(), secs)
            .await
            .is_err()
        {
            self.fallback.put(key, value, ttl).await;
        }
    }

    async fn delete(&self, key: &str) {
        if let Some(mut conn) = self.conn().await {
            let _: Result<(), _> = conn.del(key).await;
        }
        self.fallback.delete(key).await;
    }

    async fn clear(&self) {
        // Networked backends are shared; clearing them here would affect other processes, so
        // `clear` only ever touches the local fallback view.
        self.fallback.clear().await;
    }
}

/// Derives the TTL for a cached CID document (§4.2): `min(upstream_max_age, configured_max)`,
/// clamped to a configured minimum, falling back to `configured_default` if upstream gave no
/// cacheability hint.
#[must_use]
pub fn derive_cid_ttl(
    upstream_max_age: Option<Duration>,
    configured_min: Duration,
    configured_max: Duration,
    configured_default: Duration,
) -> Duration {
    let base = upstream_max_age.unwrap_or(configured_default);
    base.min(configured_max).max(configured_min)
}

/// Parses `Cache-Control: max-age=N` from response headers (mirrors JWKS cache-control parsing).
#[must_use]
pub fn parse_cache_control_max_age(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let v = headers
        .get(reqwest::header::CACHE_CONTROL)?
        .to_str()
        .ok()?;
    for part in v.split(',').map(str::trim) {
        if let Some(rest) = part.strip_prefix("max-age=")
            && let Ok(secs) = rest.parse::<u64>()
        {
            return Some(Duration::from_secs(secs));
        }
    }
    None
}
