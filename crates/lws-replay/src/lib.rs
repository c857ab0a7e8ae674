//! Single-use `jti` registry (§4.3, §5). Enforces at-most-once semantics per access-token `jti`
//! over its remaining lifetime.

use parking_lot::Mutex;
use redis::AsyncCommands as _;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[async_trait::async_trait]
pub trait JtiStore: Send + Sync {
    /// Informational membership check (§4.3 contract). Not the serialisation point; see
    /// [`JtiStore::try_claim`].
    async fn is_used(&self, jti: &str) -> bool;

    /// Unconditionally marks `jti` as used for `ttl`. Exposed for contract parity with §4.3; the
    /// race-safe path is [`JtiStore::try_claim`].
    async fn mark_used(&self, jti: &str, ttl: Duration);

    /// Atomically claims `jti`: returns `true` if this call is the first to see it (and it is
    /// now marked used), `false` if another call already claimed it. This is the serialisation
    /// point required by §5 step 8.
    async fn try_claim(&self, jti: &str, ttl: Duration) -> bool;

    /// Whether this store is currently operating in degraded (local-only) mode (§4.3, §7).
    fn is_degraded(&self) -> bool {
        false
    }
}

/// Process-local fallback: a mutex around a hash map, as required by §4.3.
pub struct InProcessJtiStore {
    inner: Arc<Mutex<HashMap<String, Instant>>>,
}

impl InProcessJtiStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn spawn_sweeper(&self, interval: Duration) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let now = Instant::now();
                inner.lock().retain(|_, expiry| *expiry > now);
            }
        });
    }
}

impl Default for InProcessJtiStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl JtiStore for InProcessJtiStore {
    async fn is_used(&self, jti: &str) -> bool {
        let mut map = self.inner.lock();
        match map.get(jti) {
            Some(expiry) if *expiry > Instant::now() => true,
            Some(_) => {
                map.remove(jti);
                false
            }
            None => false,
        }
    }

    async fn mark_used(&self, jti: &str, ttl: Duration) {
        self.inner
            .lock()
            .insert(jti.to_string(), Instant::now() + ttl);
    }

    async fn try_claim(&self, jti: &str, ttl: Duration) -> bool {
        let mut map = self.inner.lock();
        let now = Instant::now();
        if let Some(expiry) = map.get(jti)
            && *expiry > now
        {
            return false;
        }
        map.insert(jti.to_string(), now + ttl);
        true
    }
}

/// Networked (Redis) store with the same one-way degrade latch as the document cache (§4.2,
/// §4.3, §9). Fallback mode is less safe (replay possible across nodes), so every transition
/// into it is logged once, per §7.
pub struct RedisJtiStore {
    client: redis::Client,
    fallback: InProcessJtiStore,
    degraded: AtomicBool,
}

impl RedisJtiStore {
    /// # Errors
    /// Returns an error only if `endpoint` is not a well-formed redis URL.
    pub fn new(endpoint: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: redis::Client::open(endpoint)?,
            fallback: InProcessJtiStore::new(),
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
                    tracing::warn!(
                        error = %e,
                        "jti replay store degraded to in-process fallback; replay across nodes is no longer prevented"
                    );
                }
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl JtiStore for RedisJtiStore {
    async fn is_used(&self, jti: &str) -> bool {
        let Some(mut conn) = self.conn().await else {
            return self.fallback.is_used(jti).await;
        };
        conn.exists::<_, bool>(jti).await.unwrap_or(false)
    }

    async fn mark_used(&self, jti: &str, ttl: Duration) {
        let Some(mut conn) = self.conn().await else {
            self.fallback.mark_used(jti, ttl).await;
            return;
        };
        let _: Result<(), _> = conn.set_ex(jti, 1u8, ttl.as_secs().max(1)).await;
    }

    async fn try_claim(&self, jti: &str, ttl: Duration) -> bool {
        let Some(mut conn) = self.conn().await else {
            return self.fallback.try_claim(jti, ttl).await;
        };
        // `SET key val NX EX ttl` is the atomic "set if not exists with TTL" primitive (§4.3).
        let opts = redis::SetOptions::default()
            .conditional_set(redis::ExistenceCheck::NX)
            .with_expiration(redis::SetExpiry::EX(ttl.as_secs().max(1) as usize));
        match conn.set_options::<_, _, Option<String>>(jti, 1u8, opts).await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(_) => self.fallback.try_claim(jti, ttl).await,
        }
    }

    fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}
