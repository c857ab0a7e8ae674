use anyhow::Context as _;
use clap::Parser as _;
use lws_access::jwks_cache::RealmJwks;
use lws_access::{AccessTokenValidator, AccessTokenValidatorConfig};
use lws_replay::{InProcessJtiStore, JtiStore, RedisJtiStore};
use lws_resolver::{DocumentCache, InProcessCache, RedisDocumentCache};
use lws_server::resource::{ResourceState, router};
use lws_server::storage::InMemoryStorage;
use lws_server::ServerArgs;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = ServerArgs::parse();
    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(u64::from(args.cid_fetch_timeout_ms)))
        .build()
        .context("build http client")?;

    let document_cache: Arc<dyn DocumentCache> = match &args.document_cache_endpoint {
        Some(endpoint) => Arc::new(RedisDocumentCache::new(endpoint)?),
        None => Arc::new(InProcessCache::new()),
    };
    let jwks = RealmJwks::new(http, document_cache, Duration::from_secs(u64::from(args.cid_default_ttl_s)));

    let jti_store: Arc<dyn JtiStore> = match &args.jti_store_endpoint {
        Some(endpoint) => Arc::new(RedisJtiStore::new(endpoint)?),
        None => {
            let store = InProcessJtiStore::new();
            store.spawn_sweeper(Duration::from_secs(60));
            Arc::new(store)
        }
    };

    let validator = Arc::new(AccessTokenValidator::new(
        AccessTokenValidatorConfig {
            realm: args.realm_uri.clone(),
            jwks_uri: args.effective_jwks_uri(),
            clock_skew_secs: i64::from(args.clock_skew_tolerance_s),
        },
        jwks,
        jti_store,
    ));

    let state = ResourceState {
        realm: args.effective_storage_realm_uri(),
        authorization_server_uri: args.authorization_server_uri.clone(),
        validator,
        backend: Arc::new(InMemoryStorage::new()),
    };

    let listener = TcpListener::bind(&args.bind_addr).await.context("bind")?;
    tracing::info!(addr = %listener.local_addr()?, "lws resource server listening");
    axum::serve(listener, router(state)).await.context("serve")?;
    Ok(())
}
