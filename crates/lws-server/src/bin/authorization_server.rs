use anyhow::Context as _;
use clap::Parser as _;
use lws_exchange::TokenExchangeHandler;
use lws_exchange::signing_key::SigningKey;
use lws_resolver::{FetchOptions, IdentifierResolver, InProcessCache, RedisDocumentCache, TtlBounds};
use lws_server::authz::{router, AuthzState};
use lws_server::ServerArgs;
use lws_validators::ValidatorRegistry;
use lws_validators::{OpenIdValidator, SelfIssuedValidator};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = ServerArgs::parse();
    let config = args.lws_config();
    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(u64::from(config.cid_fetch_timeout_ms)))
        .build()
        .context("build http client")?;

    let document_cache: Arc<dyn lws_resolver::DocumentCache> = match &config.document_cache_endpoint {
        Some(endpoint) => Arc::new(RedisDocumentCache::new(endpoint)?),
        None => Arc::new(InProcessCache::new()),
    };

    let resolver = Arc::new(IdentifierResolver::new(
        http.clone(),
        document_cache,
        FetchOptions {
            https_only: config.cid_https_only,
            max_bytes: config.cid_max_bytes as usize,
            timeout: Duration::from_millis(u64::from(config.cid_fetch_timeout_ms)),
        },
        TtlBounds {
            min: Duration::from_secs(60),
            max: Duration::from_secs(24 * 3600),
            default: Duration::from_secs(u64::from(config.cid_default_ttl_s)),
        },
    ));

    let mut registry = ValidatorRegistry::new();
    registry.register(Arc::new(SelfIssuedValidator::new(resolver)));
    if let Some(issuer) = &args.oidc_issuer {
        match OpenIdValidator::discover(issuer.clone(), http.clone()).await {
            Ok(v) => registry.register(Arc::new(v)),
            Err(e) => tracing::warn!(error = %e, issuer, "OIDC discovery failed; running without id_token support"),
        }
    }

    let der = args.decode_signing_key_der()?;
    let signing_key = match der {
        Some(der) => {
            let public = public_key_from_pkcs8(&der)?;
            SigningKey::from_ed25519(args.signing_key_id.clone(), &der, &public)
        }
        None => {
            tracing::warn!("LWS_SIGNING_KEY_PKCS8_B64 not set; generating an ephemeral signing key for this process only");
            ephemeral_signing_key(args.signing_key_id.clone())?
        }
    };
    let jwks_json = serde_json::json!({ "keys": [signing_key.public_jwk()] });

    let handler = Arc::new(TokenExchangeHandler::new(
        config.realm_uri.clone(),
        config,
        registry,
        signing_key,
    ));

    let state = AuthzState {
        realm: args.realm_uri.clone(),
        authorization_server_uri: args.authorization_server_uri.clone(),
        handler,
        jwks_json: Arc::new(jwks_json),
    };

    let listener = TcpListener::bind(&args.bind_addr).await.context("bind")?;
    tracing::info!(addr = %listener.local_addr()?, "lws authorization server listening");
    axum::serve(listener, router(state)).await.context("serve")?;
    Ok(())
}

fn ephemeral_signing_key(kid: String) -> anyhow::Result<SigningKey> {
    use ed25519_dalek::pkcs8::EncodePrivateKey as _;
    let signing_key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
    let der = signing_key.to_pkcs8_der().context("encode ephemeral key")?;
    Ok(SigningKey::from_ed25519(
        kid,
        der.as_bytes(),
        signing_key.verifying_key().as_bytes(),
    ))
}

fn public_key_from_pkcs8(der: &[u8]) -> anyhow::Result<[u8; 32]> {
    use ed25519_dalek::pkcs8::DecodePrivateKey as _;
    let signing_key =
        ed25519_dalek::SigningKey::from_pkcs8_der(der).context("parse LWS_SIGNING_KEY_PKCS8_B64")?;
    Ok(*signing_key.verifying_key().as_bytes())
}
