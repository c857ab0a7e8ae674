//! End-to-end: spawns both binaries as real processes, exchanges a self-issued `did:key` subject
//! token for an access token, drives a storage request with it, then confirms replay is rejected
//! (§4.5, §4.6, §4.7; the two-origin realm split covered here is also what guards against the
//! resource/issuer realm conflation described in §8 scenarios 1/2/4).

mod common;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use common::{KillOnDrop, pick_unused_port, spawn_authorization_server, spawn_resource_server, wait_http_ok};
use ed25519_dalek::Signer as _;
use ed25519_dalek::pkcs8::EncodePrivateKey as _;
use serde_json::{Value, json};
use std::time::Duration;

fn sign_jwt(signing_key: &ed25519_dalek::SigningKey, kid: &str, claims: Value) -> String {
    let header = json!({ "alg": "EdDSA", "kid": kid });
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = signing_key.sign(signing_input.as_bytes());
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
}

#[tokio::test]
async fn token_exchange_then_resource_access_then_replay_is_rejected() -> anyhow::Result<()> {
    let as_port = pick_unused_port()?;
    let rs_port = pick_unused_port()?;

    let as_realm_uri = format!("http://127.0.0.1:{as_port}/realms/lws");
    let as_uri = format!("http://127.0.0.1:{as_port}");
    let storage_realm_uri = format!("http://127.0.0.1:{rs_port}");

    let as_signing_key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
    let as_signing_key_der = as_signing_key.to_pkcs8_der().expect("encode as signing key");
    let as_signing_key_b64 = base64::engine::general_purpose::STANDARD.encode(as_signing_key_der.as_bytes());

    let authorization_server = spawn_authorization_server(&[
        ("LWS_BIND_ADDR", &format!("127.0.0.1:{as_port}")),
        ("LWS_REALM_URI", &as_realm_uri),
        ("LWS_AUTHORIZATION_SERVER_URI", &as_uri),
        ("LWS_SIGNING_KEY_PKCS8_B64", &as_signing_key_b64),
        ("LWS_SIGNING_KEY_ID", "as-key"),
    ])?;
    let _authorization_server = KillOnDrop(authorization_server);
    wait_http_ok(
        &format!("{as_uri}/.well-known/lws-configuration"),
        Duration::from_secs(10),
    )
    .await?;

    let resource_server = spawn_resource_server(&[
        ("LWS_BIND_ADDR", &format!("127.0.0.1:{rs_port}")),
        ("LWS_REALM_URI", &as_realm_uri),
        ("LWS_STORAGE_REALM_URI", &storage_realm_uri),
        ("LWS_AUTHORIZATION_SERVER_URI", &as_uri),
    ])?;
    let _resource_server = KillOnDrop(resource_server);
    wait_http_ok(
        &format!("{storage_realm_uri}/.well-known/lws-storage-server"),
        Duration::from_secs(10),
    )
    .await?;

    let subject_key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
    let subject_did = lws_resolver::did_key::encode_ed25519_did_key(subject_key.verifying_key().as_bytes());
    let now = lws_validators::common::now_unix();
    let subject_token = sign_jwt(
        &subject_key,
        "subject-key",
        json!({
            "sub": subject_did,
            "iss": subject_did,
            "client_id": subject_did,
            "aud": as_realm_uri,
            "iat": now,
            "exp": now + 60,
            "jti": uuid::Uuid::new_v4().to_string(),
        }),
    );

    let http = reqwest::Client::new();
    let token_resp = http
        .post(format!("{as_uri}/token"))
        .form(&[
            ("grant_type", lws_core::GRANT_TYPE_TOKEN_EXCHANGE),
            ("subject_token", &subject_token),
            ("subject_token_type", lws_core::TOKEN_TYPE_JWT),
            ("resource", &storage_realm_uri),
        ])
        .send()
        .await?;
    assert_eq!(token_resp.status(), reqwest::StatusCode::OK, "token exchange should succeed");
    let token_body: Value = token_resp.json().await?;
    let access_token = token_body["access_token"].as_str().expect("access_token present").to_string();

    let item_url = format!("{storage_realm_uri}/items/1");
    let put_resp = http
        .put(&item_url)
        .bearer_auth(&access_token)
        .body("hello")
        .send()
        .await?;
    assert_eq!(put_resp.status(), reqwest::StatusCode::OK, "first use of the access token should succeed");

    let replay_resp = http
        .put(&item_url)
        .bearer_auth(&access_token)
        .body("hello again")
        .send()
        .await?;
    assert_eq!(
        replay_resp.status(),
        reqwest::StatusCode::UNAUTHORIZED,
        "reusing a single-use access token must be rejected"
    );
    let challenge = replay_resp
        .headers()
        .get(reqwest::header::WWW_AUTHENTICATE)
        .expect("401 carries a challenge header")
        .to_str()
        .unwrap()
        .to_string();
    assert!(challenge.contains(r#"error="token_replay""#), "got: {challenge}");

    Ok(())
}
