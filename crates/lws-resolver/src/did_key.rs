//! `did:key` decoding (§4.1, §8 round-trip property, §9 compressed-point note).

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use lws_core::{Jwk, ResolverError};

const ED25519_PREFIX: [u8; 2] = [0xed, 0x01];
const P256_PREFIX: [u8; 2] = [0x12, 0x00];
const SECP256K1_PREFIX: [u8; 2] = [0xec, 0x01];

/// Decodes a `did:key:<multibase>` identifier into a public [`Jwk`].
pub fn resolve_did_key(did: &str) -> Result<Jwk, ResolverError> {
    let suffix = did
        .strip_prefix("did:key:")
        .ok_or_else(|| ResolverError::InvalidUri("missing did:key: prefix".to_string()))?;

    let base58 = suffix
        .strip_prefix('z')
        .ok_or_else(|| ResolverError::InvalidUri("expected base58btc multibase ('z')".to_string()))?;

    let bytes = bs58::decode(base58)
        .into_vec()
        .map_err(|e| ResolverError::InvalidUri(format!("invalid multibase payload: {e}")))?;

    if bytes.len() < 2 {
        return Err(ResolverError::InvalidUri("payload too short".to_string()));
    }
    let prefix = [bytes[0], bytes[1]];
    let key_bytes = &bytes[2..];

    match prefix {
        ED25519_PREFIX => decode_ed25519(key_bytes),
        P256_PREFIX => decode_uncompressed_point(key_bytes, "P-256", "ES256"),
        SECP256K1_PREFIX => decode_uncompressed_point(key_bytes, "secp256k1", "ES256K"),
        _ => Err(ResolverError::UnsupportedKeyType),
    }
}

fn decode_ed25519(key_bytes: &[u8]) -> Result<Jwk, ResolverError> {
    if key_bytes.len() != 32 {
        return Err(ResolverError::InvalidDocument(
            "ed25519 key must be 32 bytes".to_string(),
        ));
    }
    Ok(Jwk {
        kty: "OKP".to_string(),
        crv: Some("Ed25519".to_string()),
        n: None,
        e: None,
        x: Some(URL_SAFE_NO_PAD.encode(key_bytes)),
        y: None,
        kid: None,
        alg: Some("EdDSA".to_string()),
    })
}

fn decode_uncompressed_point(
    key_bytes: &[u8],
    crv: &str,
    alg: &str,
) -> Result<Jwk, ResolverError> {
    // Uncompressed SEC1 point: 0x04 || x(32) || y(32).
    if key_bytes.len() != 65 {
        return Err(ResolverError::UnsupportedKeyFormat);
    }
    if key_bytes[0] != 0x04 {
        return Err(ResolverError::UnsupportedKeyFormat);
    }
    let x = &key_bytes[1..33];
    let y = &key_bytes[33..65];
    Ok(Jwk {
        kty: "EC".to_string(),
        crv: Some(crv.to_string()),
        n: None,
        e: None,
        x: Some(URL_SAFE_NO_PAD.encode(x)),
        y: Some(URL_SAFE_NO_PAD.encode(y)),
        kid: None,
        alg: Some(alg.to_string()),
    })
}

/// Re-encodes a raw Ed25519 public key as a `did:key` identifier. Exists to support the
/// round-trip property in §8 and test fixtures; production paths only decode.
#[must_use]
pub fn encode_ed25519_did_key(public_key: &[u8; 32]) -> String {
    let mut payload = Vec::with_capacity(34);
    payload.extend_from_slice(&ED25519_PREFIX);
    payload.extend_from_slice(public_key);
    format!("did:key:z{}", bs58::encode(payload).into_string())
}

/// Re-encodes an uncompressed P-256 point as a `did:key` identifier (test/fixture use).
#[must_use]
pub fn encode_p256_did_key(x: &[u8; 32], y: &[u8; 32]) -> String {
    encode_uncompressed_point(&P256_PREFIX, x, y)
}

/// Re-encodes an uncompressed secp256k1 point as a `did:key` identifier (test/fixture use).
#[must_use]
pub fn encode_secp256k1_did_key(x: &[u8; 32], y: &[u8; 32]) -> String {
    encode_uncompressed_point(&SECP256K1_PREFIX, x, y)
}

fn encode_uncompressed_point(prefix: &[u8; 2], x: &[u8; 32], y: &[u8; 32]) -> String {
    let mut payload = Vec::with_capacity(2 + 65);
    payload.extend_from_slice(prefix);
    payload.push(0x04);
    payload.extend_from_slice(x);
    payload.extend_from_slice(y);
    format!("did:key:z{}", bs58::encode(payload).into_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_round_trip() {
        let pk = [7u8; 32];
        let did = encode_ed25519_did_key(&pk);
        assert!(did.starts_with("did:key:z"));
        let jwk = resolve_did_key(&did).expect("decode");
        assert_eq!(jwk.kty, "OKP");
        assert_eq!(jwk.crv.as_deref(), Some("Ed25519"));
        assert_eq!(jwk.alg.as_deref(), Some("EdDSA"));
        assert_eq!(
            URL_SAFE_NO_PAD.decode(jwk.x.unwrap()).unwrap(),
            pk.to_vec()
        );
    }

    #[test]
    fn p256_round_trip() {
        let x = [1u8; 32];
        let y = [2u8; 32];
        let did = encode_p256_did_key(&x, &y);
        let jwk = resolve_did_key(&did).expect("decode");
        assert_eq!(jwk.kty, "EC");
        assert_eq!(jwk.crv.as_deref(), Some("P-256"));
        assert_eq!(jwk.alg.as_deref(), Some("ES256"));
    }

    #[test]
    fn secp256k1_round_trip() {
        let x = [3u8; 32];
        let y = [4u8; 32];
        let did = encode_secp256k1_did_key(&x, &y);
        let jwk = resolve_did_key(&did).expect("decode");
        assert_eq!(jwk.crv.as_deref(), Some("secp256k1"));
        assert_eq!(jwk.alg.as_deref(), Some("ES256K"));
    }

    #[test]
    fn unknown_prefix_is_unsupported_key_type() {
        let payload = [0x01, 0x02, 0x03];
        let did = format!("did:key:z{}", bs58::encode(payload).into_string());
        assert_eq!(
            resolve_did_key(&did).unwrap_err(),
            ResolverError::UnsupportedKeyType
        );
    }

    #[test]
    fn missing_prefix_is_rejected() {
        assert!(resolve_did_key("did:web:example.com").is_err());
    }

    #[test]
    fn compressed_point_is_rejected() {
        // Compressed SEC1 point starts with 0x02/0x03 and is 33 bytes, not 65.
        let mut payload = vec![0x12, 0x00, 0x02];
        payload.extend_from_slice(&[9u8; 32]);
        let did = format!("did:key:z{}", bs58::encode(payload).into_string());
        assert_eq!(
            resolve_did_key(&did).unwrap_err(),
            ResolverError::UnsupportedKeyFormat
        );
    }
}
