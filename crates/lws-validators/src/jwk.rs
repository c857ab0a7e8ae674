//! Maps a resolved [`Jwk`] plus a JWT's declared `alg` to a verified signature (§4.4).
//!
//! `jsonwebtoken` covers RSA/PS/ES256/ES384/EdDSA directly. `ES256K` (secp256k1, reachable via
//! `did:key`'s `0xEC01` prefix) isn't in its `Algorithm` enum, so that one path is verified by
//! hand against `k256`.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use k256::ecdsa::signature::Verifier as _;
use lws_core::{Jwk, ValidatorError};

/// Verifies `signature_b64` over `signing_input` (`header_b64.payload_b64`) using `jwk`,
/// enforcing that `header_alg` is consistent with the key's type (§4.4 "Any mismatch fails with
/// `ALG_KEY_MISMATCH`").
pub fn verify_signature(
    jwk: &Jwk,
    header_alg: &str,
    signing_input: &str,
    signature_b64: &str,
) -> Result<(), ValidatorError> {
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| ValidatorError::Malformed)?;

    match jwk.kty.as_str() {
        "RSA" => verify_with_jsonwebtoken(jwk, header_alg, signing_input, &signature, rsa_key),
        "EC" => match jwk.crv.as_deref() {
            Some("P-256") => {
                verify_with_jsonwebtoken(jwk, header_alg, signing_input, &signature, ec_key)
            }
            Some("secp256k1") => verify_secp256k1(jwk, header_alg, signing_input, &signature),
            _ => Err(ValidatorError::AlgKeyMismatch),
        },
        "OKP" => {
            verify_with_jsonwebtoken(jwk, header_alg, signing_input, &signature, ed25519_key)
        }
        _ => Err(ValidatorError::AlgKeyMismatch),
    }
}

fn verify_with_jsonwebtoken(
    jwk: &Jwk,
    header_alg: &str,
    signing_input: &str,
    signature: &[u8],
    key_fn: fn(&Jwk) -> Result<DecodingKey, ValidatorError>,
) -> Result<(), ValidatorError> {
    let alg = expected_algorithm(jwk, header_alg)?;
    let key = key_fn(jwk)?;
    let mut validation = Validation::new(alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims.clear();

    #[derive(serde::Deserialize)]
    struct Empty {}

    let token = format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    );
    jsonwebtoken::decode::<Empty>(&token, &key, &validation)
        .map(|_| ())
        .map_err(|_| ValidatorError::InvalidSignature)
}

fn expected_algorithm(jwk: &Jwk, header_alg: &str) -> Result<Algorithm, ValidatorError> {
    let alg = match header_alg {
        "RS256" => Algorithm::RS256,
        "RS384" => Algorithm::RS384,
        "RS512" => Algorithm::RS512,
        "PS256" => Algorithm::PS256,
        "PS384" => Algorithm::PS384,
        "PS512" => Algorithm::PS512,
        "ES256" => Algorithm::ES256,
        "ES384" => Algorithm::ES384,
        "EdDSA" => Algorithm::EdDSA,
        _ => return Err(ValidatorError::AlgKeyMismatch),
    };

    let consistent = match (jwk.kty.as_str(), alg) {
        ("RSA", Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512) => true,
        ("RSA", Algorithm::PS256 | Algorithm::PS384 | Algorithm::PS512) => true,
        ("EC", Algorithm::ES256) if jwk.crv.as_deref() == Some("P-256") => true,
        ("EC", Algorithm::ES384) if jwk.crv.as_deref() == Some("P-384") => true,
        ("OKP", Algorithm::EdDSA) => true,
        _ => false,
    };
    if !consistent {
        return Err(ValidatorError::AlgKeyMismatch);
    }
    Ok(alg)
}

fn rsa_key(jwk: &Jwk) -> Result<DecodingKey, ValidatorError> {
    let n = jwk.n.as_deref().ok_or(ValidatorError::AlgKeyMismatch)?;
    let e = jwk.e.as_deref().ok_or(ValidatorError::AlgKeyMismatch)?;
    DecodingKey::from_rsa_components(n, e).map_err(|_| ValidatorError::AlgKeyMismatch)
}

fn ec_key(jwk: &Jwk) -> Result<DecodingKey, ValidatorError> {
    let x = jwk.x.as_deref().ok_or(ValidatorError::AlgKeyMismatch)?;
    let y = jwk.y.as_deref().ok_or(ValidatorError::AlgKeyMismatch)?;
    DecodingKey::from_ec_components(x, y).map_err(|_| ValidatorError::AlgKeyMismatch)
}

fn ed25519_key(jwk: &Jwk) -> Result<DecodingKey, ValidatorError> {
    let x = jwk.x.as_deref().ok_or(ValidatorError::AlgKeyMismatch)?;
    DecodingKey::from_ed_components(x).map_err(|_| ValidatorError::AlgKeyMismatch)
}

/// `ES256K`: not part of `jsonwebtoken`'s `Algorithm` enum, verified directly against `k256`.
fn verify_secp256k1(
    jwk: &Jwk,
    header_alg: &str,
    signing_input: &str,
    signature: &[u8],
) -> Result<(), ValidatorError> {
    if header_alg != "ES256K" {
        return Err(ValidatorError::AlgKeyMismatch);
    }
    let x = jwk
        .x
        .as_deref()
        .ok_or(ValidatorError::AlgKeyMismatch)
        .and_then(|s| URL_SAFE_NO_PAD.decode(s).map_err(|_| ValidatorError::AlgKeyMismatch))?;
    let y = jwk
        .y
        .as_deref()
        .ok_or(ValidatorError::AlgKeyMismatch)
        .and_then(|s| URL_SAFE_NO_PAD.decode(s).map_err(|_| ValidatorError::AlgKeyMismatch))?;
    if x.len() != 32 || y.len() != 32 {
        return Err(ValidatorError::AlgKeyMismatch);
    }

    let encoded = k256::EncodedPoint::from_affine_coordinates(
        k256::FieldBytes::from_slice(&x),
        k256::FieldBytes::from_slice(&y),
        false,
    );
    let verifying_key = k256::ecdsa::VerifyingKey::from_encoded_point(&encoded)
        .map_err(|_| ValidatorError::AlgKeyMismatch)?;
    let sig =
        k256::ecdsa::Signature::from_slice(signature).map_err(|_| ValidatorError::Malformed)?;

    verifying_key
        .verify(signing_input.as_bytes(), &sig)
        .map_err(|_| ValidatorError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use k256::ecdsa::signature::Signer as _;
    use k256::elliptic_curve::rand_core::OsRng;
    use k256::elliptic_curve::sec1::ToEncodedPoint;

    #[test]
    fn secp256k1_roundtrip_verifies() {
        let signing_key = SigningKey::random(&mut OsRng);
        let point = signing_key.verifying_key().to_encoded_point(false);
        let x = point.x().unwrap();
        let y = point.y().unwrap();

        let jwk = Jwk {
            kty: "EC".into(),
            crv: Some("secp256k1".into()),
            n: None,
            e: None,
            x: Some(URL_SAFE_NO_PAD.encode(x)),
            y: Some(URL_SAFE_NO_PAD.encode(y)),
            kid: None,
            alg: Some("ES256K".into()),
        };

        let signing_input = "aGVhZGVy.cGF5bG9hZA";
        let sig: k256::ecdsa::Signature = signing_key.sign(signing_input.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(sig.to_bytes());

        verify_signature(&jwk, "ES256K", signing_input, &sig_b64).expect("valid signature");
    }

    #[test]
    fn secp256k1_rejects_tampered_input() {
        let signing_key = SigningKey::random(&mut OsRng);
        let point = signing_key.verifying_key().to_encoded_point(false);
        let jwk = Jwk {
            kty: "EC".into(),
            crv: Some("secp256k1".into()),
            n: None,
            e: None,
            x: Some(URL_SAFE_NO_PAD.encode(point.x().unwrap())),
            y: Some(URL_SAFE_NO_PAD.encode(point.y().unwrap())),
            kid: None,
            alg: Some("ES256K".into()),
        };
        let sig: k256::ecdsa::Signature = signing_key.sign(b"aGVhZGVy.cGF5bG9hZA");
        let sig_b64 = URL_SAFE_NO_PAD.encode(sig.to_bytes());

        let err = verify_signature(&jwk, "ES256K", "aGVhZGVy.dGFtcGVyZWQ", &sig_b64).unwrap_err();
        assert_eq!(err, ValidatorError::InvalidSignature);
    }

    #[test]
    fn rsa_alg_on_ec_key_is_key_mismatch() {
        let jwk = Jwk {
            kty: "EC".into(),
            crv: Some("P-256".into()),
            n: None,
            e: None,
            x: Some("x".into()),
            y: Some("y".into()),
            kid: None,
            alg: None,
        };
        let err = verify_signature(&jwk, "RS256", "a.b", "c").unwrap_err();
        assert_eq!(err, ValidatorError::AlgKeyMismatch);
    }
}
