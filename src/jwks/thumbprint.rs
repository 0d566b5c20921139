//! JWK Thumbprint calculation per RFC 7638.
//!
//! The thumbprint of a public key is used as its key ID, so tokens and
//! published key sets agree on the `kid` without any shared state.

use crate::jwks::publisher::Jwk;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Calculates the JWK thumbprint per RFC 7638.
pub struct JwkThumbprint;

impl JwkThumbprint {
    /// Computes the SHA-256 thumbprint of an RSA key from its base64url
    /// encoded modulus and exponent.
    #[must_use]
    pub fn compute_rsa(n: &str, e: &str) -> String {
        let canonical = Self::canonical_rsa(n, e);
        let hash = Sha256::digest(canonical.as_bytes());
        base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, hash)
    }

    /// Computes the thumbprint of an RSA JWK, `None` for any other key type
    /// or a JWK missing its components.
    #[must_use]
    pub fn compute(jwk: &Jwk) -> Option<String> {
        if jwk.kty != "RSA" {
            return None;
        }
        Some(Self::compute_rsa(jwk.n.as_deref()?, jwk.e.as_deref()?))
    }

    /// Required RSA members in lexicographic order, no whitespace.
    fn canonical_rsa(n: &str, e: &str) -> String {
        format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#)
    }

    /// Verifies that a thumbprint matches a JWK using constant-time comparison.
    #[must_use]
    pub fn verify(jwk: &Jwk, expected_thumbprint: &str) -> bool {
        let Some(computed) = Self::compute(jwk) else {
            return false;
        };
        let computed_bytes = computed.as_bytes();
        let expected_bytes = expected_thumbprint.as_bytes();

        if computed_bytes.len() != expected_bytes.len() {
            return false;
        }

        computed_bytes.ct_eq(expected_bytes).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_jwk(n: &str) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: None,
            key_use: None,
            alg: None,
            n: Some(n.to_string()),
            e: Some("AQAB".to_string()),
        }
    }

    // RFC 7638 section 3.1 example key.
    const RFC_N: &str = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";
    const RFC_THUMBPRINT: &str = "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs";

    #[test]
    fn test_rfc7638_example() {
        assert_eq!(JwkThumbprint::compute_rsa(RFC_N, "AQAB"), RFC_THUMBPRINT);
        assert!(JwkThumbprint::verify(&rsa_jwk(RFC_N), RFC_THUMBPRINT));
    }

    #[test]
    fn test_thumbprint_mismatch() {
        assert!(!JwkThumbprint::verify(&rsa_jwk("other-n"), RFC_THUMBPRINT));
        assert!(!JwkThumbprint::verify(&rsa_jwk(RFC_N), "wrong-thumbprint"));
    }

    #[test]
    fn test_non_rsa_has_no_thumbprint() {
        let mut jwk = rsa_jwk(RFC_N);
        jwk.kty = "EC".to_string();
        assert_eq!(JwkThumbprint::compute(&jwk), None);
    }

    #[test]
    fn test_canonical_json_order() {
        let canonical = JwkThumbprint::canonical_rsa("n-value", "e-value");
        assert!(canonical.find("\"e\"") < canonical.find("kty"));
        assert!(canonical.find("kty") < canonical.find("\"n\""));
    }
}
