//! JWK and JWK Set documents.

use crate::error::TokenError;
use crate::keys::PublicKey;
use serde::{Deserialize, Serialize};

/// JSON Web Key. Only the RSA members are modelled; unknown members of
/// foreign keys are ignored on parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, `RSA` for keys published here
    pub kty: String,
    /// Key ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Intended use (`sig`)
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// Algorithm the key is meant for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// RSA modulus, base64url big-endian
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent, base64url big-endian
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

/// JSON Web Key Set document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    /// Published keys
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Empty key set.
    #[must_use]
    pub fn new() -> Self {
        Jwks { keys: Vec::new() }
    }

    /// Append a key.
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// Serialize as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `KeyExport` if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, TokenError> {
        serde_json::to_vec(self).map_err(|e| TokenError::key_export(e.to_string()))
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `KeyDecode` if the document is not a JWK Set.
    pub fn from_json(data: &[u8]) -> Result<Self, TokenError> {
        serde_json::from_slice(data)
            .map_err(|e| TokenError::key_decode(format!("invalid JWK set: {e}")))
    }
}

/// Builds the single-entry key set published for `key`, tagged with `alg`.
pub fn publish(key: &PublicKey, alg: &str) -> Jwks {
    let mut jwks = Jwks::new();
    jwks.add_key(key.to_jwk(alg));
    jwks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwks::thumbprint::JwkThumbprint;
    use crate::keys::pem;

    const PUBLIC_A: &[u8] = include_bytes!("../../tests/fixtures/rsa_a.pub.pem");

    fn public_a() -> PublicKey {
        PublicKey::from_rsa(pem::decode_public_key(PUBLIC_A).unwrap()).unwrap()
    }

    #[test]
    fn test_publish_single_key() {
        let key = public_a();
        let jwks = publish(&key, "RS256");

        assert_eq!(jwks.keys.len(), 1);
        let jwk = &jwks.keys[0];
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.alg.as_deref(), Some("RS256"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
        assert_eq!(jwk.e.as_deref(), Some("AQAB"));
        assert_eq!(jwk.kid.as_deref(), Some(key.kid()));
        assert!(JwkThumbprint::verify(jwk, key.kid()));
    }

    #[test]
    fn test_json_shape() {
        let json = publish(&public_a(), "RS256").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();

        let entry = &value["keys"][0];
        assert_eq!(entry["kty"], "RSA");
        assert_eq!(entry["use"], "sig");
        assert_eq!(entry["alg"], "RS256");
        assert!(entry["n"].is_string());
        assert!(entry["e"].is_string());
    }

    #[test]
    fn test_json_round_trip() {
        let jwks = publish(&public_a(), "RS256");
        let parsed = Jwks::from_json(&jwks.to_json().unwrap()).unwrap();
        assert_eq!(parsed, jwks);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            Jwks::from_json(b"{\"not_keys\": []}"),
            Err(TokenError::KeyDecode(_))
        ));
        assert!(matches!(
            Jwks::from_json(b"garbage"),
            Err(TokenError::KeyDecode(_))
        ));
    }
}
