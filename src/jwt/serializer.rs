//! Compact JWS encoding.

use crate::error::TokenError;
use crate::jwt::claims::Claims;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// Compact JWS encoding bound to a single algorithm.
#[derive(Debug, Clone)]
pub struct JwtSerializer {
    algorithm: Algorithm,
}

impl Default for JwtSerializer {
    fn default() -> Self {
        Self::new(Algorithm::RS256)
    }
}

impl JwtSerializer {
    /// Serializer for `algorithm`.
    pub fn new(algorithm: Algorithm) -> Self {
        JwtSerializer { algorithm }
    }

    /// Bound algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Algorithm name as written in headers and key sets.
    pub fn algorithm_name(&self) -> &'static str {
        match self.algorithm {
            Algorithm::HS256 => "HS256",
            Algorithm::HS384 => "HS384",
            Algorithm::HS512 => "HS512",
            Algorithm::ES256 => "ES256",
            Algorithm::ES384 => "ES384",
            Algorithm::RS256 => "RS256",
            Algorithm::RS384 => "RS384",
            Algorithm::RS512 => "RS512",
            Algorithm::PS256 => "PS256",
            Algorithm::PS384 => "PS384",
            Algorithm::PS512 => "PS512",
            Algorithm::EdDSA => "EdDSA",
        }
    }

    /// Signs `claims` into a compact token, writing `key_id` to the header.
    ///
    /// # Errors
    ///
    /// Returns `Signing` if encoding or signing fails.
    pub fn serialize(&self, claims: &Claims, key: &EncodingKey, key_id: Option<&str>) -> Result<String, TokenError> {
        let mut header = Header::new(self.algorithm);
        if let Some(kid) = key_id {
            header.kid = Some(kid.to_string());
        }

        encode(&header, claims, key).map_err(|e| TokenError::signing(e.to_string()))
    }

    /// Checks the signature and decodes the claims. Time-based claims are
    /// left to the caller.
    pub fn deserialize(&self, token: &str, key: &DecodingKey) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data =
            decode::<Claims>(token, key, &validation).map_err(|e| TokenError::from_decode(&e))?;

        Ok(token_data.claims)
    }

    /// Decodes the header only.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` if the header cannot be decoded.
    pub fn decode_header(&self, token: &str) -> Result<Header, TokenError> {
        jsonwebtoken::decode_header(token)
            .map_err(|e| TokenError::malformed(format!("invalid header: {e}")))
    }

    /// Decodes header and claims without checking the signature.
    pub fn deserialize_unverified(&self, token: &str) -> Result<(Header, Claims), TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(TokenError::malformed("invalid token format"));
        }

        let header = self.decode_header(token)?;

        let payload = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|e| TokenError::malformed(format!("invalid payload encoding: {e}")))?;

        let claims = serde_json::from_slice(&payload)
            .map_err(|e| TokenError::malformed(format!("invalid payload: {e}")))?;

        Ok((header, claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{pem, SigningKey};

    const PRIVATE_A: &[u8] = include_bytes!("../../tests/fixtures/rsa_a.pem");

    fn signing_key() -> SigningKey {
        SigningKey::from_rsa(pem::decode_private_key(PRIVATE_A).unwrap()).unwrap()
    }

    fn sample_claims() -> Claims {
        Claims::new("test-issuer".to_string(), "user-123".to_string(), 1_700_000_000)
            .with_expiration(1_700_003_600)
    }

    #[test]
    fn test_round_trip_rs256() {
        let serializer = JwtSerializer::default();
        let key = signing_key();
        let claims = sample_claims();

        let token = serializer
            .serialize(&claims, key.encoding_key(), Some(key.kid()))
            .unwrap();
        let decoded = serializer
            .deserialize(&token, key.public_key().decoding_key())
            .unwrap();

        assert_eq!(decoded, claims);

        let header = serializer.decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some(key.kid()));
    }

    #[test]
    fn test_expired_claims_still_decode() {
        // 2023-era expiration; expiry policy belongs to the verifier.
        let serializer = JwtSerializer::default();
        let key = signing_key();
        let token = serializer
            .serialize(&sample_claims(), key.encoding_key(), None)
            .unwrap();
        assert!(serializer
            .deserialize(&token, key.public_key().decoding_key())
            .is_ok());
    }

    #[test]
    fn test_unverified_decode() {
        let serializer = JwtSerializer::default();
        let key = signing_key();
        let token = serializer
            .serialize(&sample_claims(), key.encoding_key(), None)
            .unwrap();

        let (header, claims) = serializer.deserialize_unverified(&token).unwrap();
        assert_eq!(header.kid, None);
        assert_eq!(claims, sample_claims());
    }

    #[test]
    fn test_unverified_rejects_garbage() {
        let serializer = JwtSerializer::default();
        for token in ["", "abc", "a.b", "a.b.c.d", "e30.!!!.sig"] {
            assert!(
                matches!(
                    serializer.deserialize_unverified(token),
                    Err(TokenError::MalformedToken(_))
                ),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_algorithm_name() {
        assert_eq!(JwtSerializer::default().algorithm_name(), "RS256");
    }
}
