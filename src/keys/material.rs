//! Canonical in-memory RSA key handles.
//!
//! Both handles are immutable after construction and hold the
//! `jsonwebtoken` key alongside the `rsa` key it was derived from, so
//! signing and verification never re-parse key material.

use crate::error::TokenError;
use crate::jwks::publisher::Jwk;
use crate::jwks::thumbprint::JwkThumbprint;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::rngs::OsRng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;

/// Default modulus size for generated keys.
pub const DEFAULT_KEY_BITS: usize = 2048;
/// Smallest modulus accepted anywhere.
pub const MIN_KEY_BITS: usize = 2048;
/// Largest modulus accepted (the `rsa` crate's public key limit).
pub const MAX_KEY_BITS: usize = 4096;

/// Public half of a key pair, ready for verification and export.
#[derive(Clone)]
pub struct PublicKey {
    key: RsaPublicKey,
    decoding_key: DecodingKey,
    kid: String,
}

impl PublicKey {
    /// Wraps a parsed RSA public key.
    ///
    /// # Errors
    ///
    /// Returns `KeyDecode` if the modulus is outside the accepted size range.
    pub fn from_rsa(key: RsaPublicKey) -> Result<Self, TokenError> {
        check_bits(key.size() * 8)?;

        let n = URL_SAFE_NO_PAD.encode(key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(key.e().to_bytes_be());
        let decoding_key = DecodingKey::from_rsa_components(&n, &e)
            .map_err(|err| TokenError::key_decode(err.to_string()))?;
        let kid = JwkThumbprint::compute_rsa(&n, &e);

        Ok(Self {
            key,
            decoding_key,
            kid,
        })
    }

    /// The underlying RSA key.
    #[must_use]
    pub fn rsa(&self) -> &RsaPublicKey {
        &self.key
    }

    /// Key ID (RFC 7638 thumbprint) used in token headers and key sets.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Modulus size in bits.
    #[must_use]
    pub fn bits(&self) -> usize {
        self.key.size() * 8
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Public components as a signature JWK tagged with `alg`.
    #[must_use]
    pub fn to_jwk(&self, alg: &str) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: Some(self.kid.clone()),
            key_use: Some("sig".to_string()),
            alg: Some(alg.to_string()),
            n: Some(URL_SAFE_NO_PAD.encode(self.key.n().to_bytes_be())),
            e: Some(URL_SAFE_NO_PAD.encode(self.key.e().to_bytes_be())),
        }
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("kid", &self.kid)
            .field("bits", &self.bits())
            .finish()
    }
}

/// Private half of a key pair. Present only on issuing instances.
pub struct SigningKey {
    key: RsaPrivateKey,
    encoding_key: EncodingKey,
    public: PublicKey,
}

impl SigningKey {
    /// Generates a fresh key pair.
    ///
    /// This performs a prime search and is meant to run once at startup.
    ///
    /// # Errors
    ///
    /// Returns `KeyGeneration` if `bits` is out of range or generation fails.
    pub fn generate(bits: usize) -> Result<Self, TokenError> {
        if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bits) {
            return Err(TokenError::key_generation(format!(
                "key size must be between {MIN_KEY_BITS} and {MAX_KEY_BITS} bits, got {bits}"
            )));
        }

        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| TokenError::key_generation(e.to_string()))?;
        key.validate()
            .map_err(|e| TokenError::key_generation(e.to_string()))?;

        Self::from_rsa(key).map_err(|e| TokenError::key_generation(e.to_string()))
    }

    /// Wraps a parsed RSA private key.
    ///
    /// # Errors
    ///
    /// Returns `KeyDecode` if the key is inconsistent or too small.
    pub fn from_rsa(key: RsaPrivateKey) -> Result<Self, TokenError> {
        key.validate()
            .map_err(|e| TokenError::key_decode(format!("invalid private key: {e}")))?;
        let public = PublicKey::from_rsa(key.to_public_key())?;

        let der = key
            .to_pkcs1_der()
            .map_err(|e| TokenError::key_decode(e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

        Ok(Self {
            key,
            encoding_key,
            public,
        })
    }

    /// The underlying RSA key.
    #[must_use]
    pub fn rsa(&self) -> &RsaPrivateKey {
        &self.key
    }

    /// Public counterpart of this key.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Key ID of the public counterpart.
    #[must_use]
    pub fn kid(&self) -> &str {
        self.public.kid()
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid())
            .field("bits", &self.public.bits())
            .finish_non_exhaustive()
    }
}

fn check_bits(bits: usize) -> Result<(), TokenError> {
    if bits < MIN_KEY_BITS {
        return Err(TokenError::key_decode(format!(
            "RSA key too small: {bits} bits, minimum is {MIN_KEY_BITS}"
        )));
    }
    if bits > MAX_KEY_BITS {
        return Err(TokenError::key_decode(format!(
            "RSA key too large: {bits} bits, maximum is {MAX_KEY_BITS}"
        )));
    }
    Ok(())
}
