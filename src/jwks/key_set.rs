//! Verification key set parsed from a published JWK Set or PEM bundle.

use crate::error::TokenError;
use crate::jwks::publisher::{Jwk, Jwks};
use crate::keys::{pem, PublicKey};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::{BigUint, RsaPublicKey};
use std::str::FromStr;
use tracing::debug;

/// Encoding of key-set bytes handed to the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySetEncoding {
    /// JWK Set document (`{"keys": [...]}`)
    Json,
    /// One or more concatenated public key PEM blocks
    Pem,
}

impl FromStr for KeySetEncoding {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pem" => Ok(Self::Pem),
            _ => Err(TokenError::config(format!("Invalid key set encoding: {s}"))),
        }
    }
}

/// One usable verification key.
#[derive(Debug, Clone)]
pub struct KeySetEntry {
    /// Key ID as published, if any
    pub kid: Option<String>,
    /// Algorithm the key is restricted to, if any
    pub alg: Option<String>,
    /// The key itself
    pub key: PublicKey,
}

/// Immutable set of verification keys.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    entries: Vec<KeySetEntry>,
}

impl KeySet {
    /// Parses key-set bytes in the given encoding.
    ///
    /// # Errors
    ///
    /// Returns `KeyDecode` if the document itself cannot be parsed.
    pub fn parse(data: &[u8], encoding: KeySetEncoding) -> Result<Self, TokenError> {
        match encoding {
            KeySetEncoding::Json => Ok(Self::from_jwks(&Jwks::from_json(data)?)),
            KeySetEncoding::Pem => Self::from_pem(data),
        }
    }

    /// Builds a key set from a JWK Set, keeping only usable RSA signature keys.
    #[must_use]
    pub fn from_jwks(jwks: &Jwks) -> Self {
        let entries = jwks
            .keys
            .iter()
            .filter_map(|jwk| {
                let key = Self::jwk_to_public_key(jwk)?;
                Some(KeySetEntry {
                    kid: jwk.kid.clone(),
                    alg: jwk.alg.clone(),
                    key,
                })
            })
            .collect::<Vec<_>>();

        debug!(
            published = jwks.keys.len(),
            usable = entries.len(),
            "Key set loaded"
        );
        Self { entries }
    }

    /// Builds a key set from PEM public keys; each entry's kid is its thumbprint.
    ///
    /// # Errors
    ///
    /// Returns `KeyDecode` if any block is not a usable RSA public key.
    pub fn from_pem(data: &[u8]) -> Result<Self, TokenError> {
        let entries = pem::decode_public_keys(data)?
            .into_iter()
            .map(|rsa_key| {
                let key = PublicKey::from_rsa(rsa_key)?;
                Ok(KeySetEntry {
                    kid: Some(key.kid().to_string()),
                    alg: None,
                    key,
                })
            })
            .collect::<Result<Vec<_>, TokenError>>()?;

        Ok(Self { entries })
    }

    /// Number of usable keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no usable key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Usable entries in document order.
    #[must_use]
    pub fn entries(&self) -> &[KeySetEntry] {
        &self.entries
    }

    /// Selects the key for a token header.
    ///
    /// A key matches when its kid equals `kid` and its `alg`, if set, equals
    /// `alg`. Without a kid match, the only key of a one-entry set is used
    /// when that key carries no kid of its own.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` when no key qualifies.
    pub fn find(&self, kid: Option<&str>, alg: &str) -> Result<&PublicKey, TokenError> {
        let alg_matches = |entry: &KeySetEntry| entry.alg.as_deref().map_or(true, |a| a == alg);

        if let Some(kid) = kid {
            if let Some(entry) = self
                .entries
                .iter()
                .find(|entry| entry.kid.as_deref() == Some(kid) && alg_matches(*entry))
            {
                return Ok(&entry.key);
            }
        }

        match self.entries.as_slice() {
            [only] if only.kid.is_none() && alg_matches(only) => Ok(&only.key),
            _ => Err(TokenError::KeyNotFound {
                kid: kid.map(str::to_string),
            }),
        }
    }

    /// Converts a JWK to a public key, `None` if the key is unusable here.
    fn jwk_to_public_key(jwk: &Jwk) -> Option<PublicKey> {
        if jwk.kty != "RSA" {
            debug!(kty = %jwk.kty, "Skipping non-RSA key");
            return None;
        }
        if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
            debug!(kid = ?jwk.kid, "Skipping non-signature key");
            return None;
        }

        let n = URL_SAFE_NO_PAD.decode(jwk.n.as_ref()?).ok()?;
        let e = URL_SAFE_NO_PAD.decode(jwk.e.as_ref()?).ok()?;
        let rsa_key =
            RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e)).ok()?;

        match PublicKey::from_rsa(rsa_key) {
            Ok(key) => Some(key),
            Err(err) => {
                debug!(kid = ?jwk.kid, error = %err, "Skipping unusable RSA key");
                None
            }
        }
    }
}

impl From<PublicKey> for KeySet {
    fn from(key: PublicKey) -> Self {
        Self {
            entries: vec![KeySetEntry {
                kid: Some(key.kid().to_string()),
                alg: None,
                key,
            }],
        }
    }
}
