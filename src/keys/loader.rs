//! Key material loading.
//!
//! A [`KeyConfig`] names at most one source per role. Signing sources are a
//! freshly generated pair, a parsed private key, or PEM bytes. Verification
//! sources are a parsed public key, PEM bytes, or a key-set document; when
//! none is given the public half of the signing key is used.
//!
//! Supplying two sources for the same role is a configuration error: the
//! builder never picks one over the other.

use crate::error::TokenError;
use crate::jwks::key_set::{KeySet, KeySetEncoding};
use crate::keys::material::{PublicKey, SigningKey, DEFAULT_KEY_BITS};
use crate::keys::pem;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// Where the signing (private) key comes from.
pub enum SigningKeySource {
    /// Generate a fresh pair of the given modulus size
    Generate {
        /// Modulus size in bits
        bits: usize,
    },
    /// Already parsed private key
    Key(RsaPrivateKey),
    /// PEM-encoded private key (PKCS#1 or PKCS#8)
    Pem(Zeroizing<Vec<u8>>),
}

impl SigningKeySource {
    fn name(&self) -> &'static str {
        match self {
            Self::Generate { .. } => "generate",
            Self::Key(_) => "key",
            Self::Pem(_) => "pem",
        }
    }
}

impl fmt::Debug for SigningKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate { bits } => f.debug_struct("Generate").field("bits", bits).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// Where the verification (public) key material comes from.
#[derive(Debug)]
pub enum VerificationKeySource {
    /// Public half of the signing key
    DerivedFromSigning,
    /// Already parsed public key
    Key(RsaPublicKey),
    /// PEM-encoded public key (PKCS#1 or SPKI)
    Pem(Vec<u8>),
    /// Published key set
    KeySet {
        /// Raw key-set bytes
        data: Vec<u8>,
        /// Encoding of `data`
        encoding: KeySetEncoding,
    },
}

impl VerificationKeySource {
    fn name(&self) -> &'static str {
        match self {
            Self::DerivedFromSigning => "derived",
            Self::Key(_) => "key",
            Self::Pem(_) => "pem",
            Self::KeySet { .. } => "key-set",
        }
    }
}

/// Validated key configuration. Built with [`KeyConfigBuilder`].
#[derive(Debug)]
pub struct KeyConfig {
    signing: Option<SigningKeySource>,
    verification: VerificationKeySource,
}

impl KeyConfig {
    /// Start building a key configuration.
    #[must_use]
    pub fn builder() -> KeyConfigBuilder {
        KeyConfigBuilder::default()
    }

    /// Configured signing source, if this instance issues tokens.
    #[must_use]
    pub fn signing(&self) -> Option<&SigningKeySource> {
        self.signing.as_ref()
    }

    /// Configured verification source.
    #[must_use]
    pub fn verification(&self) -> &VerificationKeySource {
        &self.verification
    }
}

/// Builder enforcing one source per role.
#[derive(Debug, Default)]
pub struct KeyConfigBuilder {
    signing: Option<SigningKeySource>,
    verification: Option<VerificationKeySource>,
    conflicts: Vec<String>,
}

impl KeyConfigBuilder {
    /// Generate a fresh pair of the default size.
    #[must_use]
    pub fn generate(self) -> Self {
        self.generate_with_bits(DEFAULT_KEY_BITS)
    }

    /// Generate a fresh pair of `bits` modulus size.
    #[must_use]
    pub fn generate_with_bits(self, bits: usize) -> Self {
        self.signing_source(SigningKeySource::Generate { bits })
    }

    /// Use an already parsed private key.
    #[must_use]
    pub fn private_key(self, key: RsaPrivateKey) -> Self {
        self.signing_source(SigningKeySource::Key(key))
    }

    /// Use a PEM-encoded private key.
    #[must_use]
    pub fn private_key_pem(self, pem: impl Into<Vec<u8>>) -> Self {
        self.signing_source(SigningKeySource::Pem(Zeroizing::new(pem.into())))
    }

    /// Use an already parsed public key.
    #[must_use]
    pub fn public_key(self, key: RsaPublicKey) -> Self {
        self.verification_source(VerificationKeySource::Key(key))
    }

    /// Use a PEM-encoded public key.
    #[must_use]
    pub fn public_key_pem(self, pem: impl Into<Vec<u8>>) -> Self {
        self.verification_source(VerificationKeySource::Pem(pem.into()))
    }

    /// Verify against a published key set. Key-set instances never issue.
    #[must_use]
    pub fn key_set(self, data: impl Into<Vec<u8>>, encoding: KeySetEncoding) -> Self {
        self.verification_source(VerificationKeySource::KeySet {
            data: data.into(),
            encoding,
        })
    }

    fn signing_source(mut self, source: SigningKeySource) -> Self {
        match &self.signing {
            Some(existing) => self.conflicts.push(format!(
                "conflicting signing key sources: {} and {}",
                existing.name(),
                source.name()
            )),
            None => self.signing = Some(source),
        }
        self
    }

    fn verification_source(mut self, source: VerificationKeySource) -> Self {
        match &self.verification {
            Some(existing) => self.conflicts.push(format!(
                "conflicting verification key sources: {} and {}",
                existing.name(),
                source.name()
            )),
            None => self.verification = Some(source),
        }
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a role has more than one source, if no source is
    /// configured, or if a key set is combined with a signing key.
    pub fn build(self) -> Result<KeyConfig, TokenError> {
        if let Some(conflict) = self.conflicts.into_iter().next() {
            return Err(TokenError::config(conflict));
        }

        let verification = match (&self.signing, self.verification) {
            (None, None) => return Err(TokenError::config("no key source configured")),
            (Some(_), Some(VerificationKeySource::KeySet { .. })) => {
                return Err(TokenError::config(
                    "a key set is for verification-only instances and cannot be combined with a signing key",
                ))
            }
            (Some(_), None) => VerificationKeySource::DerivedFromSigning,
            (_, Some(source)) => source,
        };

        Ok(KeyConfig {
            signing: self.signing,
            verification,
        })
    }
}

/// Verification material of a loaded instance.
#[derive(Debug, Clone)]
pub enum VerificationKeys {
    /// A single known public key
    Public(PublicKey),
    /// A published key set
    KeySet(KeySet),
}

/// Result of running the loader.
#[derive(Debug)]
pub struct LoadedKeys {
    /// Private key, present on issuing instances
    pub signing: Option<SigningKey>,
    /// Verification material, always present
    pub verification: VerificationKeys,
}

impl KeyConfig {
    /// Runs the loader: generates or decodes every configured key.
    ///
    /// # Errors
    ///
    /// Returns `KeyGeneration` or `KeyDecode` for unusable key material, and
    /// `KeyDecode` if an explicit public key does not belong to the signing key.
    pub fn load(self) -> Result<LoadedKeys, TokenError> {
        let signing = self.signing.map(load_signing).transpose()?;

        let verification = match self.verification {
            VerificationKeySource::DerivedFromSigning => {
                let key = signing
                    .as_ref()
                    .ok_or_else(|| TokenError::config("no signing key to derive from"))?;
                VerificationKeys::Public(key.public_key().clone())
            }
            VerificationKeySource::Key(key) => VerificationKeys::Public(PublicKey::from_rsa(key)?),
            VerificationKeySource::Pem(data) => {
                VerificationKeys::Public(PublicKey::from_rsa(pem::decode_public_key(&data)?)?)
            }
            VerificationKeySource::KeySet { data, encoding } => {
                VerificationKeys::KeySet(KeySet::parse(&data, encoding)?)
            }
        };

        if let (Some(signing), VerificationKeys::Public(public)) = (&signing, &verification) {
            if signing.public_key() != public {
                return Err(TokenError::key_decode(
                    "public key does not belong to the signing key",
                ));
            }
        }

        match &verification {
            VerificationKeys::Public(key) => {
                debug!(kid = %key.kid(), bits = key.bits(), "Verification key loaded");
            }
            VerificationKeys::KeySet(set) => {
                debug!(keys = set.len(), "Verification key set loaded");
            }
        }

        Ok(LoadedKeys {
            signing,
            verification,
        })
    }
}

fn load_signing(source: SigningKeySource) -> Result<SigningKey, TokenError> {
    let source_name = source.name();
    let key = match source {
        SigningKeySource::Generate { bits } => SigningKey::generate(bits)?,
        SigningKeySource::Key(key) => SigningKey::from_rsa(key)?,
        SigningKeySource::Pem(data) => SigningKey::from_rsa(pem::decode_private_key(&data)?)?,
    };

    debug!(
        source = source_name,
        kid = %key.kid(),
        bits = key.public_key().bits(),
        "Signing key loaded"
    );
    Ok(key)
}
