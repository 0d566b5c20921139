//! Error taxonomy for key loading, issuance and verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

/// Errors returned by every fallible operation of this crate.
///
/// The crate has no transient failure modes: nothing here is retryable.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Fresh key pair generation failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// PEM, DER or JWK key material could not be decoded.
    #[error("Key decode error: {0}")]
    KeyDecode(String),

    /// No signing key is loaded or the claim set cannot be encoded.
    #[error("Signing error: {0}")]
    Signing(String),

    /// The compact token could not be decoded.
    #[error("Token malformed: {0}")]
    MalformedToken(String),

    /// The signature does not match the verification key.
    #[error("Token signature invalid")]
    SignatureInvalid,

    /// Key-set lookup found no key for the token.
    #[error("No verification key found for kid {kid:?}")]
    KeyNotFound {
        /// Key ID declared by the token header, if any
        kid: Option<String>,
    },

    /// The token expired and expiration checking is enabled.
    #[error("Token expired at {expired_at}")]
    TokenExpired {
        /// Expiration instant carried by the token
        expired_at: DateTime<Utc>,
    },

    /// Key material cannot be exported.
    #[error("Key export error: {0}")]
    KeyExport(String),

    /// Invalid construction or environment configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TokenError {
    /// Create a key generation error.
    #[must_use]
    pub fn key_generation(msg: impl Into<String>) -> Self {
        TokenError::KeyGeneration(msg.into())
    }

    /// Create a key decode error.
    #[must_use]
    pub fn key_decode(msg: impl Into<String>) -> Self {
        TokenError::KeyDecode(msg.into())
    }

    /// Create a signing error.
    #[must_use]
    pub fn signing(msg: impl Into<String>) -> Self {
        TokenError::Signing(msg.into())
    }

    /// Create a malformed token error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        TokenError::MalformedToken(msg.into())
    }

    /// Create a key export error.
    #[must_use]
    pub fn key_export(msg: impl Into<String>) -> Self {
        TokenError::KeyExport(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        TokenError::Config(msg.into())
    }

    /// Stable code for transport-level mapping.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            TokenError::KeyGeneration(_) => TOKEN_KEY_GENERATION,
            TokenError::KeyDecode(_) => TOKEN_KEY_DECODE,
            TokenError::Signing(_) => TOKEN_SIGNING,
            TokenError::MalformedToken(_) => TOKEN_MALFORMED,
            TokenError::SignatureInvalid => TOKEN_SIGNATURE_INVALID,
            TokenError::KeyNotFound { .. } => TOKEN_KEY_NOT_FOUND,
            TokenError::TokenExpired { .. } => TOKEN_EXPIRED,
            TokenError::KeyExport(_) => TOKEN_KEY_EXPORT,
            TokenError::Config(_) => TOKEN_CONFIG,
        }
    }

    /// Whether the failure was caused by the presented token rather than by
    /// this instance's keys or configuration.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            TokenError::MalformedToken(_)
                | TokenError::SignatureInvalid
                | TokenError::KeyNotFound { .. }
                | TokenError::TokenExpired { .. }
        )
    }

    /// Map a verification failure reported by `jsonwebtoken`.
    pub(crate) fn from_decode(err: &jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::SignatureInvalid
            }
            ErrorKind::ExpiredSignature => TokenError::TokenExpired {
                expired_at: Utc::now(),
            },
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                TokenError::key_decode(err.to_string())
            }
            _ => TokenError::malformed(err.to_string()),
        }
    }
}

// Error codes for transport responses
/// Code of [`TokenError::KeyGeneration`].
pub const TOKEN_KEY_GENERATION: &str = "TOKEN_KEY_GENERATION";
/// Code of [`TokenError::KeyDecode`].
pub const TOKEN_KEY_DECODE: &str = "TOKEN_KEY_DECODE";
/// Code of [`TokenError::Signing`].
pub const TOKEN_SIGNING: &str = "TOKEN_SIGNING";
/// Code of [`TokenError::MalformedToken`].
pub const TOKEN_MALFORMED: &str = "TOKEN_MALFORMED";
/// Code of [`TokenError::SignatureInvalid`].
pub const TOKEN_SIGNATURE_INVALID: &str = "TOKEN_SIGNATURE_INVALID";
/// Code of [`TokenError::KeyNotFound`].
pub const TOKEN_KEY_NOT_FOUND: &str = "TOKEN_KEY_NOT_FOUND";
/// Code of [`TokenError::TokenExpired`].
pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
/// Code of [`TokenError::KeyExport`].
pub const TOKEN_KEY_EXPORT: &str = "TOKEN_KEY_EXPORT";
/// Code of [`TokenError::Config`].
pub const TOKEN_CONFIG: &str = "TOKEN_CONFIG";
