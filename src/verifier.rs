//! Token verification.
//!
//! [`TokenVerifier::verify`] checks the RS256 signature against a known
//! public key or a key set and enforces expiration unless disabled.
//! [`TokenVerifier::inspect_unverified`] only decodes.

use crate::error::TokenError;
use crate::jwt::{DecodedToken, JwtSerializer, UnverifiedToken, VerifiedToken};
use crate::keys::{PublicKey, VerificationKeys};
use crate::jwks::KeySet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::Header;
use tracing::{debug, instrument};

/// Verification policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Reject tokens whose `exp` lies in the past
    pub validate_exp: bool,
    /// Clock skew tolerated when checking `exp`
    pub leeway: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            validate_exp: true,
            leeway: Duration::zero(),
        }
    }
}

impl VerifyOptions {
    /// Options that accept expired tokens.
    #[must_use]
    pub fn allow_expired() -> Self {
        Self {
            validate_exp: false,
            ..Self::default()
        }
    }

    /// Set the clock leeway.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }
}

/// Verification capability: holds only public key material.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    keys: VerificationKeys,
    serializer: JwtSerializer,
    options: VerifyOptions,
}

impl TokenVerifier {
    /// Verifier for tokens signed by the private half of `key`.
    #[must_use]
    pub fn new(key: PublicKey) -> Self {
        Self::from_keys(VerificationKeys::Public(key))
    }

    /// Verifier selecting keys from a published key set.
    #[must_use]
    pub fn with_key_set(set: KeySet) -> Self {
        Self::from_keys(VerificationKeys::KeySet(set))
    }

    /// Verifier over loaded verification material.
    #[must_use]
    pub fn from_keys(keys: VerificationKeys) -> Self {
        Self {
            keys,
            serializer: JwtSerializer::default(),
            options: VerifyOptions::default(),
        }
    }

    /// Replace the default verification policy.
    #[must_use]
    pub fn with_options(mut self, options: VerifyOptions) -> Self {
        self.options = options;
        self
    }

    /// Default verification policy of this verifier.
    #[must_use]
    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Algorithm name accepted by this verifier.
    #[must_use]
    pub fn algorithm(&self) -> &'static str {
        self.serializer.algorithm_name()
    }

    /// Verification material.
    #[must_use]
    pub fn keys(&self) -> &VerificationKeys {
        &self.keys
    }

    /// The single public key, `None` in key-set mode.
    #[must_use]
    pub fn public_key(&self) -> Option<&PublicKey> {
        match &self.keys {
            VerificationKeys::Public(key) => Some(key),
            VerificationKeys::KeySet(_) => None,
        }
    }

    /// Verifies a token with this verifier's default policy.
    ///
    /// # Errors
    ///
    /// `MalformedToken`, `SignatureInvalid`, `KeyNotFound` (key-set mode) or
    /// `TokenExpired` (when expiration checking is enabled).
    pub fn verify(&self, token: impl AsRef<[u8]>) -> Result<VerifiedToken, TokenError> {
        self.verify_with(token, &self.options)
    }

    /// Verifies a token with an explicit policy.
    ///
    /// # Errors
    ///
    /// See [`TokenVerifier::verify`].
    pub fn verify_with(
        &self,
        token: impl AsRef<[u8]>,
        options: &VerifyOptions,
    ) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token.as_ref(), options, Utc::now())
    }

    #[instrument(skip_all, fields(kid))]
    fn verify_at(
        &self,
        token: &[u8],
        options: &VerifyOptions,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, TokenError> {
        let token = as_text(token)?;
        let header = self.serializer.decode_header(token)?;
        tracing::Span::current().record("kid", header.kid.as_deref().unwrap_or("-"));

        if header.alg != self.serializer.algorithm() {
            return Err(TokenError::SignatureInvalid);
        }

        let key = self.select_key(&header)?;
        check_signature_shape(token, key)?;
        let claims = self.serializer.deserialize(token, key.decoding_key())?;

        if options.validate_exp
            && claims.is_expired_at(now.timestamp(), options.leeway.num_seconds())
        {
            let expired_at = claims
                .exp
                .and_then(|exp| DateTime::from_timestamp(exp, 0))
                .unwrap_or(now);
            return Err(TokenError::TokenExpired { expired_at });
        }

        debug!(sub = %claims.sub, "Token verified");
        Ok(DecodedToken::verified(header, claims))
    }

    /// Decodes a token WITHOUT checking its signature or expiration.
    ///
    /// The result is attacker-controlled unless the channel that delivered
    /// the token is already authenticated. Do not base authorization
    /// decisions on it.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` if the token cannot be decoded.
    pub fn inspect_unverified(&self, token: impl AsRef<[u8]>) -> Result<UnverifiedToken, TokenError> {
        inspect_unverified(token)
    }

    fn select_key(&self, header: &Header) -> Result<&PublicKey, TokenError> {
        match &self.keys {
            VerificationKeys::Public(key) => Ok(key),
            VerificationKeys::KeySet(set) => {
                set.find(header.kid.as_deref(), self.serializer.algorithm_name())
            }
        }
    }
}

/// Decodes a token WITHOUT checking its signature or expiration.
///
/// Needs no key material. See [`TokenVerifier::inspect_unverified`].
///
/// # Errors
///
/// Returns `MalformedToken` if the token cannot be decoded.
pub fn inspect_unverified(token: impl AsRef<[u8]>) -> Result<UnverifiedToken, TokenError> {
    let token = as_text(token.as_ref())?;
    let (header, claims) = JwtSerializer::default().deserialize_unverified(token)?;
    Ok(DecodedToken::unverified(header, claims))
}

/// RSA signatures are exactly as long as the modulus; anything else is a
/// cut or padded token rather than a wrong signature.
fn check_signature_shape(token: &str, key: &PublicKey) -> Result<(), TokenError> {
    let signature = match token.split('.').collect::<Vec<_>>().as_slice() {
        [_, _, signature] => *signature,
        _ => return Err(TokenError::malformed("invalid token format")),
    };
    if signature.is_empty() {
        return Err(TokenError::malformed("empty signature"));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|e| TokenError::malformed(format!("invalid signature encoding: {e}")))?;
    if bytes.len() != key.bits() / 8 {
        return Err(TokenError::malformed(format!(
            "signature is {} bytes, expected {}",
            bytes.len(),
            key.bits() / 8
        )));
    }
    Ok(())
}

fn as_text(token: &[u8]) -> Result<&str, TokenError> {
    let text = std::str::from_utf8(token)
        .map_err(|_| TokenError::malformed("token is not valid UTF-8"))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(TokenError::malformed("empty token"));
    }
    Ok(text)
}
