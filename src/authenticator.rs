//! Single entry point offering both capabilities.
//!
//! An [`Authenticator`] wraps a [`TokenIssuer`] when a signing key is loaded
//! and always wraps a [`TokenVerifier`]. Least-privilege deployments can use
//! the two capabilities directly instead.

use crate::error::TokenError;
use crate::issuer::{IssuedToken, TokenIssuer};
use crate::jwks::{publish, Jwks};
use crate::jwt::{TokenRequest, UnverifiedToken, VerifiedToken};
use crate::keys::{pem, KeyConfig, PublicKey, VerificationKeys};
use crate::verifier::{TokenVerifier, VerifyOptions};
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// Issuing and verification engine, immutable after construction.
#[derive(Debug, Clone)]
pub struct Authenticator {
    issuer: Option<TokenIssuer>,
    verifier: TokenVerifier,
}

impl Authenticator {
    /// Start building an authenticator.
    #[must_use]
    pub fn builder() -> AuthenticatorBuilder {
        AuthenticatorBuilder::default()
    }

    /// Loads every configured key and assembles the capabilities it allows.
    ///
    /// # Errors
    ///
    /// Returns the loader's `KeyGeneration`, `KeyDecode` or `Config` errors.
    pub fn from_config(config: KeyConfig) -> Result<Self, TokenError> {
        Self::builder().key_config(config).build()
    }

    /// Issuing capability, if a signing key is loaded.
    #[must_use]
    pub fn issuer(&self) -> Option<&TokenIssuer> {
        self.issuer.as_ref()
    }

    /// Verification capability.
    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Whether this instance can issue tokens.
    #[must_use]
    pub fn can_issue(&self) -> bool {
        self.issuer.is_some()
    }

    /// Issues an access/refresh token pair.
    ///
    /// # Errors
    ///
    /// Returns `Signing` on a verification-only instance, or any error of
    /// [`TokenIssuer::issue`].
    pub fn issue(&self, request: &TokenRequest) -> Result<IssuedToken, TokenError> {
        self.issuer
            .as_ref()
            .ok_or_else(|| TokenError::signing("no signing key loaded"))?
            .issue(request)
    }

    /// See [`TokenVerifier::verify`].
    ///
    /// # Errors
    ///
    /// See [`TokenVerifier::verify`].
    pub fn verify(&self, token: impl AsRef<[u8]>) -> Result<VerifiedToken, TokenError> {
        self.verifier.verify(token)
    }

    /// See [`TokenVerifier::verify_with`].
    ///
    /// # Errors
    ///
    /// See [`TokenVerifier::verify`].
    pub fn verify_with(
        &self,
        token: impl AsRef<[u8]>,
        options: &VerifyOptions,
    ) -> Result<VerifiedToken, TokenError> {
        self.verifier.verify_with(token, options)
    }

    /// Decodes a token WITHOUT checking its signature or expiration.
    ///
    /// Never base an authorization decision on the result.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` if the token cannot be decoded.
    pub fn inspect_unverified(&self, token: impl AsRef<[u8]>) -> Result<UnverifiedToken, TokenError> {
        self.verifier.inspect_unverified(token)
    }

    /// Single-entry key set describing the loaded public key.
    ///
    /// # Errors
    ///
    /// Returns `KeyExport` in key-set mode, where no single public key is loaded.
    pub fn jwks(&self) -> Result<Jwks, TokenError> {
        let key = self.public_key()?;
        Ok(publish(key, self.verifier.algorithm()))
    }

    /// Serialized key set for independent verifiers.
    ///
    /// # Errors
    ///
    /// Returns `KeyExport` if no single public key is loaded or the document
    /// cannot be serialized.
    pub fn publish_key_set(&self) -> Result<Vec<u8>, TokenError> {
        self.jwks()?.to_json()
    }

    /// PEM export of the private key.
    ///
    /// # Errors
    ///
    /// Returns `KeyExport` on a verification-only instance.
    pub fn private_key_pem(&self) -> Result<Zeroizing<Vec<u8>>, TokenError> {
        let issuer = self
            .issuer
            .as_ref()
            .ok_or_else(|| TokenError::key_export("no private key loaded"))?;
        pem::encode_private_key(issuer.signing_key().rsa())
    }

    /// PEM export of the public key.
    ///
    /// # Errors
    ///
    /// Returns `KeyExport` in key-set mode.
    pub fn public_key_pem(&self) -> Result<Vec<u8>, TokenError> {
        pem::encode_public_key(self.public_key()?.rsa())
    }

    fn public_key(&self) -> Result<&PublicKey, TokenError> {
        self.verifier
            .public_key()
            .ok_or_else(|| TokenError::key_export("no public key loaded"))
    }
}

/// Builder for [`Authenticator`].
#[derive(Debug, Default)]
pub struct AuthenticatorBuilder {
    key_config: Option<KeyConfig>,
    verify_options: VerifyOptions,
}

impl AuthenticatorBuilder {
    /// Key sources to load.
    #[must_use]
    pub fn key_config(mut self, config: KeyConfig) -> Self {
        self.key_config = Some(config);
        self
    }

    /// Default verification policy.
    #[must_use]
    pub fn verify_options(mut self, options: VerifyOptions) -> Self {
        self.verify_options = options;
        self
    }

    /// Load keys and assemble the authenticator.
    ///
    /// # Errors
    ///
    /// Returns `Config` if no key configuration was given, otherwise the
    /// loader's errors.
    pub fn build(self) -> Result<Authenticator, TokenError> {
        let config = self
            .key_config
            .ok_or_else(|| TokenError::config("no key configuration given"))?;
        let loaded = config.load()?;

        let issuer = loaded.signing.map(|key| TokenIssuer::new(Arc::new(key)));
        let verifier = TokenVerifier::from_keys(loaded.verification)
            .with_options(self.verify_options);

        let mode = match verifier.keys() {
            VerificationKeys::Public(_) => "public-key",
            VerificationKeys::KeySet(_) => "key-set",
        };
        debug!(
            can_issue = issuer.is_some(),
            verification = mode,
            validate_exp = self.verify_options.validate_exp,
            "Authenticator ready"
        );

        Ok(Authenticator { issuer, verifier })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwks::KeySetEncoding;
    use chrono::Duration;
    use serde_json::json;

    const PRIVATE_A: &[u8] = include_bytes!("../tests/fixtures/rsa_a.pem");
    const PUBLIC_A: &[u8] = include_bytes!("../tests/fixtures/rsa_a.pub.pem");

    fn full() -> Authenticator {
        Authenticator::from_config(KeyConfig::builder().private_key_pem(PRIVATE_A).build().unwrap())
            .unwrap()
    }

    fn request() -> TokenRequest {
        TokenRequest::builder("example.org")
            .subject("uid")
            .validity(Duration::hours(1))
            .claim("scopes", json!(["user", "admin"]))
            .build()
    }

    #[test]
    fn test_issue_and_verify() {
        let auth = full();
        assert!(auth.can_issue());

        let token = auth.issue(&request()).unwrap();
        let verified = auth.verify(&token.access_token).unwrap();
        assert_eq!(verified.subject(), "uid");
        assert_eq!(verified.claims()["scopes"], json!(["user", "admin"]));

        let refresh = auth.verify(&token.refresh_token).unwrap();
        assert_eq!(refresh.subject(), "uid");
    }

    #[test]
    fn test_verify_only_instance_cannot_issue() {
        let auth = Authenticator::from_config(
            KeyConfig::builder().public_key_pem(PUBLIC_A).build().unwrap(),
        )
        .unwrap();

        assert!(!auth.can_issue());
        assert!(matches!(auth.issue(&request()), Err(TokenError::Signing(_))));
        assert!(matches!(auth.private_key_pem(), Err(TokenError::KeyExport(_))));

        let token = full().issue(&request()).unwrap();
        assert!(auth.verify(&token.access_token).is_ok());
    }

    #[test]
    fn test_key_set_instance() {
        let published = full().publish_key_set().unwrap();
        let auth = Authenticator::from_config(
            KeyConfig::builder()
                .key_set(published, KeySetEncoding::Json)
                .build()
                .unwrap(),
        )
        .unwrap();

        let token = full().issue(&request()).unwrap();
        assert!(auth.verify(&token.access_token).is_ok());
        assert!(matches!(auth.publish_key_set(), Err(TokenError::KeyExport(_))));
        assert!(matches!(auth.public_key_pem(), Err(TokenError::KeyExport(_))));
    }

    #[test]
    fn test_published_key_set_shape() {
        let value: serde_json::Value =
            serde_json::from_slice(&full().publish_key_set().unwrap()).unwrap();
        let keys = value["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0]["kty"], "RSA");
        assert_eq!(keys[0]["alg"], "RS256");
        assert!(keys[0]["n"].is_string());
        assert!(keys[0]["e"].is_string());
    }

    #[test]
    fn test_export_reimport() {
        let auth = full();
        let private = auth.private_key_pem().unwrap();
        let public = auth.public_key_pem().unwrap();

        let restored = Authenticator::from_config(
            KeyConfig::builder()
                .private_key_pem(private.to_vec())
                .public_key_pem(public)
                .build()
                .unwrap(),
        )
        .unwrap();

        let token = restored.issue(&request()).unwrap();
        assert!(auth.verify(&token.access_token).is_ok());
    }

    #[test]
    fn test_builder_options() {
        let auth = Authenticator::builder()
            .key_config(KeyConfig::builder().private_key_pem(PRIVATE_A).build().unwrap())
            .verify_options(VerifyOptions::allow_expired())
            .build()
            .unwrap();

        let expired = TokenRequest::new("uid", "example.org", Duration::minutes(-5));
        let token = auth.issue(&expired).unwrap();
        assert!(auth.verify(&token.access_token).is_ok());
        assert!(matches!(
            auth.verify_with(&token.access_token, &VerifyOptions::default()),
            Err(TokenError::TokenExpired { .. })
        ));
    }

    #[test]
    fn test_builder_requires_keys() {
        assert!(matches!(
            Authenticator::builder().build(),
            Err(TokenError::Config(_))
        ));
    }

    #[test]
    fn test_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Authenticator>();

        let auth = Arc::new(full());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let auth = Arc::clone(&auth);
                std::thread::spawn(move || {
                    let subject = format!("user-{i}");
                    let token = auth
                        .issue(&TokenRequest::new(subject.clone(), "example.org", Duration::hours(1)))
                        .unwrap();
                    auth.verify(&token.access_token).unwrap().subject() == subject
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
