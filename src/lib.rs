//! Token Auth - RS256 access/refresh token issuance and verification.
//!
//! This crate issues signed access/refresh token pairs for a subject, verifies
//! them against a public key or a published key set, and publishes the public
//! key as a JWK Set for independent verifiers.
//!
//! Issuing and verifying are separate capabilities: a [`TokenIssuer`] holds
//! the private key, a [`TokenVerifier`] holds only public material, and an
//! [`Authenticator`] offers whichever the loaded [`KeyConfig`] allows.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authenticator;
pub mod config;
pub mod error;
pub mod issuer;
pub mod jwks;
pub mod jwt;
pub mod keys;
pub mod tracing_config;
pub mod verifier;

pub use authenticator::{Authenticator, AuthenticatorBuilder};
pub use config::Config;
pub use error::TokenError;
pub use issuer::{IssuedToken, TokenIssuer, REFRESH_EXTENSION_HOURS};
pub use jwks::{Jwk, Jwks, KeySet, KeySetEncoding};
pub use jwt::{TokenRequest, UnverifiedToken, VerifiedToken};
pub use keys::{KeyConfig, KeyConfigBuilder, PublicKey, SigningKey};
pub use tracing_config::{init_tracing, LogFormat, TracingConfig};
pub use verifier::{inspect_unverified, TokenVerifier, VerifyOptions};
