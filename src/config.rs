//! Environment configuration for the `token-auth` binary and embedders.
//!
//! All values are read from environment variables (with `.env` support) and
//! validated up front. Key files are only read by [`Config::key_config`].

use crate::error::TokenError;
use crate::jwks::KeySetEncoding;
use crate::keys::{KeyConfig, DEFAULT_KEY_BITS};
use crate::tracing_config::{LogFormat, TracingConfig};
use crate::verifier::VerifyOptions;
use chrono::Duration;
use std::env;
use std::path::{Path, PathBuf};

/// Default `iss` written into issued tokens.
pub const DEFAULT_ISSUER: &str = "token-auth";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Issuance
    /// `iss` claim of issued tokens
    pub issuer: String,
    /// Access token validity
    pub access_token_ttl: Duration,

    // Key sources
    /// PEM private key file
    pub signing_key_file: Option<PathBuf>,
    /// Generate a fresh signing key at startup
    pub generate_key: bool,
    /// Modulus size of generated keys
    pub key_bits: usize,
    /// PEM public key file
    pub verification_key_file: Option<PathBuf>,
    /// Key-set file for verification-only instances
    pub jwks_file: Option<PathBuf>,
    /// Encoding of `jwks_file`
    pub jwks_encoding: KeySetEncoding,

    // Verification
    /// Enforce token expiration
    pub validate_exp: bool,
    /// Tolerated clock skew
    pub clock_leeway: Duration,

    // Logging
    /// Log level filter
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TokenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let issuer = lookup("TOKEN_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        let access_token_ttl = seconds("ACCESS_TOKEN_TTL", parse_var(&lookup, "ACCESS_TOKEN_TTL", 3600)?)?;

        let signing_key_file = lookup("TOKEN_SIGNING_KEY_FILE").map(PathBuf::from);
        let generate_key = parse_var(&lookup, "TOKEN_GENERATE_KEY", false)?;
        let key_bits = parse_var(&lookup, "TOKEN_KEY_BITS", DEFAULT_KEY_BITS)?;
        let verification_key_file = lookup("TOKEN_VERIFICATION_KEY_FILE").map(PathBuf::from);
        let jwks_file = lookup("TOKEN_JWKS_FILE").map(PathBuf::from);
        let jwks_encoding = match lookup("TOKEN_JWKS_ENCODING") {
            Some(value) => value.parse()?,
            None => KeySetEncoding::Json,
        };

        let validate_exp = parse_var(&lookup, "TOKEN_VALIDATE_EXP", true)?;
        let leeway: i64 = parse_var(&lookup, "TOKEN_CLOCK_LEEWAY", 0)?;
        if leeway < 0 {
            return Err(TokenError::config("TOKEN_CLOCK_LEEWAY must not be negative"));
        }

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_format = match lookup("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::Json,
        };

        Ok(Self {
            issuer,
            access_token_ttl,
            signing_key_file,
            generate_key,
            key_bits,
            verification_key_file,
            jwks_file,
            jwks_encoding,
            validate_exp,
            clock_leeway: seconds("TOKEN_CLOCK_LEEWAY", leeway)?,
            log_level,
            log_format,
        })
    }

    /// Reads the configured key files and builds the key configuration.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a file cannot be read or the sources conflict.
    pub fn key_config(&self) -> Result<KeyConfig, TokenError> {
        let mut builder = KeyConfig::builder();

        if self.generate_key {
            builder = builder.generate_with_bits(self.key_bits);
        }
        if let Some(path) = &self.signing_key_file {
            builder = builder.private_key_pem(read_file(path)?);
        }
        if let Some(path) = &self.verification_key_file {
            builder = builder.public_key_pem(read_file(path)?);
        }
        if let Some(path) = &self.jwks_file {
            builder = builder.key_set(read_file(path)?, self.jwks_encoding);
        }

        builder.build()
    }

    /// Verification policy.
    #[must_use]
    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            validate_exp: self.validate_exp,
            leeway: self.clock_leeway,
        }
    }

    /// Tracing subscriber settings.
    #[must_use]
    pub fn tracing(&self) -> TracingConfig {
        TracingConfig::default()
            .with_log_level(self.log_level.clone())
            .with_format(self.log_format)
    }
}

/// Parse a variable with default value.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, TokenError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {}: {}", name, e))),
        None => Ok(default),
    }
}

fn seconds(name: &str, value: i64) -> Result<Duration, TokenError> {
    Duration::try_seconds(value)
        .ok_or_else(|| TokenError::config(format!("Invalid {}: {} is out of range", name, value)))
}

fn read_file(path: &Path) -> Result<Vec<u8>, TokenError> {
    std::fs::read(path)
        .map_err(|e| TokenError::config(format!("cannot read {}: {}", path.display(), e)))
}
