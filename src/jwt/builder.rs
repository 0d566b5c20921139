//! Issuance requests.

use crate::error::TokenError;
use chrono::Duration;
use serde::Serialize;
use serde_json::{Map, Value};

/// Default access token validity.
pub const DEFAULT_VALIDITY_SECONDS: i64 = 3600;

/// Inputs of a single issuance: subject, issuer, validity and claims.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRequest {
    /// `sub` of both tokens
    pub subject: String,
    /// `iss` of both tokens
    pub issuer: String,
    /// Access token lifetime
    pub validity: Duration,
    /// Private claims, or overrides of registered ones
    pub claims: Map<String, Value>,
}

impl TokenRequest {
    /// Request without private claims.
    pub fn new(subject: impl Into<String>, issuer: impl Into<String>, validity: Duration) -> Self {
        TokenRequest {
            subject: subject.into(),
            issuer: issuer.into(),
            validity,
            claims: Map::new(),
        }
    }

    /// Start a request for `issuer`.
    pub fn builder(issuer: impl Into<String>) -> TokenRequestBuilder {
        TokenRequestBuilder::new(issuer)
    }
}

/// Builder for [`TokenRequest`].
#[derive(Debug, Clone)]
pub struct TokenRequestBuilder {
    issuer: String,
    subject: String,
    validity: Duration,
    claims: Map<String, Value>,
}

impl TokenRequestBuilder {
    /// Builder with an empty subject and the default validity.
    pub fn new(issuer: impl Into<String>) -> Self {
        TokenRequestBuilder {
            issuer: issuer.into(),
            subject: String::new(),
            validity: Duration::seconds(DEFAULT_VALIDITY_SECONDS),
            claims: Map::new(),
        }
    }

    /// Set the subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Validity of the access token; zero or negative values yield tokens
    /// that are already expired.
    pub fn validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Add one claim.
    pub fn claim(mut self, key: impl Into<String>, value: Value) -> Self {
        self.claims.insert(key.into(), value);
        self
    }

    /// Add claims, replacing ones with the same name.
    pub fn claims(mut self, claims: Map<String, Value>) -> Self {
        self.claims.extend(claims);
        self
    }

    /// Adds a claim from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `Signing` if the value has no JSON representation.
    pub fn try_claim<T: Serialize>(self, key: impl Into<String>, value: &T) -> Result<Self, TokenError> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .map_err(|e| TokenError::signing(format!("claim `{key}` cannot be encoded: {e}")))?;
        Ok(self.claim(key, value))
    }

    /// An empty subject is accepted; it is the caller's responsibility.
    pub fn build(self) -> TokenRequest {
        TokenRequest {
            subject: self.subject,
            issuer: self.issuer,
            validity: self.validity,
            claims: self.claims,
        }
    }
}
