//! Claim set carried by issued tokens.

use crate::error::TokenError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Registered claim names surfaced through typed fields rather than the
/// private claim map.
pub const REGISTERED_CLAIMS: [&str; 7] = ["iss", "sub", "aud", "exp", "nbf", "iat", "jti"];

/// `aud` claim: a single audience or a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Audience {
    /// One audience string
    Single(String),
    /// Audience list
    Many(Vec<String>),
}

/// Registered claims plus application-defined claims, flattened into one
/// JSON object on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Issuer
    #[serde(default)]
    pub iss: String,
    /// Subject
    #[serde(default)]
    pub sub: String,
    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// Expiration, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Not before, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    /// Issued at, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Token ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Private claims
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

impl Claims {
    /// Claim set with `iss`, `sub` and `iat` filled in.
    pub fn new(issuer: String, subject: String, issued_at: i64) -> Self {
        Claims {
            iss: issuer,
            sub: subject,
            aud: None,
            exp: None,
            nbf: None,
            iat: Some(issued_at),
            jti: None,
            custom: Map::new(),
        }
    }

    /// Copies caller claims into the claim set.
    ///
    /// Caller values replace the engine's `iss`, `sub` and `iat` and set any
    /// other registered claim, as long as they have the registered type.
    /// `exp` is always computed by the issuer and cannot be supplied.
    pub fn apply(&mut self, claims: &Map<String, Value>) -> Result<(), TokenError> {
        for (name, value) in claims {
            match name.as_str() {
                "exp" => {
                    return Err(TokenError::signing(
                        "claim `exp` is reserved and derived from the validity duration",
                    ))
                }
                "iss" => self.iss = expect_string(name, value)?,
                "sub" => self.sub = expect_string(name, value)?,
                "jti" => self.jti = Some(expect_string(name, value)?),
                "iat" => self.iat = Some(expect_timestamp(name, value)?),
                "nbf" => self.nbf = Some(expect_timestamp(name, value)?),
                "aud" => {
                    self.aud = Some(serde_json::from_value(value.clone()).map_err(|_| {
                        TokenError::signing("claim `aud` must be a string or an array of strings")
                    })?)
                }
                _ => {
                    self.custom.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    /// Set `exp`.
    #[must_use]
    pub fn with_expiration(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Application-defined claims only.
    pub fn private_claims(&self) -> &Map<String, Value> {
        &self.custom
    }

    /// Whether `now` lies past `exp + leeway`. Claims without `exp` never expire.
    pub fn is_expired_at(&self, now: i64, leeway: i64) -> bool {
        self.exp
            .is_some_and(|exp| now > exp.saturating_add(leeway))
    }
}

fn expect_string(name: &str, value: &Value) -> Result<String, TokenError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| TokenError::signing(format!("claim `{name}` must be a string")))
}

fn expect_timestamp(name: &str, value: &Value) -> Result<i64, TokenError> {
    value
        .as_i64()
        .ok_or_else(|| TokenError::signing(format!("claim `{name}` must be an integer timestamp")))
}
