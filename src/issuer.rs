//! Access/refresh token issuance.

use crate::error::TokenError;
use crate::jwt::{Claims, JwtSerializer, TokenRequest};
use crate::keys::SigningKey;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// How much longer a refresh token lives than its access token.
pub const REFRESH_EXTENSION_HOURS: i64 = 24;

/// Refresh extension as a duration.
#[must_use]
pub fn refresh_extension() -> Duration {
    Duration::hours(REFRESH_EXTENSION_HOURS)
}

/// Signed token pair returned by [`TokenIssuer::issue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedToken {
    /// Compact signed access token
    pub access_token: String,
    /// Compact signed refresh token
    pub refresh_token: String,
    /// Access token expiration
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
    /// Issued-at instant shared by both tokens
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,
    /// Issuer written into both tokens
    pub iss: String,
    /// Refresh token expiration
    #[serde(with = "chrono::serde::ts_seconds")]
    pub refresh_exp: DateTime<Utc>,
    /// Subject written into both tokens
    pub subject: String,
    /// Private claims written into both tokens
    pub claims: Map<String, Value>,
}

/// Issuing capability: holds the private key.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    serializer: JwtSerializer,
}

impl TokenIssuer {
    /// Create an issuer signing with `key`.
    #[must_use]
    pub fn new(key: Arc<SigningKey>) -> Self {
        Self {
            key,
            serializer: JwtSerializer::default(),
        }
    }

    /// Signing key of this issuer.
    #[must_use]
    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }

    /// Algorithm name written in token headers.
    #[must_use]
    pub fn algorithm(&self) -> &'static str {
        self.serializer.algorithm_name()
    }

    /// Issues an access token and its refresh token.
    ///
    /// # Errors
    ///
    /// Returns `Signing` if the claims cannot be encoded, an expiration is out
    /// of range, or signing fails. No token is returned on failure.
    pub fn issue(&self, request: &TokenRequest) -> Result<IssuedToken, TokenError> {
        self.issue_at(request, Utc::now())
    }

    /// Issues a token pair as of `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::issue`].
    #[instrument(skip(self, request), fields(sub = %request.subject, kid = %self.key.kid()))]
    pub fn issue_at(&self, request: &TokenRequest, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let issued_at = now.timestamp();

        let mut claims = Claims::new(request.issuer.clone(), request.subject.clone(), issued_at);
        claims.apply(&request.claims)?;

        let access_exp = add_seconds(issued_at, request.validity)?;
        let refresh_exp = add_seconds(access_exp, refresh_extension())?;

        let access_claims = claims.with_expiration(access_exp);
        let access_token = self.sign(&access_claims)?;

        let refresh_claims = access_claims.clone().with_expiration(refresh_exp);
        let refresh_token = self.sign(&refresh_claims)?;

        debug!(exp = access_exp, refresh_exp, "Token pair issued");

        Ok(IssuedToken {
            access_token,
            refresh_token,
            exp: timestamp(access_exp)?,
            iat: timestamp(access_claims.iat.unwrap_or(issued_at))?,
            iss: access_claims.iss.clone(),
            refresh_exp: timestamp(refresh_exp)?,
            subject: access_claims.sub.clone(),
            claims: access_claims.custom,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        self.serializer
            .serialize(claims, self.key.encoding_key(), Some(self.key.kid()))
    }
}

fn add_seconds(base: i64, delta: Duration) -> Result<i64, TokenError> {
    base.checked_add(delta.num_seconds())
        .ok_or_else(|| TokenError::signing("token expiration out of range"))
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| TokenError::signing(format!("timestamp {secs} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::pem;
    use serde_json::json;

    const PRIVATE_A: &[u8] = include_bytes!("../tests/fixtures/rsa_a.pem");

    fn issuer() -> TokenIssuer {
        let key = SigningKey::from_rsa(pem::decode_private_key(PRIVATE_A).unwrap()).unwrap();
        TokenIssuer::new(Arc::new(key))
    }

    fn decode_payload(token: &str) -> Value {
        let payload = token.split('.').nth(1).unwrap();
        let bytes = base64::Engine::decode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            payload,
        )
        .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_issue_token_pair() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let request = TokenRequest::builder("example.org")
            .subject("uid")
            .validity(Duration::hours(1))
            .claim("scopes", json!(["user", "admin"]))
            .build();

        let token = issuer().issue_at(&request, now).unwrap();

        assert!(!token.access_token.is_empty());
        assert!(!token.refresh_token.is_empty());
        assert_ne!(token.access_token, token.refresh_token);
        assert_eq!(token.iat, now);
        assert_eq!(token.exp - token.iat, Duration::hours(1));
        assert_eq!(token.refresh_exp - token.iat, Duration::hours(25));
        assert_eq!(token.iss, "example.org");
        assert_eq!(token.subject, "uid");

        let access = decode_payload(&token.access_token);
        let refresh = decode_payload(&token.refresh_token);
        assert_eq!(access["exp"], 1_700_003_600);
        assert_eq!(refresh["exp"], 1_700_090_000);
        assert_eq!(access["scopes"], refresh["scopes"]);
        assert_eq!(access["sub"], refresh["sub"]);
        assert_eq!(access["iat"], refresh["iat"]);
    }

    #[test]
    fn test_header_names_key() {
        let issuer = issuer();
        let token = issuer
            .issue(&TokenRequest::new("uid", "example.org", Duration::minutes(5)))
            .unwrap();

        let header = jsonwebtoken::decode_header(&token.access_token).unwrap();
        assert_eq!(header.alg, jsonwebtoken::Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some(issuer.signing_key().kid()));
    }

    #[test]
    fn test_reserved_exp_claim_fails_without_tokens() {
        let request = TokenRequest::builder("example.org")
            .subject("uid")
            .claim("exp", json!(0))
            .build();
        assert!(matches!(
            issuer().issue(&request),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn test_negative_validity_allowed() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let request = TokenRequest::new("uid", "example.org", Duration::minutes(-1));
        let token = issuer().issue_at(&request, now).unwrap();
        assert!(token.exp < token.iat);
        assert_eq!(token.refresh_exp - token.exp, refresh_extension());
    }

    #[test]
    fn test_issued_token_json_fields() {
        let token = issuer()
            .issue(&TokenRequest::new("uid", "example.org", Duration::hours(1)))
            .unwrap();
        let value = serde_json::to_value(&token).unwrap();

        for field in ["access_token", "refresh_token", "exp", "iat", "iss"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert!(value["exp"].is_i64());
    }
}
