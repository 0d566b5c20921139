//! Type-state decoded token.
//!
//! `DecodedToken<Verified>` can only be produced by signature verification;
//! `DecodedToken<Unverified>` comes from decoding without any signature
//! check. Both expose the same read accessors, so the type is the only
//! record of whether the content can be trusted.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use jsonwebtoken::Header;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::jwt::claims::{Audience, Claims};

mod private {
    pub trait Sealed {}
}

/// Marker trait for token trust states.
pub trait TokenState: private::Sealed {
    /// Human-readable state name for debugging
    fn state_name() -> &'static str;
}

/// Decoded without signature validation.
#[derive(Debug)]
pub struct Unverified;
impl private::Sealed for Unverified {}
impl TokenState for Unverified {
    fn state_name() -> &'static str {
        "Unverified"
    }
}

/// Signature validated against a trusted key.
#[derive(Debug)]
pub struct Verified;
impl private::Sealed for Verified {}
impl TokenState for Verified {
    fn state_name() -> &'static str {
        "Verified"
    }
}

/// Result of trusted verification.
pub type VerifiedToken = DecodedToken<Verified>;
/// Result of unchecked decoding. Never feed this into authorization.
pub type UnverifiedToken = DecodedToken<Unverified>;

/// Decoded token header and claims.
#[derive(Debug)]
pub struct DecodedToken<State: TokenState> {
    header: Header,
    claims: Claims,
    _state: PhantomData<State>,
}

impl<S: TokenState> Clone for DecodedToken<S> {
    fn clone(&self) -> Self {
        Self {
            header: self.header.clone(),
            claims: self.claims.clone(),
            _state: PhantomData,
        }
    }
}

impl DecodedToken<Unverified> {
    pub(crate) fn unverified(header: Header, claims: Claims) -> Self {
        Self {
            header,
            claims,
            _state: PhantomData,
        }
    }
}

impl DecodedToken<Verified> {
    pub(crate) fn verified(header: Header, claims: Claims) -> Self {
        Self {
            header,
            claims,
            _state: PhantomData,
        }
    }
}

impl<S: TokenState> DecodedToken<S> {
    /// Subject (`sub`); empty if the token carries none.
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    /// Issuer (`iss`); empty if the token carries none.
    pub fn issuer(&self) -> &str {
        &self.claims.iss
    }

    /// Application-defined claims, registered names excluded.
    pub fn claims(&self) -> &Map<String, Value> {
        self.claims.private_claims()
    }

    /// Single private claim.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.custom.get(name)
    }

    /// Audience (`aud`).
    pub fn audience(&self) -> Option<&Audience> {
        self.claims.aud.as_ref()
    }

    /// Token ID (`jti`).
    pub fn jwt_id(&self) -> Option<&str> {
        self.claims.jti.as_deref()
    }

    /// `iat` as an instant.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.claims.iat.and_then(|t| DateTime::from_timestamp(t, 0))
    }

    /// `exp` as an instant.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.exp.and_then(|t| DateTime::from_timestamp(t, 0))
    }

    /// `nbf` as an instant.
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.claims.nbf.and_then(|t| DateTime::from_timestamp(t, 0))
    }

    /// Key ID declared by the header.
    pub fn kid(&self) -> Option<&str> {
        self.header.kid.as_deref()
    }

    /// Decoded header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Full claim set including registered claims.
    pub fn raw_claims(&self) -> &Claims {
        &self.claims
    }

    /// Consume the token, keeping the claim set.
    pub fn into_claims(self) -> Claims {
        self.claims
    }

    /// `Verified` or `Unverified`.
    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }

    /// Whether the signature was checked.
    pub fn is_verified(&self) -> bool {
        S::state_name() == Verified::state_name()
    }
}

impl<S: TokenState> Serialize for DecodedToken<S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut state = serializer.serialize_struct("DecodedToken", 6)?;
        state.serialize_field("subject", self.subject())?;
        state.serialize_field("iss", self.issuer())?;
        state.serialize_field("iat", &self.claims.iat)?;
        state.serialize_field("exp", &self.claims.exp)?;
        state.serialize_field("claims", self.claims())?;
        state.serialize_field("verified", &self.is_verified())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::Algorithm;
    use serde_json::json;

    fn claims() -> Claims {
        let mut claims = Claims::new("issuer".to_string(), "uid".to_string(), 1_700_000_000)
            .with_expiration(1_700_003_600);
        claims
            .apply(json!({"scopes": ["user"]}).as_object().unwrap())
            .unwrap();
        claims
    }

    #[test]
    fn test_accessors() {
        let token = DecodedToken::verified(Header::new(Algorithm::RS256), claims());

        assert_eq!(token.subject(), "uid");
        assert_eq!(token.issuer(), "issuer");
        assert_eq!(token.claim("scopes"), Some(&json!(["user"])));
        assert_eq!(token.issued_at().unwrap().timestamp(), 1_700_000_000);
        assert_eq!(token.expires_at().unwrap().timestamp(), 1_700_003_600);
        assert!(token.not_before().is_none());
        assert!(token.is_verified());
    }

    #[test]
    fn test_unverified_state() {
        let token = DecodedToken::unverified(Header::new(Algorithm::RS256), claims());
        assert_eq!(token.state_name(), "Unverified");
        assert!(!token.is_verified());
    }

    #[test]
    fn test_serialized_view() {
        let token = DecodedToken::verified(Header::new(Algorithm::RS256), claims());
        let value = serde_json::to_value(&token).unwrap();

        assert_eq!(
            value,
            json!({
                "subject": "uid",
                "iss": "issuer",
                "iat": 1_700_000_000,
                "exp": 1_700_003_600,
                "claims": {"scopes": ["user"]},
                "verified": true
            })
        );
    }
}
