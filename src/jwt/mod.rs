//! Claims, token requests, compact serialization and decoded tokens.

pub mod builder;
pub mod claims;
pub mod serializer;
pub mod token;

pub use builder::{TokenRequest, TokenRequestBuilder};
pub use claims::{Audience, Claims};
pub use serializer::JwtSerializer;
pub use token::{DecodedToken, TokenState, Unverified, UnverifiedToken, Verified, VerifiedToken};
