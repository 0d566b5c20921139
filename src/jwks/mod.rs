//! JWK Set publication, key-set parsing and key thumbprints.

pub mod key_set;
pub mod publisher;
pub mod thumbprint;

pub use key_set::{KeySet, KeySetEncoding, KeySetEntry};
pub use publisher::{publish, Jwk, Jwks};
pub use thumbprint::JwkThumbprint;
