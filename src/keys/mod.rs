//! Key material: canonical key handles, PEM codecs and the loader.

pub mod loader;
pub mod material;
pub mod pem;

pub use loader::{
    KeyConfig, KeyConfigBuilder, LoadedKeys, SigningKeySource, VerificationKeySource,
    VerificationKeys,
};
pub use material::{PublicKey, SigningKey, DEFAULT_KEY_BITS, MAX_KEY_BITS, MIN_KEY_BITS};
