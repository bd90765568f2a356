//! ACME protocol primitives: directory cache, JWK/JWS, and nonce pool.
pub mod directory;
pub mod jwk;
pub mod jws;
pub mod nonce;

pub use directory::{Directory, DirectoryManager, DirectoryMeta};
pub use jwk::Jwk;
pub use jws::JwsSigner;
pub use nonce::NonceManager;
