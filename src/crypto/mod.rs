//! Cryptographic primitives: key generation/signing, hashing, encoding.

pub mod encoding;
pub mod hash;
pub mod keypair;

pub use encoding::{Base64Encoding, HexEncoding, PemEncoding};
pub use hash::{HashAlgorithm, Sha256Hash};
pub use keypair::{JwkParams, KeyPair, KeyType};
