//! Account key pair management: generation, PKCS#8 import, and signing.
//!
//! ECDSA (P-256, P-384) key generation and signing go through `ring`.
//! `ring` implements neither the P-521 curve nor RSA key *generation*;
//! both limits are documented on the relevant match arms below rather
//! than papered over.

use crate::error::{AcmeError, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED_SIGNING, EcdsaKeyPair,
    EcdsaSigningAlgorithm, KeyPair as RingKeyPairTrait, RSA_PKCS1_SHA256, RsaKeyPair,
};

/// Supported account key algorithms (spec §6 "JWS algorithms").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
    Rsa,
}

impl KeyType {
    /// JWA `alg` value this key type signs with.
    pub fn jwa_algorithm(&self) -> &'static str {
        match self {
            KeyType::EcdsaP256 => "ES256",
            KeyType::EcdsaP384 => "ES384",
            KeyType::EcdsaP521 => "ES512",
            KeyType::Rsa => "RS256",
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.jwa_algorithm())
    }
}

/// Public key parameters in JWK form, algorithm-specific.
#[derive(Debug, Clone)]
pub enum JwkParams {
    Ec {
        crv: &'static str,
        x: String,
        y: String,
    },
    Rsa {
        n: String,
        e: String,
    },
}

enum Inner {
    Ecdsa { key_type: KeyType, pair: EcdsaKeyPair },
    Rsa(RsaKeyPair),
}

/// An account key pair bound to one algorithm, capable of producing raw
/// (not ASN.1 DER) JWS signatures and exporting its public JWK.
pub struct KeyPair {
    inner: Inner,
}

fn ecdsa_alg(key_type: KeyType) -> Result<&'static EcdsaSigningAlgorithm> {
    match key_type {
        KeyType::EcdsaP256 => Ok(&ECDSA_P256_SHA256_FIXED_SIGNING),
        KeyType::EcdsaP384 => Ok(&ECDSA_P384_SHA384_FIXED_SIGNING),
        KeyType::EcdsaP521 => Err(AcmeError::crypto(
            "ECDSA P-521 (ES512) is not supported: the ring backend has no P-521 implementation",
        )),
        KeyType::Rsa => unreachable!("RSA keys never take the ECDSA path"),
    }
}

impl KeyPair {
    /// Generate a fresh key pair. Only ECDSA P-256/P-384 generation is
    /// supported; RSA keys must be supplied via [`KeyPair::from_pkcs8`]
    /// since `ring` does not implement RSA key generation.
    pub fn generate(key_type: KeyType) -> Result<Self> {
        if key_type == KeyType::Rsa {
            return Err(AcmeError::crypto(
                "RSA key generation is not supported by this backend; supply an externally generated PKCS#8 key via KeyPair::from_pkcs8",
            ));
        }
        let alg = ecdsa_alg(key_type)?;
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(alg, &rng)
            .map_err(|e| AcmeError::crypto(format!("key generation failed: {e}")))?;
        let pair = EcdsaKeyPair::from_pkcs8(alg, pkcs8.as_ref(), &rng)
            .map_err(|e| AcmeError::crypto(format!("key generation failed: {e}")))?;
        Ok(Self {
            inner: Inner::Ecdsa { key_type, pair },
        })
    }

    /// Load a key pair from a PKCS#8 DER document. `key_type` selects
    /// which algorithm family to parse the document as.
    pub fn from_pkcs8(key_type: KeyType, pkcs8_der: &[u8]) -> Result<Self> {
        match key_type {
            KeyType::Rsa => {
                let pair = RsaKeyPair::from_pkcs8(pkcs8_der)
                    .map_err(|e| AcmeError::crypto(format!("invalid RSA PKCS#8 key: {e}")))?;
                Ok(Self {
                    inner: Inner::Rsa(pair),
                })
            }
            _ => {
                let alg = ecdsa_alg(key_type)?;
                let rng = SystemRandom::new();
                let pair = EcdsaKeyPair::from_pkcs8(alg, pkcs8_der, &rng)
                    .map_err(|e| AcmeError::crypto(format!("invalid ECDSA PKCS#8 key: {e}")))?;
                Ok(Self {
                    inner: Inner::Ecdsa { key_type, pair },
                })
            }
        }
    }

    pub fn key_type(&self) -> KeyType {
        match &self.inner {
            Inner::Ecdsa { key_type, .. } => *key_type,
            Inner::Rsa(_) => KeyType::Rsa,
        }
    }

    pub fn algorithm(&self) -> &'static str {
        self.key_type().jwa_algorithm()
    }

    /// Sign `data`, returning a raw signature (fixed-length `r||s` for EC,
    /// PKCS#1v1.5 for RSA) suitable for direct base64url encoding into a
    /// JWS — never ASN.1 DER.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let rng = SystemRandom::new();
        match &self.inner {
            Inner::Ecdsa { pair, .. } => pair
                .sign(&rng, data)
                .map(|sig| sig.as_ref().to_vec())
                .map_err(|e| AcmeError::crypto(format!("signing failed: {e:?}"))),
            Inner::Rsa(pair) => {
                let mut sig = vec![0u8; pair.public().modulus_len()];
                pair.sign(&RSA_PKCS1_SHA256, &rng, data, &mut sig)
                    .map_err(|e| AcmeError::crypto(format!("signing failed: {e:?}")))?;
                Ok(sig)
            }
        }
    }

    /// Public JWK parameters, per RFC 7518 §6.
    pub fn public_jwk_params(&self) -> Result<JwkParams> {
        match &self.inner {
            Inner::Ecdsa { key_type, pair } => {
                let public = pair.public_key().as_ref();
                // Uncompressed SEC1 point: 0x04 || X || Y, coordinates
                // sized to the curve's field width.
                let coord_len = (public.len() - 1) / 2;
                let (x, y) = public[1..].split_at(coord_len);
                Ok(JwkParams::Ec {
                    crv: match key_type {
                        KeyType::EcdsaP256 => "P-256",
                        KeyType::EcdsaP384 => "P-384",
                        KeyType::EcdsaP521 => "P-521",
                        KeyType::Rsa => unreachable!(),
                    },
                    x: URL_SAFE_NO_PAD.encode(x),
                    y: URL_SAFE_NO_PAD.encode(y),
                })
            }
            Inner::Rsa(pair) => {
                let (n, e) = parse_rsa_public_key_der(pair.public().as_ref())?;
                Ok(JwkParams::Rsa {
                    n: URL_SAFE_NO_PAD.encode(n),
                    e: URL_SAFE_NO_PAD.encode(e),
                })
            }
        }
    }
}

/// Extracts `(modulus, exponent)` from a PKCS#1 `RSAPublicKey` DER blob:
/// `SEQUENCE { modulus INTEGER, publicExponent INTEGER }`. Leading
/// sign-padding zero bytes are stripped, matching JWK's `n`/`e` convention.
fn parse_rsa_public_key_der(der: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let bad = || AcmeError::crypto("malformed RSA public key DER");
    let mut pos = 0usize;
    if der.first().copied() != Some(0x30) {
        return Err(bad());
    }
    pos += 1;
    let (_, mut pos) = read_der_len(der, pos).ok_or_else(bad)?;
    let modulus = read_der_integer(der, &mut pos).ok_or_else(bad)?;
    let exponent = read_der_integer(der, &mut pos).ok_or_else(bad)?;
    Ok((modulus, exponent))
}

fn read_der_len(der: &[u8], mut pos: usize) -> Option<(usize, usize)> {
    let first = *der.get(pos)?;
    pos += 1;
    if first & 0x80 == 0 {
        Some((first as usize, pos))
    } else {
        let n_bytes = (first & 0x7f) as usize;
        let mut len = 0usize;
        for _ in 0..n_bytes {
            len = (len << 8) | (*der.get(pos)? as usize);
            pos += 1;
        }
        Some((len, pos))
    }
}

fn read_der_integer(der: &[u8], pos: &mut usize) -> Option<Vec<u8>> {
    if *der.get(*pos)? != 0x02 {
        return None;
    }
    *pos += 1;
    let (len, next) = read_der_len(der, *pos)?;
    *pos = next;
    let bytes = der.get(*pos..*pos + len)?;
    *pos += len;
    // Strip a single leading 0x00 sign-padding byte, if present.
    let trimmed = if bytes.len() > 1 && bytes[0] == 0 {
        &bytes[1..]
    } else {
        bytes
    };
    Some(trimmed.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_p256_and_sign_is_raw_fixed_length() {
        let key = KeyPair::generate(KeyType::EcdsaP256).expect("generate");
        assert_eq!(key.algorithm(), "ES256");
        let sig = key.sign(b"hello").expect("sign");
        // P-256 fixed-length signature is exactly 64 bytes (32+32), never ASN.1 DER.
        assert_eq!(sig.len(), 64);
    }

    #[test]
    fn generate_p384_produces_p384_jwk() {
        let key = KeyPair::generate(KeyType::EcdsaP384).expect("generate");
        match key.public_jwk_params().expect("jwk") {
            JwkParams::Ec { crv, .. } => assert_eq!(crv, "P-384"),
            _ => panic!("expected EC params"),
        }
    }

    #[test]
    fn p521_generation_is_explicitly_unsupported() {
        let result = KeyPair::generate(KeyType::EcdsaP521);
        assert!(result.is_err());
    }

    #[test]
    fn rsa_generation_is_explicitly_unsupported() {
        let result = KeyPair::generate(KeyType::Rsa);
        assert!(result.is_err());
    }
}
