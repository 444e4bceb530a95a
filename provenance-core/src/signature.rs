//! ECDSA P-256 signing and verification.
//!
//! Signatures are DER-encoded ECDSA over a SHA-256 digest of the message. Keys
//! are PEM: PKCS#8 for the private key, SubjectPublicKeyInfo for the public key.
//!
//! The private key only ever signs canonical record bytes or a video chain's
//! terminal digest; it is never written to the provenance store.

use std::path::Path;

use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{HasPublic, PKey, PKeyRef, Private, Public};
use openssl::sign::{Signer, Verifier};

use crate::error::{ProvenanceError, Result};

/// Algorithm label carried in verification reports.
pub const SIGNATURE_ALGORITHM: &str = "ECDSA-P256";

const CURVE: Nid = Nid::X9_62_PRIME256V1;

/// Private half of a P-256 key pair.
pub struct SigningKey {
    key: PKey<Private>,
}

impl SigningKey {
    /// Parse a PEM-encoded private key and check it is on P-256.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let key = PKey::private_key_from_pem(pem)?;
        ensure_p256(&key)?;
        Ok(Self { key })
    }

    /// Load a PEM private key from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| ProvenanceError::KeyLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_pem(&pem).map_err(|e| ProvenanceError::KeyLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Sign `message`.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let mut signer = Signer::new(MessageDigest::sha256(), &self.key)?;
        signer.update(message)?;
        Ok(signer.sign_to_vec()?)
    }

    /// Public half of this key.
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        let der = self.key.public_key_to_der()?;
        Ok(VerifyingKey {
            key: PKey::public_key_from_der(&der)?,
        })
    }

    /// PKCS#8 PEM encoding.
    pub fn to_pem(&self) -> Result<Vec<u8>> {
        Ok(self.key.private_key_to_pem_pkcs8()?)
    }
}

/// Public half of a P-256 key pair.
#[derive(Clone)]
pub struct VerifyingKey {
    key: PKey<Public>,
}

impl VerifyingKey {
    /// Parse a PEM-encoded public key and check it is on P-256.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let key = PKey::public_key_from_pem(pem)?;
        ensure_p256(&key)?;
        Ok(Self { key })
    }

    /// Load a PEM public key from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| ProvenanceError::KeyLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_pem(&pem).map_err(|e| ProvenanceError::KeyLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Check `signature` over `message`.
    ///
    /// Any failure (wrong key, altered message, malformed or corrupted
    /// signature) yields `false` with no indication of which check failed.
    /// The comparison itself runs inside OpenSSL's ECDSA verifier.
    pub fn verify(&self, signature: &[u8], message: &[u8]) -> bool {
        let Ok(mut verifier) = Verifier::new(MessageDigest::sha256(), &self.key) else {
            return false;
        };
        if verifier.update(message).is_err() {
            return false;
        }
        verifier.verify(signature).unwrap_or(false)
    }

    /// SubjectPublicKeyInfo PEM encoding.
    pub fn to_pem(&self) -> Result<Vec<u8>> {
        Ok(self.key.public_key_to_pem()?)
    }
}

/// Generate a fresh P-256 key pair.
pub fn generate_keypair() -> Result<(SigningKey, VerifyingKey)> {
    let group = EcGroup::from_curve_name(CURVE)?;
    let ec_key = EcKey::generate(&group)?;
    let signing = SigningKey {
        key: PKey::from_ec_key(ec_key)?,
    };
    let verifying = signing.verifying_key()?;
    Ok((signing, verifying))
}

fn ensure_p256<T: HasPublic>(key: &PKeyRef<T>) -> Result<()> {
    let ec_key = key
        .ec_key()
        .map_err(|_| ProvenanceError::UnsupportedKey("not an elliptic-curve key".into()))?;
    let curve = ec_key.group().curve_name();
    if curve == Some(CURVE) {
        Ok(())
    } else {
        Err(ProvenanceError::UnsupportedKey(format!(
            "expected P-256, found {:?}",
            curve
        )))
    }
}
