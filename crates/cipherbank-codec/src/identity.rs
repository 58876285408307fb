//! P-256 identity keys.
//!
//! An [`Identity`] is a private key owned by this process (the bot, or a
//! user in tests). An [`IdentityKey`] is the public half as published in
//! the key directory.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{CodecError, Result};

/// Private identity key. The scalar is zeroized when dropped.
pub struct Identity {
    secret: SecretKey,
}

impl Identity {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        Self {
            secret: random_secret(),
        }
    }

    /// Import a hex-encoded 32-byte scalar.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| CodecError::InvalidKey(format!("private key is not hex: {e}")))?;
        let secret = SecretKey::from_slice(&bytes)
            .map_err(|_| CodecError::InvalidKey("private key is not a valid P-256 scalar".into()))?;
        Ok(Self { secret })
    }

    /// Export the scalar as hex. Only used by the `keygen` command.
    pub fn to_hex(&self) -> String {
        hex::encode(self.secret.to_bytes())
    }

    pub fn public_key(&self) -> IdentityKey {
        IdentityKey(self.secret.public_key())
    }

    pub fn key_id(&self) -> String {
        self.public_key().key_id()
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("key_id", &self.key_id())
            .finish_non_exhaustive()
    }
}

/// Public identity key, encoded on the wire as base64 compressed SEC1.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityKey(PublicKey);

impl IdentityKey {
    pub fn from_sec1(bytes: &[u8]) -> Result<Self> {
        PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CodecError::InvalidKey("not a SEC1-encoded P-256 point".into()))
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CodecError::InvalidKey(format!("public key is not base64: {e}")))?;
        Self::from_sec1(&bytes)
    }

    /// Compressed SEC1 bytes (33 bytes).
    pub fn to_sec1(&self) -> Vec<u8> {
        self.0.to_encoded_point(true).as_bytes().to_vec()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_sec1())
    }

    /// Short fingerprint: first 8 bytes of SHA-256 over the SEC1 encoding, hex.
    pub fn key_id(&self) -> String {
        let digest = Sha256::digest(self.to_sec1());
        hex::encode(&digest[..8])
    }

    pub(crate) fn point(&self) -> &PublicKey {
        &self.0
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKey({})", self.key_id())
    }
}

impl Serialize for IdentityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for IdentityKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        IdentityKey::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Draw a random scalar, retrying in the (negligible) case the bytes fall
/// outside the curve order.
pub(crate) fn random_secret() -> SecretKey {
    let mut bytes = [0u8; 32];
    loop {
        rand::rng().fill_bytes(&mut bytes);
        if let Ok(secret) = SecretKey::from_slice(&bytes) {
            return secret;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_preserves_public_key() {
        let identity = Identity::generate();
        let restored = Identity::from_hex(&identity.to_hex()).unwrap();
        assert_eq!(identity.public_key(), restored.public_key());
        assert_eq!(identity.key_id(), restored.key_id());
    }

    #[test]
    fn rejects_bad_private_keys() {
        assert!(Identity::from_hex("not-hex").is_err());
        assert!(Identity::from_hex(&"00".repeat(32)).is_err());
        assert!(Identity::from_hex("abcd").is_err());
    }

    #[test]
    fn public_key_serde_uses_base64() {
        let key = Identity::generate().public_key();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key.to_base64()));
        let back: IdentityKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert_eq!(key.to_sec1().len(), 33);
    }

    #[test]
    fn key_ids_differ_between_identities() {
        let a = Identity::generate();
        let b = Identity::generate();
        assert_ne!(a.key_id(), b.key_id());
        assert_eq!(a.key_id().len(), 16);
    }

    #[test]
    fn debug_never_prints_the_scalar() {
        let identity = Identity::generate();
        let shown = format!("{identity:?}");
        assert!(!shown.contains(&identity.to_hex()));
    }
}
