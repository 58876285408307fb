//! Signed multi-recipient envelope.
//!
//! A random 32-byte content key encrypts the body with XChaCha20-Poly1305.
//! The content key is wrapped once per recipient under a key-encryption key
//! derived from ECDH between a per-message ephemeral key and the recipient's
//! identity key. The sender signs the whole envelope with ECDSA so the
//! receiver can check who sealed it.
//!
//! Wire form: base64(JSON envelope).

#[allow(deprecated)] // upstream generic-array 0.x deprecation
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use p256::ecdh::diffie_hellman;
use p256::ecdsa::{signature::Signer, signature::Verifier, Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CodecError, Result};
use crate::identity::{random_secret, Identity, IdentityKey};

pub const ENVELOPE_VERSION: u8 = 1;

const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;
const KEK_DOMAIN: &[u8] = b"cipherbank/kek/v1";
const SIG_DOMAIN: &[u8] = b"cipherbank/envelope/v1";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    v: u8,
    /// Ephemeral public key, base64 compressed SEC1.
    epk: String,
    keys: Vec<WrappedKey>,
    /// base64(nonce || ciphertext || tag)
    body: String,
    /// base64 fixed-size ECDSA signature.
    sig: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WrappedKey {
    kid: String,
    key: String,
}

/// Encrypt `plaintext` for every key in `recipients`, signed by `sender`.
pub fn seal(sender: &Identity, recipients: &[&IdentityKey], plaintext: &[u8]) -> Result<String> {
    let ephemeral = random_secret();
    let epk = ephemeral.public_key().to_encoded_point(true).as_bytes().to_vec();

    let mut content_key = [0u8; 32];
    rand::rng().fill_bytes(&mut content_key);

    let mut keys = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        let kid = recipient.key_id();
        let shared = diffie_hellman(ephemeral.to_nonzero_scalar(), recipient.point().as_affine());
        let kek = derive_kek(shared.raw_secret_bytes(), &kid);
        let wrapped = aead_encrypt(&kek, &content_key)?;
        keys.push(WrappedKey {
            kid,
            key: STANDARD.encode(wrapped),
        });
    }

    let body = aead_encrypt(&content_key, plaintext)?;

    let signing_key = SigningKey::from(sender.secret());
    let signature: Signature = signing_key.sign(&signed_bytes(&epk, &keys, &body));

    let envelope = Envelope {
        v: ENVELOPE_VERSION,
        epk: STANDARD.encode(&epk),
        keys,
        body: STANDARD.encode(&body),
        sig: STANDARD.encode(signature.to_bytes()),
    };
    let json = serde_json::to_vec(&envelope)
        .map_err(|e| CodecError::Malformed(format!("cannot encode envelope: {e}")))?;
    Ok(STANDARD.encode(json))
}

/// Verify `sealed` against `sender` and decrypt it with `recipient`.
pub fn open(recipient: &Identity, sender: &IdentityKey, sealed: &str) -> Result<Vec<u8>> {
    let json = STANDARD
        .decode(sealed.trim())
        .map_err(|e| CodecError::Malformed(format!("not base64: {e}")))?;
    let envelope: Envelope = serde_json::from_slice(&json)
        .map_err(|e| CodecError::Malformed(format!("not an envelope: {e}")))?;
    if envelope.v != ENVELOPE_VERSION {
        return Err(CodecError::Malformed(format!(
            "unsupported envelope version {}",
            envelope.v
        )));
    }

    let epk = decode_field("epk", &envelope.epk)?;
    let body = decode_field("body", &envelope.body)?;
    let sig_bytes = decode_field("sig", &envelope.sig)?;

    let signature = Signature::from_slice(&sig_bytes).map_err(|_| CodecError::BadSignature)?;
    VerifyingKey::from(sender.point())
        .verify(&signed_bytes(&epk, &envelope.keys, &body), &signature)
        .map_err(|_| CodecError::BadSignature)?;

    let kid = recipient.key_id();
    let wrapped = envelope
        .keys
        .iter()
        .find(|k| k.kid == kid)
        .ok_or(CodecError::NotRecipient)?;
    let wrapped = decode_field("key", &wrapped.key)?;

    let ephemeral = IdentityKey::from_sec1(&epk)
        .map_err(|_| CodecError::Malformed("ephemeral key is not a curve point".into()))?;
    let shared = diffie_hellman(
        recipient.secret().to_nonzero_scalar(),
        ephemeral.point().as_affine(),
    );
    let kek = derive_kek(shared.raw_secret_bytes(), &kid);

    let content_key: [u8; 32] = aead_decrypt(&kek, &wrapped)?
        .try_into()
        .map_err(|_| CodecError::Malformed("wrapped key has wrong length".into()))?;
    aead_decrypt(&content_key, &body)
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| CodecError::Malformed(format!("{name} is not base64: {e}")))
}

fn derive_kek(shared: &[u8], kid: &str) -> [u8; 32] {
    Sha256::new()
        .chain_update(KEK_DOMAIN)
        .chain_update(shared)
        .chain_update(kid.as_bytes())
        .finalize()
        .into()
}

/// Bytes covered by the sender signature: every field except the signature.
fn signed_bytes(epk: &[u8], keys: &[WrappedKey], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(SIG_DOMAIN.len() + epk.len() + body.len() + keys.len() * 96);
    out.extend_from_slice(SIG_DOMAIN);
    out.push(ENVELOPE_VERSION);
    out.extend_from_slice(epk);
    for k in keys {
        out.extend_from_slice(k.kid.as_bytes());
        out.push(0);
        out.extend_from_slice(k.key.as_bytes());
        out.push(0);
    }
    out.extend_from_slice(body);
    out
}

#[allow(deprecated)]
fn aead_encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CodecError::Cipher(e.to_string()))?;

    let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

#[allow(deprecated)]
fn aead_decrypt(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < NONCE_LEN + TAG_LEN {
        return Err(CodecError::Malformed("ciphertext too short".to_string()));
    }
    let (nonce_bytes, ct) = data.split_at(NONCE_LEN);
    let nonce = XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new(key.into());

    cipher
        .decrypt(nonce, ct)
        .map_err(|e| CodecError::Cipher(e.to_string()))
}
