use thiserror::Error;

/// Errors raised by the secure channel codec and key directories.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The directory has no public key for this user.
    #[error("no public key registered for {user_id}")]
    KeyNotFound { user_id: String },

    /// A key is already published for this user.
    #[error("a public key is already registered for {user_id}")]
    KeyAlreadyExists { user_id: String },

    /// The directory holds a different key for this id than the local identity.
    #[error("key registered for {user_id} is {registered}, local identity is {local}")]
    KeyMismatch {
        user_id: String,
        registered: String,
        local: String,
    },

    /// The key directory could not be reached or answered unexpectedly.
    #[error("key directory error: {0}")]
    Directory(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Key material could not be parsed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The sealed message is not a well-formed envelope.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    /// The envelope signature does not match the sender's public key.
    #[error("signature verification failed")]
    BadSignature,

    /// The envelope was not sealed for this identity.
    #[error("message was not encrypted for this recipient")]
    NotRecipient,

    /// AEAD failure: wrong key or tampered ciphertext.
    #[error("cipher error: {0}")]
    Cipher(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
