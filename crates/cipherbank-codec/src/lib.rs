//! Secure channel codec: per-user public-key encryption around the pipeline.

pub mod codec;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod http;
pub mod identity;

pub use codec::SecureCodec;
pub use directory::{CachedKeyDirectory, InMemoryKeyDirectory, KeyDirectory};
pub use error::CodecError;
pub use http::HttpKeyDirectory;
pub use identity::{Identity, IdentityKey};
