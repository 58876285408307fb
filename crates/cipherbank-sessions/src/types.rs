use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cipherbank_core::UserId;

/// Opaque per-user correlation token for multi-turn NLU context.
///
/// Only uniqueness matters; the format is a random UUID so tokens cannot be
/// guessed from the user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user's conversation session.
///
/// Sessions are lazy-created on first message and never rotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub token: SessionToken,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}
