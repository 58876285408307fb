use dashmap::DashMap;
use tracing::{debug, info, instrument};

use cipherbank_core::UserId;

use crate::types::{Session, SessionToken};

/// Thread-safe registry of per-user sessions.
///
/// Held in memory for the process lifetime; nothing is persisted, so every
/// user starts a fresh NLU context after a restart.
pub struct SessionRegistry {
    sessions: DashMap<UserId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Return the user's session token, creating the session on first call.
    ///
    /// The map entry is held for the check-and-insert, so two concurrent
    /// first messages from one user still end up with a single token.
    #[instrument(skip(self, user_id), fields(user_id = %user_id))]
    pub fn ensure(&self, user_id: &UserId) -> SessionToken {
        // Fast path: session already exists
        if let Some(session) = self.sessions.get(user_id) {
            debug!("session hit");
            return session.token.clone();
        }

        let session = self
            .sessions
            .entry(user_id.clone())
            .or_insert_with(|| {
                let session = Session {
                    user_id: user_id.clone(),
                    token: SessionToken::generate(),
                    created_at: chrono::Utc::now().to_rfc3339(),
                };
                info!(token = %session.token, "session created");
                session
            });
        session.token.clone()
    }

    /// Look up a session without creating one.
    pub fn get(&self, user_id: &UserId) -> Option<Session> {
        self.sessions.get(user_id).map(|s| s.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn ensure_creates_once_and_reuses() {
        let registry = SessionRegistry::new();
        let alice = UserId::from("alice");
        let first = registry.ensure(&alice);
        for _ in 0..10 {
            assert_eq!(registry.ensure(&alice), first);
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&alice).unwrap().token, first);
    }

    #[test]
    fn users_get_distinct_tokens() {
        let registry = SessionRegistry::new();
        let a = registry.ensure(&UserId::from("alice"));
        let b = registry.ensure(&UserId::from("bob"));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn get_does_not_create() {
        let registry = SessionRegistry::new();
        assert!(registry.get(&UserId::from("ghost")).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_contact_yields_one_token() {
        let registry = Arc::new(SessionRegistry::new());
        let tasks = (0..64).map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.ensure(&UserId::from("carol")) })
        });
        let tokens: Vec<SessionToken> = futures_util::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert!(tokens.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(registry.len(), 1);
    }
}
