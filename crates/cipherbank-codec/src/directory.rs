use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use cipherbank_core::UserId;

use crate::error::{CodecError, Result};
use crate::identity::IdentityKey;

/// Identity / public-key lookup service.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Resolve a user's public key. Missing users yield [`CodecError::KeyNotFound`].
    async fn resolve(&self, user_id: &UserId) -> Result<IdentityKey>;

    /// Publish a public key. Fails with [`CodecError::KeyAlreadyExists`] if
    /// one is already registered for the user.
    async fn publish(&self, user_id: &UserId, key: &IdentityKey) -> Result<()>;
}

/// Process-local directory. Used in tests and single-node demos.
#[derive(Default)]
pub struct InMemoryKeyDirectory {
    keys: DashMap<UserId, IdentityKey>,
}

impl InMemoryKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyDirectory for InMemoryKeyDirectory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn resolve(&self, user_id: &UserId) -> Result<IdentityKey> {
        self.keys
            .get(user_id)
            .map(|k| k.value().clone())
            .ok_or_else(|| CodecError::KeyNotFound {
                user_id: user_id.to_string(),
            })
    }

    async fn publish(&self, user_id: &UserId, key: &IdentityKey) -> Result<()> {
        use dashmap::mapref::entry::Entry;

        match self.keys.entry(user_id.clone()) {
            Entry::Occupied(_) => Err(CodecError::KeyAlreadyExists {
                user_id: user_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(key.clone());
                Ok(())
            }
        }
    }
}

/// Memoises resolved keys in front of another directory.
///
/// Keys are never evicted: published keys are immutable in the directory,
/// so a cached key stays valid for the process lifetime.
pub struct CachedKeyDirectory {
    inner: Arc<dyn KeyDirectory>,
    cache: DashMap<UserId, IdentityKey>,
}

impl CachedKeyDirectory {
    pub fn new(inner: Arc<dyn KeyDirectory>) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl KeyDirectory for CachedKeyDirectory {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn resolve(&self, user_id: &UserId) -> Result<IdentityKey> {
        if let Some(key) = self.cache.get(user_id) {
            debug!(user_id = %user_id, "public key cache hit");
            return Ok(key.value().clone());
        }
        let key = self.inner.resolve(user_id).await?;
        self.cache.insert(user_id.clone(), key.clone());
        Ok(key)
    }

    async fn publish(&self, user_id: &UserId, key: &IdentityKey) -> Result<()> {
        self.inner.publish(user_id, key).await?;
        self.cache.insert(user_id.clone(), key.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::identity::Identity;

    #[tokio::test]
    async fn memory_directory_resolves_published_keys() {
        let dir = InMemoryKeyDirectory::new();
        let alice = UserId::from("alice");
        let key = Identity::generate().public_key();

        assert!(matches!(
            dir.resolve(&alice).await,
            Err(CodecError::KeyNotFound { .. })
        ));
        dir.publish(&alice, &key).await.unwrap();
        assert_eq!(dir.resolve(&alice).await.unwrap(), key);
    }

    #[tokio::test]
    async fn memory_directory_refuses_second_publish() {
        let dir = InMemoryKeyDirectory::new();
        let alice = UserId::from("alice");
        let first = Identity::generate().public_key();
        dir.publish(&alice, &first).await.unwrap();

        let err = dir
            .publish(&alice, &Identity::generate().public_key())
            .await
            .unwrap_err();
        assert!(matches!(err, CodecError::KeyAlreadyExists { .. }));
        assert_eq!(dir.resolve(&alice).await.unwrap(), first);
    }

    struct CountingDirectory {
        inner: InMemoryKeyDirectory,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl KeyDirectory for CountingDirectory {
        fn name(&self) -> &str {
            "counting"
        }
        async fn resolve(&self, user_id: &UserId) -> Result<IdentityKey> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.resolve(user_id).await
        }
        async fn publish(&self, user_id: &UserId, key: &IdentityKey) -> Result<()> {
            self.inner.publish(user_id, key).await
        }
    }

    #[tokio::test]
    async fn cache_avoids_repeat_lookups() {
        let counting = Arc::new(CountingDirectory {
            inner: InMemoryKeyDirectory::new(),
            lookups: AtomicUsize::new(0),
        });
        let alice = UserId::from("alice");
        counting
            .inner
            .publish(&alice, &Identity::generate().public_key())
            .await
            .unwrap();

        let cached = CachedKeyDirectory::new(counting.clone());
        for _ in 0..3 {
            cached.resolve(&alice).await.unwrap();
        }
        assert_eq!(counting.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(cached.cached(), 1);
    }

    #[tokio::test]
    async fn cache_does_not_remember_misses() {
        let cached = CachedKeyDirectory::new(Arc::new(InMemoryKeyDirectory::new()));
        assert!(cached.resolve(&UserId::from("nobody")).await.is_err());
        assert_eq!(cached.cached(), 0);
    }
}
