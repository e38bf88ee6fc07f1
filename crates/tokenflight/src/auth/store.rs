//! In-memory credential store backed by durable storage.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::storage::{MemoryStorage, TokenStorage};
use super::tokens::{AccessToken, CredentialPair};

/// Holder of the current credential pair.
///
/// Cheap to clone; clones share the same pair. Every operation is atomic with
/// respect to every other, and storage failures are logged rather than
/// returned so that a broken disk never blocks an in-flight request.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    current: RwLock<Option<CredentialPair>>,
    storage: Arc<dyn TokenStorage>,
}

impl CredentialStore {
    /// Create an empty store with process-local storage.
    pub fn in_memory() -> Self {
        Self::with_pair(Arc::new(MemoryStorage::new()), None)
    }

    /// Create a store seeded from durable storage.
    ///
    /// An unreadable storage backend starts the store empty.
    pub async fn load(storage: Arc<dyn TokenStorage>) -> Self {
        let pair = match storage.load().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credentials, starting signed out");
                None
            }
        };
        debug!(seeded = pair.is_some(), "Credential store loaded");
        Self::with_pair(storage, pair)
    }

    fn with_pair(storage: Arc<dyn TokenStorage>, pair: Option<CredentialPair>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                current: RwLock::new(pair),
                storage,
            }),
        }
    }

    /// Returns a snapshot of the current pair.
    pub async fn get(&self) -> Option<CredentialPair> {
        self.inner.current.read().await.clone()
    }

    /// Replace the pair and write it through to storage.
    pub async fn set(&self, pair: CredentialPair) {
        let mut current = self.inner.current.write().await;
        // Persist under the write lock so disk order matches memory order.
        if let Err(e) = self.inner.storage.save(&pair).await {
            warn!(error = %e, "Failed to persist credentials");
        }
        *current = Some(pair);
    }

    /// Replace the pair only if the store still holds `expected`.
    ///
    /// Returns false, leaving the store untouched, when the pair was cleared
    /// or replaced in the meantime.
    pub async fn replace_if(&self, expected: &AccessToken, pair: CredentialPair) -> bool {
        let mut current = self.inner.current.write().await;
        if !holds(current.as_ref(), expected) {
            return false;
        }
        if let Err(e) = self.inner.storage.save(&pair).await {
            warn!(error = %e, "Failed to persist credentials");
        }
        *current = Some(pair);
        true
    }

    /// Remove the pair and erase storage.
    pub async fn clear(&self) {
        self.take().await;
    }

    /// Remove the pair, returning what was there.
    ///
    /// Exactly one of several concurrent callers observes `Some`.
    pub async fn take(&self) -> Option<CredentialPair> {
        let mut current = self.inner.current.write().await;
        let previous = current.take();
        if let Err(e) = self.inner.storage.erase().await {
            warn!(error = %e, "Failed to erase stored credentials");
        }
        previous
    }

    /// Remove the pair only if it is still the one holding `expected`.
    pub async fn take_if(&self, expected: &AccessToken) -> Option<CredentialPair> {
        let mut current = self.inner.current.write().await;
        if !holds(current.as_ref(), expected) {
            return None;
        }
        let previous = current.take();
        if let Err(e) = self.inner.storage.erase().await {
            warn!(error = %e, "Failed to erase stored credentials");
        }
        previous
    }
}

fn holds(current: Option<&CredentialPair>, expected: &AccessToken) -> bool {
    current.is_some_and(|pair| pair.access_token == *expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::RenewalToken;

    fn pair(access: &str) -> CredentialPair {
        CredentialPair::new(AccessToken::new(access), RenewalToken::new("renew"))
    }

    #[tokio::test]
    async fn test_empty_store_reads_none() {
        let store = CredentialStore::in_memory();
        assert!(store.get().await.is_none());
    }

    #[tokio::test]
    async fn test_set_writes_through() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::load(storage.clone()).await;

        store.set(pair("a1")).await;

        assert_eq!(store.get().await, Some(pair("a1")));
        assert_eq!(storage.load().await.unwrap(), Some(pair("a1")));
    }

    #[tokio::test]
    async fn test_load_seeds_from_storage() {
        let storage = Arc::new(MemoryStorage::with_pair(pair("persisted")));
        let store = CredentialStore::load(storage).await;
        assert_eq!(store.get().await, Some(pair("persisted")));
    }

    #[tokio::test]
    async fn test_clear_erases_storage() {
        let storage = Arc::new(MemoryStorage::with_pair(pair("a1")));
        let store = CredentialStore::load(storage.clone()).await;

        store.clear().await;

        assert!(store.get().await.is_none());
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_take_yields_one_pair() {
        let store = CredentialStore::in_memory();
        store.set(pair("a1")).await;

        let (a, b) = tokio::join!(store.take(), store.take());
        assert_eq!(a.is_some() as u8 + b.is_some() as u8, 1);
    }

    #[tokio::test]
    async fn test_replace_if_requires_expected_pair() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::load(storage.clone()).await;
        store.set(pair("a1")).await;

        assert!(!store.replace_if(&AccessToken::new("other"), pair("a2")).await);
        assert_eq!(store.get().await, Some(pair("a1")));

        assert!(store.replace_if(&AccessToken::new("a1"), pair("a2")).await);
        assert_eq!(storage.load().await.unwrap(), Some(pair("a2")));
    }

    #[tokio::test]
    async fn test_replace_if_does_not_restore_cleared_store() {
        let store = CredentialStore::in_memory();
        store.set(pair("a1")).await;
        store.clear().await;

        assert!(!store.replace_if(&AccessToken::new("a1"), pair("a2")).await);
        assert!(store.get().await.is_none());
    }

    #[tokio::test]
    async fn test_take_if_keeps_newer_pair() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CredentialStore::load(storage.clone()).await;
        store.set(pair("newer")).await;

        assert!(store.take_if(&AccessToken::new("older")).await.is_none());
        assert_eq!(store.get().await, Some(pair("newer")));
        assert_eq!(storage.load().await.unwrap(), Some(pair("newer")));

        assert_eq!(
            store.take_if(&AccessToken::new("newer")).await,
            Some(pair("newer"))
        );
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = CredentialStore::in_memory();
        let other = store.clone();

        other.set(pair("shared")).await;
        assert_eq!(store.get().await, Some(pair("shared")));
    }
}
