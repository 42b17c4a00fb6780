use crate::{storage::traits::PeerStore, types::keys, Result};
use std::sync::Arc;

/// The single, role-agnostic credential slot in the peer store.
///
/// Every channel writes the same two keys, so the grant processed last wins.
/// Produce and consume rely on the admin grant being that last write; the
/// order is fixed by whoever delivers the events, not by this type.
#[derive(Clone)]
pub struct SharedCredentials {
    store: Arc<dyn PeerStore>,
}

impl SharedCredentials {
    pub fn new(store: Arc<dyn PeerStore>) -> Self {
        Self { store }
    }

    /// Overwrite both fields in one store write
    pub async fn record(&self, username: &str, password: &str) -> Result<()> {
        self.store
            .set_many(&[(keys::USERNAME, username), (keys::PASSWORD, password)])
            .await
    }

    pub async fn username(&self) -> Result<Option<String>> {
        self.store.get(keys::USERNAME).await
    }

    pub async fn password(&self) -> Result<Option<String>> {
        self.store.get(keys::PASSWORD).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FilePeerStore, MemoryPeerStore};

    #[tokio::test]
    async fn test_last_record_wins() {
        let credentials = SharedCredentials::new(Arc::new(MemoryPeerStore::new()));
        credentials.record("consumer-user", "c").await.unwrap();
        credentials.record("admin-user", "a").await.unwrap();

        assert_eq!(credentials.username().await.unwrap().as_deref(), Some("admin-user"));
        assert_eq!(credentials.password().await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_failed_record_keeps_previous_pair() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("peer.json");
        let store = Arc::new(FilePeerStore::open(&path).await.unwrap());
        let credentials = SharedCredentials::new(store);
        credentials.record("consumer-user", "c").await.unwrap();

        std::fs::create_dir(path.with_extension("tmp")).unwrap();
        assert!(credentials.record("admin-user", "a").await.is_err());

        assert_eq!(
            credentials.username().await.unwrap().as_deref(),
            Some("consumer-user")
        );
        assert_eq!(credentials.password().await.unwrap().as_deref(), Some("c"));
    }
}
